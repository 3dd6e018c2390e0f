//! Output partitions: the implicit main package plus named sub-packages.

use serde::Serialize;

use crate::{Error, Result};

/// Name of the implicit main partition.
pub const MAIN_PARTITION: &str = "main";

/// An independently loadable output unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    name: String,
    root: String,
    is_main: bool,
}

impl Partition {
    /// The main partition. Its root is empty: it owns whatever no
    /// sub-package owns.
    pub fn main() -> Self {
        Self {
            name: MAIN_PARTITION.to_string(),
            root: String::new(),
            is_main: true,
        }
    }

    /// A sub-package rooted at `root` (`"pkgA"`, `"pkgA/"`, `"/pkgA"` are equivalent).
    pub fn sub_package(root: &str) -> Result<Self> {
        let unified = root.trim().replace('\\', "/");
        let trimmed = unified
            .trim_start_matches("./")
            .trim_matches('/');

        if trimmed.is_empty() || trimmed.split('/').any(|seg| seg == ".." || seg == "." || seg.is_empty()) {
            return Err(Error::InvalidPartitionRoot(root.to_string()));
        }

        Ok(Self {
            name: trimmed.replace('/', ""),
            root: format!("{trimmed}/"),
            is_main: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root prefix with a trailing slash; empty for the main partition.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn is_main(&self) -> bool {
        self.is_main
    }

    /// Whether an output or chunk name lives under this partition's root.
    ///
    /// The main partition's empty root matches every name.
    pub fn owns(&self, name: &str) -> bool {
        name.starts_with(&self.root)
    }
}

/// The ordered partitions of one application: main first, then sub-packages
/// in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSet {
    partitions: Vec<Partition>,
}

impl PartitionSet {
    /// Build the set from sub-package roots; the main partition is implicit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OverlappingPartitions`] if two roots are equal or one
    /// nests inside the other, and [`Error::InvalidPartitionRoot`] for empty
    /// or escaping roots.
    pub fn new<I, S>(sub_roots: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut partitions = vec![Partition::main()];

        for root in sub_roots {
            let candidate = Partition::sub_package(root.as_ref())?;
            if let Some(existing) = partitions
                .iter()
                .skip(1)
                .find(|p| p.owns(&candidate.root) || candidate.owns(&p.root))
            {
                return Err(Error::OverlappingPartitions {
                    first: existing.root.clone(),
                    second: candidate.root.clone(),
                });
            }
            partitions.push(candidate);
        }

        Ok(Self { partitions })
    }

    /// A set with only the main partition.
    pub fn main_only() -> Self {
        Self {
            partitions: vec![Partition::main()],
        }
    }

    pub fn list_partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn main(&self) -> &Partition {
        &self.partitions[0]
    }

    pub fn sub_packages(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().skip(1)
    }

    pub fn get(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }

    /// The sub-package owning `output_name`, or the main partition.
    pub fn owner_of(&self, output_name: &str) -> &Partition {
        self.sub_packages()
            .find(|p| p.owns(output_name))
            .unwrap_or_else(|| self.main())
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl Default for PartitionSet {
    fn default() -> Self {
        Self::main_only()
    }
}
