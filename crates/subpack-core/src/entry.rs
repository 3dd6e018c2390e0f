//! Entry records, the registered entry set, and the pending discovery queue.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::module::ModuleId;
use crate::Result;

/// Where an entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryOrigin {
    /// Listed in the app manifest (pages and the app script).
    Manifest,
    /// Referenced as a custom component while compiling `by`.
    Discovered { by: ModuleId },
}

/// A compiler entry point.
///
/// Identity is the output name, derived from the source path by dropping the
/// extension (`pages/index/index.js` -> `pages/index/index`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRecord {
    module: ModuleId,
    source_path: PathBuf,
    output_name: String,
    origin: EntryOrigin,
}

impl EntryRecord {
    pub fn new(
        source_root: impl AsRef<Path>,
        source_path: impl Into<PathBuf>,
        origin: EntryOrigin,
    ) -> Result<Self> {
        let source_root = source_root.as_ref();
        let source_path = source_path.into();
        let module = ModuleId::new(source_root, &source_path)?;
        let output_name = module.without_extension().to_string();
        let source_path = if source_path.is_absolute() {
            source_path
        } else {
            source_root.join(source_path)
        };

        Ok(Self {
            module,
            source_path,
            output_name,
            origin,
        })
    }

    /// Shorthand for an entry listed in the manifest.
    pub fn manifest(source_root: impl AsRef<Path>, source_path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(source_root, source_path, EntryOrigin::Manifest)
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn origin(&self) -> &EntryOrigin {
        &self.origin
    }

    pub fn is_discovered(&self) -> bool {
        matches!(self.origin, EntryOrigin::Discovered { .. })
    }
}

/// All entries registered with the compiler, in registration order.
///
/// The set only grows during a build session.
#[derive(Debug, Clone, Default)]
pub struct EntrySet {
    entries: IndexMap<String, EntryRecord>,
}

impl EntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry. Returns `false` if its output name is already taken.
    pub fn insert(&mut self, record: EntryRecord) -> bool {
        if self.entries.contains_key(record.output_name()) {
            return false;
        }
        self.entries.insert(record.output_name().to_string(), record);
        true
    }

    pub fn contains(&self, output_name: &str) -> bool {
        self.entries.contains_key(output_name)
    }

    pub fn get(&self, output_name: &str) -> Option<&EntryRecord> {
        self.entries.get(output_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryRecord> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that came from discovery rather than the manifest.
    pub fn discovered_count(&self) -> usize {
        self.iter().filter(|e| e.is_discovered()).count()
    }
}

impl FromIterator<EntryRecord> for EntrySet {
    fn from_iter<T: IntoIterator<Item = EntryRecord>>(iter: T) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

/// Entries discovered during the current pass and not yet registered.
#[derive(Debug, Clone, Default)]
pub struct PendingEntryQueue {
    queue: Vec<EntryRecord>,
    queued: FxHashSet<String>,
}

impl PendingEntryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `record` unless its output name is registered or already queued.
    pub fn enqueue(&mut self, record: EntryRecord, registered: &EntrySet) -> bool {
        if registered.contains(record.output_name()) || self.queued.contains(record.output_name())
        {
            return false;
        }
        self.queued.insert(record.output_name().to_string());
        self.queue.push(record);
        true
    }

    /// Take every queued record, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<EntryRecord> {
        self.queued.clear();
        std::mem::take(&mut self.queue)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryRecord> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
