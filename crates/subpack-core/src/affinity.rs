//! Sub-package commons membership.
//!
//! A module may be hoisted into a sub-package's local commons bucket only
//! when every chunk that reaches it lives under that sub-package's root. A
//! module reached from anywhere else stays with the build's default grouping
//! so it is packaged once and shared, instead of being duplicated into
//! partitions that cannot load each other's code.
//!
//! Predicates are built fresh from a frozen [`UsageIndex`] snapshot each
//! pass and hold no other state, so re-evaluating them any number of times
//! within a pass yields the same answers.

use std::sync::Arc;

use crate::grouping::{CacheGroup, GroupingRegistry};
use crate::module::ModuleId;
use crate::partition::{Partition, PartitionSet};
use crate::usage::UsageIndex;

/// Priority of partition-local commons groups; above the default bucket.
pub const COMMONS_PRIORITY: i32 = 3;

/// Membership test of one partition's commons bucket.
#[derive(Debug, Clone)]
pub struct AffinityPredicate {
    /// `None` for the main partition, which has no local bucket.
    root: Option<String>,
    usage: Arc<UsageIndex>,
}

impl AffinityPredicate {
    pub fn new(partition: &Partition, usage: Arc<UsageIndex>) -> Self {
        Self {
            root: (!partition.is_main()).then(|| partition.root().to_string()),
            usage,
        }
    }

    /// `true` iff `module` is a non-entry script used only by chunks under
    /// this partition's root. Unreached modules are excluded.
    pub fn test(&self, module: &ModuleId) -> bool {
        let Some(root) = self.root.as_deref() else {
            return false;
        };
        if !module.is_script() || self.usage.is_entry(module) {
            return false;
        }

        let used_by = self.usage.usages(module);
        !used_by.is_empty() && used_by.iter().all(|chunk| chunk.starts_with(root))
    }
}

/// Builds commons predicates and cache groups for every sub-package.
#[derive(Debug, Clone, Copy)]
pub struct PartitionAffinityResolver<'a> {
    partitions: &'a PartitionSet,
}

impl<'a> PartitionAffinityResolver<'a> {
    pub fn new(partitions: &'a PartitionSet) -> Self {
        Self { partitions }
    }

    pub fn build_predicate(&self, partition: &Partition, usage: Arc<UsageIndex>) -> AffinityPredicate {
        AffinityPredicate::new(partition, usage)
    }

    /// Name of a sub-package's commons bucket (`pkgA/commonchunks`).
    pub fn group_name(partition: &Partition) -> String {
        format!("{}commonchunks", partition.root())
    }

    /// One cache group per sub-package, all sharing `usage`.
    pub fn cache_groups(&self, usage: &Arc<UsageIndex>) -> Vec<CacheGroup> {
        self.partitions
            .sub_packages()
            .map(|partition| {
                let predicate = self.build_predicate(partition, Arc::clone(usage));
                CacheGroup::new(Self::group_name(partition), COMMONS_PRIORITY, move |m| {
                    predicate.test(m)
                })
            })
            .collect()
    }

    /// Install the sub-package groups into the compiler's registry.
    pub fn register(&self, registry: &mut GroupingRegistry, usage: &Arc<UsageIndex>) {
        for group in self.cache_groups(usage) {
            tracing::trace!(group = group.name(), "registering commons group");
            registry.register_group(group);
        }
    }
}
