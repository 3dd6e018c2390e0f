//! Cache groups: the compiler's module grouping strategy.
//!
//! A compiler creates a [`GroupingRegistry`] holding its default groups,
//! hands it to the core through `PassHooks::on_grouping_decision`, and then
//! asks [`GroupingRegistry::claim`] which bucket each non-entry module goes to.

use std::fmt;
use std::sync::Arc;

use crate::module::ModuleId;

/// Priority of the default shared bucket. Anything registered above it wins.
pub const DEFAULT_PRIORITY: i32 = -20;

/// Name of the default shared bucket.
pub const DEFAULT_GROUP: &str = "common";

/// Membership test of a cache group.
pub type ModulePredicate = Arc<dyn Fn(&ModuleId) -> bool + Send + Sync>;

/// A named output bucket with a membership test.
#[derive(Clone)]
pub struct CacheGroup {
    name: String,
    priority: i32,
    min_chunks: usize,
    test: ModulePredicate,
}

impl CacheGroup {
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        test: impl Fn(&ModuleId) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            min_chunks: 1,
            test: Arc::new(test),
        }
    }

    /// Only claim modules used by at least `min_chunks` chunks.
    pub fn with_min_chunks(mut self, min_chunks: usize) -> Self {
        self.min_chunks = min_chunks;
        self
    }

    /// The build's global shared bucket: any script module used by two or
    /// more chunks.
    pub fn default_shared() -> Self {
        Self::new(DEFAULT_GROUP, DEFAULT_PRIORITY, ModuleId::is_script).with_min_chunks(2)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn min_chunks(&self) -> usize {
        self.min_chunks
    }

    /// Output file of the group's chunk.
    pub fn file_name(&self) -> String {
        format!("{}.js", self.name)
    }

    pub fn matches(&self, module: &ModuleId, used_by_chunks: usize) -> bool {
        used_by_chunks >= self.min_chunks && (self.test)(module)
    }
}

impl fmt::Debug for CacheGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheGroup")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("min_chunks", &self.min_chunks)
            .finish_non_exhaustive()
    }
}

/// Ordered set of cache groups, highest priority first.
#[derive(Debug, Clone, Default)]
pub struct GroupingRegistry {
    groups: Vec<CacheGroup>,
}

impl GroupingRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only the default shared bucket.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_group(CacheGroup::default_shared());
        registry
    }

    /// Register a group by name. A group with the same name is replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(&ModuleId) -> bool + Send + Sync + 'static,
        priority: i32,
    ) -> &mut Self {
        self.register_group(CacheGroup::new(name, priority, predicate))
    }

    pub fn register_group(&mut self, group: CacheGroup) -> &mut Self {
        self.groups.retain(|g| g.name != group.name);
        // stable: equal priorities keep registration order
        let at = self
            .groups
            .iter()
            .position(|g| g.priority < group.priority)
            .unwrap_or(self.groups.len());
        self.groups.insert(at, group);
        self
    }

    pub fn groups(&self) -> &[CacheGroup] {
        &self.groups
    }

    pub fn get(&self, name: &str) -> Option<&CacheGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Highest-priority group that accepts `module`, if any.
    pub fn claim(&self, module: &ModuleId, used_by_chunks: usize) -> Option<&CacheGroup> {
        self.groups
            .iter()
            .find(|g| g.matches(module, used_by_chunks))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
