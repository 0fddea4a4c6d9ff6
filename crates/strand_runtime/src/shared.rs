//! Process-wide module state visible to every execution.
//!
//! The cache cannot see these bindings through fingerprints of nodes in
//! other modules, so every reassignment is announced to mutation hooks.
//! The runtime registers one that drops the whole cache.
//!
//! Hooks are keyed by owner, at most one per owner, and report on every
//! call whether they are still wanted; a hook returning `false` is
//! unregistered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::{IndexMap, IndexSet};
use strand_core::{FastHashMap, Value, fast_map_new};

/// Module-level bindings plus the names the module exports.
#[derive(Clone, Debug)]
pub struct ModuleScope {
    pub name: Arc<str>,
    pub bindings: FastHashMap<Arc<str>, Value>,
    pub exports: IndexSet<Arc<str>>,
}

impl ModuleScope {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            bindings: fast_map_new(),
            exports: IndexSet::new(),
        }
    }

    /// Exported names with their current values, in export order.
    /// Exports that were never bound are skipped.
    pub fn exported_values(&self) -> Vec<(Arc<str>, Value)> {
        self.exports
            .iter()
            .filter_map(|n| self.bindings.get(n).map(|v| (n.clone(), v.clone())))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutationEvent<'a> {
    pub module: &'a str,
    pub name: &'a str,
}

type MutationHook = Box<dyn Fn(MutationEvent<'_>) -> bool + Send + Sync>;

pub struct SharedState {
    modules: RwLock<IndexMap<Arc<str>, ModuleScope>>,
    hooks: Mutex<IndexMap<u64, MutationHook>>,
}

impl SharedState {
    pub const MAIN: &'static str = "main";

    pub fn new() -> Self {
        let mut modules = IndexMap::new();
        modules.insert(Arc::from(Self::MAIN), ModuleScope::new(Self::MAIN));
        Self {
            modules: RwLock::new(modules),
            hooks: Mutex::new(IndexMap::new()),
        }
    }

    fn modules(&self) -> RwLockReadGuard<'_, IndexMap<Arc<str>, ModuleScope>> {
        self.modules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn modules_mut(&self) -> RwLockWriteGuard<'_, IndexMap<Arc<str>, ModuleScope>> {
        self.modules.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn hooks(&self) -> MutexGuard<'_, IndexMap<u64, MutationHook>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `hook` for `owner`. Returns `false`, leaving the existing
    /// hook in place, if `owner` already has one.
    ///
    /// Hooks run with the hook table locked and must not register others.
    pub fn on_mutation(
        &self,
        owner: u64,
        hook: impl Fn(MutationEvent<'_>) -> bool + Send + Sync + 'static,
    ) -> bool {
        match self.hooks().entry(owner) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(Box::new(hook));
                true
            }
        }
    }

    pub fn is_watched_by(&self, owner: u64) -> bool {
        self.hooks().contains_key(&owner)
    }

    pub fn hook_count(&self) -> usize {
        self.hooks().len()
    }

    /// Create `name` with an empty export set; a no-op if it exists.
    pub fn define_module(&self, name: &str) {
        self.modules_mut()
            .entry(Arc::from(name))
            .or_insert_with(|| ModuleScope::new(name));
    }

    pub fn get(&self, module: &str, name: &str) -> Option<Value> {
        self.modules().get(module)?.bindings.get(name).cloned()
    }

    /// Bind `name` in `module`, creating the module if needed, then notify
    /// every mutation hook, dropping those that are no longer live.
    pub fn assign(&self, module: &str, name: &str, value: Value) {
        {
            let mut modules = self.modules_mut();
            let scope = modules
                .entry(Arc::from(module))
                .or_insert_with(|| ModuleScope::new(module));
            scope.bindings.insert(Arc::from(name), value);
        }
        // Hooks run without the module lock held so they may read state.
        let event = MutationEvent { module, name };
        self.hooks().retain(|_, hook| hook(event));
    }

    pub fn export(&self, module: &str, name: &str) {
        let mut modules = self.modules_mut();
        let scope = modules
            .entry(Arc::from(module))
            .or_insert_with(|| ModuleScope::new(module));
        scope.exports.insert(Arc::from(name));
    }

    pub fn module(&self, name: &str) -> Option<ModuleScope> {
        self.modules().get(name).cloned()
    }

    pub fn module_names(&self) -> Vec<Arc<str>> {
        self.modules().keys().cloned().collect()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
