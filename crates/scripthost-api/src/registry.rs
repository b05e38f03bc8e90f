//! Script registry.

use std::sync::Arc;

use dashmap::DashMap;
use scripthost_runtime::Script;

use crate::error::ApiError;

/// Scripts addressable by route name.
pub struct ScriptRegistry {
    scripts: DashMap<String, Arc<dyn Script>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self {
            scripts: DashMap::new(),
        }
    }

    /// Register `script` under its own name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken.
    pub fn register(&self, script: Arc<dyn Script>) -> Result<(), ApiError> {
        let name = script.name().to_string();
        if self.scripts.contains_key(&name) {
            return Err(ApiError::DuplicateScript(name));
        }
        self.scripts.insert(name, script);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Script>> {
        self.scripts.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scripts.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl Default for ScriptRegistry {
    fn default() -> Self {
        Self::new()
    }
}
