//! Per-name guarded state.
//!
//! The outer map is only locked long enough to look up or insert an entry;
//! all work on a topic or queue happens under that entry's own mutex, so
//! traffic on one name never waits for another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

#[derive(Debug)]
pub struct Registry<T> {
    entries: RwLock<HashMap<String, Arc<Mutex<T>>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Registry<T> {
    pub fn get(&self, name: &str) -> Option<Arc<Mutex<T>>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Return the entry for `name`, creating it with `create` if absent.
    pub fn get_or_insert_with(&self, name: &str, create: impl FnOnce() -> T) -> Arc<Mutex<T>> {
        if let Some(entry) = self.get(name) {
            return entry;
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(create())))
            .clone()
    }

    /// Point-in-time copy of all entries, sorted by name.
    pub fn entries(&self) -> Vec<(String, Arc<Mutex<T>>)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

/// Lock an entry, recovering the guard if a previous holder panicked.
pub fn lock<T>(entry: &Mutex<T>) -> MutexGuard<'_, T> {
    entry.lock().unwrap_or_else(PoisonError::into_inner)
}
