//! Last-reported control values
//!
//! The report stream keeps this cache current; the heartbeat reads it to
//! synthesise [`ControlSet`](crate::ControlSet) snapshots. Entries are
//! overwritten in place and never removed once seen.

use std::collections::HashMap;

/// Control-name → last-reported-value map
#[derive(Debug, Clone, Default)]
pub struct StateMap {
    entries: HashMap<String, String>,
}

impl StateMap {
    pub fn new() -> StateMap {
        StateMap::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Merge a batch of decoded report pairs.
    pub fn apply(&mut self, updates: impl IntoIterator<Item = (String, String)>) {
        for (name, value) in updates {
            self.entries.insert(name, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
