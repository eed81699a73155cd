//! Editor configuration.
//!
//! Reads settings from environment variables:
//! - `SYSMODEL_HISTORY_CAPACITY`: undo/redo stack capacity (default: 1000)
//! - `SYSMODEL_SELECTION_HISTORY_CAPACITY`: selection snapshot capacity
//!   (default: 2000)
//!
//! Unparseable or zero values fall back to the default.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
pub const DEFAULT_SELECTION_HISTORY_CAPACITY: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of entries on each of the undo and redo stacks.
    pub history_capacity: usize,
    /// Maximum number of selection snapshots kept for back/forward.
    pub selection_history_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            selection_history_capacity: DEFAULT_SELECTION_HISTORY_CAPACITY,
        }
    }
}

impl EditorConfig {
    /// Builds a config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        EditorConfig {
            history_capacity: read("SYSMODEL_HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY),
            selection_history_capacity: read(
                "SYSMODEL_SELECTION_HISTORY_CAPACITY",
                DEFAULT_SELECTION_HISTORY_CAPACITY,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_fields_take_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"history_capacity": 5}"#).unwrap();
        assert_eq!(config.history_capacity, 5);
        assert_eq!(
            config.selection_history_capacity,
            DEFAULT_SELECTION_HISTORY_CAPACITY
        );
    }

    #[test]
    fn lookup_overrides_and_rejects_garbage() {
        let vars = HashMap::from([
            ("SYSMODEL_HISTORY_CAPACITY", "12"),
            ("SYSMODEL_SELECTION_HISTORY_CAPACITY", "lots"),
        ]);
        let config = EditorConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.history_capacity, 12);
        assert_eq!(
            config.selection_history_capacity,
            DEFAULT_SELECTION_HISTORY_CAPACITY
        );
    }

    #[test]
    fn zero_capacity_falls_back() {
        let config = EditorConfig::from_lookup(|_| Some("0".to_string()));
        assert_eq!(config, EditorConfig::default());
    }
}
