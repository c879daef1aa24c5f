//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a [`Runtime`](crate::reactive::Runtime).
///
/// Every field has a default, so a partial document deserializes cleanly:
///
/// ```rust
/// use trellis_core::RuntimeConfig;
///
/// let config: RuntimeConfig = serde_json::from_str(r#"{ "recursion_limit": 10 }"#).unwrap();
/// assert_eq!(config.recursion_limit, 10);
/// assert!(config.warn_readonly_writes);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many times one job may run within a single flush before it is
    /// abandoned as a runaway update loop.
    pub recursion_limit: usize,

    /// Emit a warning when a write to a readonly proxy is refused.
    pub warn_readonly_writes: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
            warn_readonly_writes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.recursion_limit, 100);
        assert!(config.warn_readonly_writes);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn round_trips_through_json() {
        let config = RuntimeConfig {
            recursion_limit: 7,
            warn_readonly_writes: false,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
