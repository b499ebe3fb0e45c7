//! Network build configuration
//!
//! [`NetworkConfig`] is an explicit parameter of [`ReteNetwork::build`]. It can be
//! written by hand, parsed from YAML or JSON, and overridden from the environment:
//!
//! | Variable                          | Field                     |
//! |-----------------------------------|---------------------------|
//! | `TRELLIS_COMPOSITE_KEY_DEPTH`     | `composite_key_depth`     |
//! | `TRELLIS_SKIP_UNAFFECTED_UPDATES` | `skip_unaffected_updates` |
//! | `TRELLIS_SHARE_ALPHA_NODES`       | `share_alpha_nodes`       |
//!
//! [`ReteNetwork::build`]: crate::rete_network::ReteNetwork::build

use crate::error::BuildError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Default number of leading equality constraints folded into a composite hash key
pub const DEFAULT_COMPOSITE_KEY_DEPTH: usize = 3;

/// Largest supported composite key depth
pub const MAX_COMPOSITE_KEY_DEPTH: usize = 3;

/// Settings fixed when the network is compiled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Maximum number of leading indexable equality constraints used as a hash key.
    /// `0` disables indexing and forces every join to scan linearly.
    #[serde(default = "default_composite_key_depth")]
    pub composite_key_depth: usize,

    /// Skip retract/reinsert at entry nodes whose join keys, post-filters and downstream
    /// declarations do not read any field changed by an update.
    #[serde(default = "default_true")]
    pub skip_unaffected_updates: bool,

    /// Reuse identical literal alpha nodes across patterns and rules.
    #[serde(default = "default_true")]
    pub share_alpha_nodes: bool,
}

fn default_composite_key_depth() -> usize {
    DEFAULT_COMPOSITE_KEY_DEPTH
}

fn default_true() -> bool {
    true
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            composite_key_depth: default_composite_key_depth(),
            skip_unaffected_updates: true,
            share_alpha_nodes: true,
        }
    }
}

impl NetworkConfig {
    /// Builder-style composite key depth
    #[must_use]
    pub fn with_composite_key_depth(mut self, depth: usize) -> Self {
        self.composite_key_depth = depth;
        self
    }

    /// Builder-style update skipping toggle
    #[must_use]
    pub fn with_skip_unaffected_updates(mut self, skip: bool) -> Self {
        self.skip_unaffected_updates = skip;
        self
    }

    /// Builder-style alpha sharing toggle
    #[must_use]
    pub fn with_share_alpha_nodes(mut self, share: bool) -> Self {
        self.share_alpha_nodes = share;
        self
    }

    /// Reject settings the network cannot honour
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.composite_key_depth > MAX_COMPOSITE_KEY_DEPTH {
            return Err(BuildError::InvalidConfig {
                setting: "composite_key_depth".to_string(),
                message: format!(
                    "{} exceeds the maximum of {MAX_COMPOSITE_KEY_DEPTH}",
                    self.composite_key_depth
                ),
            });
        }
        Ok(())
    }

    /// Parse a YAML document (JSON is accepted too, being a subset)
    pub fn from_yaml_str(source: &str) -> anyhow::Result<Self> {
        let config: Self =
            serde_yaml::from_str(source).context("Failed to parse network configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file '{}'", path.display()))?;
        Self::from_yaml_str(&source)
    }

    /// Apply `TRELLIS_*` environment variables on top of these settings
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup. Unparseable values are logged and ignored.
    #[must_use]
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("TRELLIS_COMPOSITE_KEY_DEPTH") {
            match raw.trim().parse::<usize>() {
                Ok(depth) => self.composite_key_depth = depth,
                Err(_) => warn!("Ignoring TRELLIS_COMPOSITE_KEY_DEPTH='{}': not a number", raw),
            }
        }
        if let Some(raw) = lookup("TRELLIS_SKIP_UNAFFECTED_UPDATES") {
            match parse_flag(&raw) {
                Some(flag) => self.skip_unaffected_updates = flag,
                None => warn!("Ignoring TRELLIS_SKIP_UNAFFECTED_UPDATES='{}'", raw),
            }
        }
        if let Some(raw) = lookup("TRELLIS_SHARE_ALPHA_NODES") {
            match parse_flag(&raw) {
                Some(flag) => self.share_alpha_nodes = flag,
                None => warn!("Ignoring TRELLIS_SHARE_ALPHA_NODES='{}'", raw),
            }
        }
        info!(
            composite_key_depth = self.composite_key_depth,
            skip_unaffected_updates = self.skip_unaffected_updates,
            share_alpha_nodes = self.share_alpha_nodes,
            "Network configuration resolved"
        );
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.composite_key_depth, 3);
        assert!(config.skip_unaffected_updates);
        assert!(config.share_alpha_nodes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = NetworkConfig::from_yaml_str("composite_key_depth: 1\n").unwrap();
        assert_eq!(config.composite_key_depth, 1);
        assert!(config.skip_unaffected_updates);

        let json = NetworkConfig::from_yaml_str(r#"{"share_alpha_nodes": false}"#).unwrap();
        assert!(!json.share_alpha_nodes);
        assert_eq!(json.composite_key_depth, DEFAULT_COMPOSITE_KEY_DEPTH);
    }

    #[test]
    fn test_depth_above_maximum_is_rejected() {
        let err = NetworkConfig::from_yaml_str("composite_key_depth: 4").unwrap_err();
        assert!(format!("{err:#}").contains("composite_key_depth"));
        assert!(NetworkConfig::default().with_composite_key_depth(0).validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TRELLIS_COMPOSITE_KEY_DEPTH", "2"),
            ("TRELLIS_SKIP_UNAFFECTED_UPDATES", "off"),
            ("TRELLIS_SHARE_ALPHA_NODES", "maybe"),
        ]
        .into_iter()
        .collect();
        let config = NetworkConfig::default()
            .apply_overrides(|name| vars.get(name).map(|value| (*value).to_string()));
        assert_eq!(config.composite_key_depth, 2);
        assert!(!config.skip_unaffected_updates);
        assert!(config.share_alpha_nodes);
    }
}
