//! Resolver configuration.
//!
//! ```toml
//! max_payload_bytes = 1048576
//! allowed_content_types = ["text/plain", "application/json", "image/*"]
//! cache_capacity = 1024
//! positive_ttl_ms = 60000
//! negative_ttl_ms = 5000
//! max_reference_depth = 0
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::limits::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_NEGATIVE_TTL_MS,
    DEFAULT_POSITIVE_TTL_MS, MAX_REFERENCE_DEPTH,
};

/// Resolver configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Largest payload `$payload` may return.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,

    /// Media types `$payload` may return. `type/*` matches a whole family.
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: BTreeSet<String>,

    /// Maximum number of cached results.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// How long a successful resolution is reused.
    #[serde(default = "default_positive_ttl_ms")]
    pub positive_ttl_ms: u64,

    /// How long a failed resolution is reused.
    #[serde(default = "default_negative_ttl_ms")]
    pub negative_ttl_ms: u64,

    /// Nested reference hops to follow (0 = return references as values).
    #[serde(default)]
    pub max_reference_depth: u8,
}

fn default_max_payload_bytes() -> u64 {
    DEFAULT_MAX_PAYLOAD_BYTES
}

fn default_allowed_content_types() -> BTreeSet<String> {
    ["text/plain", "application/json", "image/*"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_positive_ttl_ms() -> u64 {
    DEFAULT_POSITIVE_TTL_MS
}

fn default_negative_ttl_ms() -> u64 {
    DEFAULT_NEGATIVE_TTL_MS
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            allowed_content_types: default_allowed_content_types(),
            cache_capacity: default_cache_capacity(),
            positive_ttl_ms: default_positive_ttl_ms(),
            negative_ttl_ms: default_negative_ttl_ms(),
            max_reference_depth: 0,
        }
    }
}

impl ResolverConfig {
    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates TOML text. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ResolverConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn positive_ttl(&self) -> Duration {
        Duration::from_millis(self.positive_ttl_ms)
    }

    pub fn negative_ttl(&self) -> Duration {
        Duration::from_millis(self.negative_ttl_ms)
    }

    /// Checks the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_capacity",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_payload_bytes",
                reason: "must be greater than zero".into(),
            });
        }
        for content_type in &self.allowed_content_types {
            if !is_media_range(content_type) {
                return Err(ConfigError::Invalid {
                    field: "allowed_content_types",
                    reason: format!("{content_type:?} is not of the form type/subtype"),
                });
            }
        }
        if self.max_reference_depth > MAX_REFERENCE_DEPTH {
            return Err(ConfigError::Invalid {
                field: "max_reference_depth",
                reason: format!("{} exceeds the cap of {}", self.max_reference_depth, MAX_REFERENCE_DEPTH),
            });
        }
        Ok(())
    }
}

/// `type/subtype` or `type/*`, with no parameters or whitespace.
fn is_media_range(s: &str) -> bool {
    let token = |t: &str| {
        !t.is_empty()
            && t.bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$&^_.+-".contains(&b))
    };
    match s.split_once('/') {
        Some((ty, "*")) => token(ty),
        Some((ty, sub)) => token(ty) && token(sub),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.max_payload_bytes, 1024 * 1024);
        assert!(config.allowed_content_types.contains("image/*"));
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.positive_ttl(), Duration::from_secs(60));
        assert_eq!(config.negative_ttl(), Duration::from_secs(5));
        assert_eq!(config.max_reference_depth, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ResolverConfig::from_toml_str(
            r#"
            max_payload_bytes = 4096
            allowed_content_types = ["application/json"]
            "#,
        )
        .unwrap();
        assert_eq!(config.max_payload_bytes, 4096);
        assert_eq!(config.allowed_content_types.len(), 1);
        assert_eq!(config.cache_capacity, 1024);

        assert_eq!(ResolverConfig::from_toml_str("").unwrap(), ResolverConfig::default());
    }

    #[test]
    fn test_validate_rejects() {
        let cases: [(&str, &str); 5] = [
            ("cache_capacity = 0", "cache_capacity"),
            ("max_payload_bytes = 0", "max_payload_bytes"),
            (r#"allowed_content_types = ["json"]"#, "allowed_content_types"),
            (r#"allowed_content_types = ["text/plain; charset=utf-8"]"#, "allowed_content_types"),
            ("max_reference_depth = 9", "max_reference_depth"),
        ];
        for (toml, expected) in cases {
            match ResolverConfig::from_toml_str(toml) {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
                other => panic!("{toml:?}: expected invalid {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ResolverConfig::from_toml_str("cache_capacity = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            ResolverConfig::load("/nonexistent/arkiv-resolver.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("arkiv-attrs-config-{}.toml", std::process::id()));
        std::fs::write(&path, "negative_ttl_ms = 250\nmax_reference_depth = 2\n").unwrap();
        let config = ResolverConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.negative_ttl(), Duration::from_millis(250));
        assert_eq!(config.max_reference_depth, 2);
    }
}
