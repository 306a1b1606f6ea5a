//! Engine configuration loaded from environment variables.

/// Engine configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `CQRS_SOURCE_URI`: URI of this system of record (default: `"local/cqrs/source"`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_uri: String,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            source_uri: std::env::var("CQRS_SOURCE_URI")
                .ok()
                .filter(|uri| !uri.is_empty())
                .unwrap_or(defaults.source_uri),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_uri: "local/cqrs/source".to_string(),
            log_level: "info".to_string(),
        }
    }
}
