//! Error types for configuration and registration.

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while resolving sequence configuration.
///
/// All of these indicate a programming or deployment mistake in how an entity
/// type was declared; none are recoverable at the call site.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key that is not part of the resolved configuration map.
    #[error("unknown sequence configuration key: {0}")]
    UnknownKey(String),

    /// A known key carrying a value of the wrong shape.
    #[error("invalid value for `{key}`: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },

    /// No registration exists for the entity type.
    #[error("entity type not registered: {0}")]
    UnknownEntityType(String),

    /// The entity type was registered twice.
    #[error("entity type already registered: {0}")]
    DuplicateRegistration(String),

    /// Malformed TOML registry document.
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON override document.
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}
