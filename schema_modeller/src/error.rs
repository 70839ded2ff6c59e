//! Error types for the schema modeller

use thiserror::Error;

/// Result type for schema modeller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the schema modeller
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A raw failure reported by the database transport, before any context is added.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Reading structural metadata from a live database failed.
    #[error("Introspection error: {0}")]
    IntrospectionError(String),

    /// A DDL-issuing operation failed.
    #[error("Modeller error: {0}")]
    ModellerError(String),

    /// The dialect cannot express the requested structure (e.g. SET columns on PostgreSQL).
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// An introspected wire type has no column variant. This is a bug, not a runtime condition.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Manifest error: {0}")]
    ManifestError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Wrap a failure raised while reading metadata, naming what was being read.
    pub(crate) fn introspection(context: impl std::fmt::Display, cause: Error) -> Self {
        match cause {
            Error::UnsupportedType(_) | Error::UnsupportedFeature(_) => cause,
            other => Error::IntrospectionError(format!("{} ({})", context, other.cause_text())),
        }
    }

    /// Wrap a failure raised while executing DDL, naming the affected object.
    pub(crate) fn modeller(context: impl std::fmt::Display, cause: Error) -> Self {
        match cause {
            Error::UnsupportedType(_) | Error::UnsupportedFeature(_) => cause,
            other => Error::ModellerError(format!("{} ({})", context, other.cause_text())),
        }
    }

    /// The underlying message without the variant prefix.
    fn cause_text(&self) -> String {
        match self {
            Error::DatabaseError(msg)
            | Error::IntrospectionError(msg)
            | Error::ModellerError(msg) => msg.clone(),
            Error::SqlxError(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

/// Convert Serde JSON errors to modeller errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to modeller errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::ManifestError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modeller_context_wraps_transport_failures() {
        let err = Error::modeller(
            "Error adding column 'email' to table 'users'",
            Error::DatabaseError("duplicate column".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Modeller error: Error adding column 'email' to table 'users' (duplicate column)"
        );
    }

    #[test]
    fn capability_errors_pass_through_unwrapped() {
        let err = Error::modeller(
            "Error adding column 'tags' to table 'posts'",
            Error::UnsupportedFeature("SET data types are not supported for PostgreSQL".to_string()),
        );
        assert!(matches!(err, Error::UnsupportedFeature(_)));
    }
}
