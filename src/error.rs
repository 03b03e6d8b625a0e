use thiserror::Error;

/// Boxed error returned by content provider handlers
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for Relembed
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Malformed or incomplete relation metadata, raised while the store loads
    #[error("Metadata load error in {file}: {message}")]
    MetadataLoad { file: String, message: String },

    /// A parameter rule could not be evaluated against an object
    #[error(transparent)]
    ParameterResolution(#[from] ParameterResolutionError),

    /// Provider wiring defect or provider failure
    #[error(transparent)]
    ContentProvider(#[from] ContentProviderError),

    /// Invalid engine or serializer configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors raised while rendering a document
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON conversion errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML conversion errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmbedError {
    pub(crate) fn metadata(file: impl Into<String>, message: impl Into<String>) -> Self {
        EmbedError::MetadataLoad {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// A parameter rule failed for one relation of one object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot resolve parameter '{rule}' on {class}: {reason}")]
pub struct ParameterResolutionError {
    /// Name of the parameter whose rule failed
    pub rule: String,
    /// Runtime class of the source object
    pub class: String,
    pub reason: String,
}

/// Content provider errors. These point at wiring defects and are never
/// contained per relation.
#[derive(Error, Debug)]
pub enum ContentProviderError {
    #[error("Content provider service '{id}' is not registered")]
    UnknownService { id: String },

    #[error("Content provider service '{id}' has no method '{method}'")]
    UnknownMethod { id: String, method: String },

    #[error("Content provider {id}::{method} failed: {source}")]
    Invocation {
        id: String,
        method: String,
        #[source]
        source: BoxError,
    },
}

/// Convenient Result type using EmbedError
pub type Result<T> = std::result::Result<T, EmbedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EmbedError::metadata("relations.yml", "class Article: missing 'route'");
        assert!(err.to_string().contains("relations.yml"));
        assert!(err.to_string().contains("missing 'route'"));
    }

    #[test]
    fn test_parameter_error_names_rule_and_class() {
        let err = ParameterResolutionError {
            rule: "id".to_string(),
            class: "Article".to_string(),
            reason: "property 'id' not found".to_string(),
        };
        let embed: EmbedError = err.into();
        assert!(matches!(embed, EmbedError::ParameterResolution(_)));
        assert!(embed.to_string().contains("'id'"));
        assert!(embed.to_string().contains("Article"));
    }

    #[test]
    fn test_provider_invocation_keeps_source() {
        let source: BoxError = "backend down".into();
        let err = ContentProviderError::Invocation {
            id: "user.fetcher".to_string(),
            method: "fetchActive".to_string(),
            source,
        };
        assert!(err.to_string().contains("user.fetcher::fetchActive"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let embed_err: EmbedError = io_err.into();
        assert!(matches!(embed_err, EmbedError::Io(_)));
    }
}
