use std::path::PathBuf;
use thiserror::Error;

/// Docatlas error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Object not found: {path} ({reason})")]
    ObjectNotFound { path: String, reason: String },

    #[error("Not callable: {0}")]
    NotCallable(String),

    #[error("Introspection of {path} failed: {message}")]
    Introspection { path: String, message: String },

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid filter pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for docatlas operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create an object-not-found error
    pub fn not_found(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ObjectNotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an introspection error for a single object
    pub fn introspection(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Introspection {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a parser error
    pub fn parser(msg: impl Into<String>) -> Self {
        Error::Parser(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether this error means the requested object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectNotFound { .. })
    }
}
