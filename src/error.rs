//! Error types for the structure engine.
//!
//! Every service propagates the first error it meets. Only the validation
//! service swallows `NotFound`, turning it into `false` or a warning string.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the engine and its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A type, member or file an operation needs does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An add operation targeted a name that is already declared.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A caller-supplied source snippet or argument is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A caller-supplied kind or operation token is not recognised.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The syntax provider could not produce a tree.
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration could not be read or decoded.
    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn type_not_found(type_name: &str, file: &std::path::Path) -> Self {
        EngineError::NotFound(format!(
            "type '{}' in {}",
            type_name,
            file.display()
        ))
    }

    pub fn member_not_found(kind: &str, member: &str, type_name: &str) -> Self {
        EngineError::NotFound(format!("{} '{}' in type '{}'", kind, member, type_name))
    }

    /// True for `NotFound`. A missing file also reports as not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            EngineError::NotFound(_) => true,
            EngineError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_not_found_predicate() {
        assert!(EngineError::type_not_found("Foo", Path::new("a.cs")).is_not_found());
        assert!(EngineError::io(
            "a.cs",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone")
        )
        .is_not_found());
        assert!(!EngineError::AlreadyExists("x".into()).is_not_found());
    }

    #[test]
    fn test_messages_name_the_target() {
        let err = EngineError::member_not_found("method", "Run", "Worker");
        assert_eq!(err.to_string(), "not found: method 'Run' in type 'Worker'");
    }
}
