//! Error types for database loading and lookup.

use std::path::PathBuf;

/// The result type returned by every fallible database operation.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors that can occur while resolving devices or loading database files.
///
/// None of these are recovered inside the crate. Every error aborts the
/// operation in progress and nothing is cached for the failing key, so a
/// caller may retry once the database on disk has been fixed.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// A device name, IDCODE, or locator is not present in the catalog.
    #[error("no device in database with {what}")]
    NotFound {
        /// Description of the key that was looked up.
        what: String,
    },

    /// A database file is missing or unreadable.
    #[error("database I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A database file does not match the expected schema.
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// The file being parsed.
        path: PathBuf,
        /// Description of the parse failure, including the offending field.
        reason: String,
    },

    /// A database file is well-formed but internally inconsistent.
    #[error("inconsistent data in {path}: {reason}")]
    Consistency {
        /// The file being parsed.
        path: PathBuf,
        /// Description of the violated invariant.
        reason: String,
    },

    /// The family has no known globals layout.
    #[error("unsupported device family '{family}'")]
    UnsupportedFamily {
        /// The family tag that was requested.
        family: String,
    },

    /// A locator component cannot name a file inside the database root.
    #[error("invalid locator '{locator}': {reason}")]
    InvalidLocator {
        /// The offending locator.
        locator: String,
        /// Which component is unusable and why.
        reason: String,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Config(String),
}

impl DatabaseError {
    /// Creates a [`DatabaseError::NotFound`] error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Attaches a file path to an error produced by a path-free parser.
    ///
    /// Parsers in this crate work on strings and report errors against an
    /// empty path; loaders call this to fill in the file they actually read.
    pub(crate) fn at_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::Parse { reason, .. } => Self::Parse {
                path: path.into(),
                reason,
            },
            Self::Consistency { reason, .. } => Self::Consistency {
                path: path.into(),
                reason,
            },
            other => other,
        }
    }

    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            path: PathBuf::new(),
            reason: reason.into(),
        }
    }

    pub(crate) fn consistency(reason: impl Into<String>) -> Self {
        Self::Consistency {
            path: PathBuf::new(),
            reason: reason.into(),
        }
    }
}

/// Reads a database file to a string, mapping failures to [`DatabaseError::Io`].
pub(crate) fn read_file(path: &std::path::Path) -> DatabaseResult<String> {
    log::debug!("reading {}", path.display());
    std::fs::read_to_string(path).map_err(|source| DatabaseError::Io {
        path: path.to_path_buf(),
        source,
    })
}
