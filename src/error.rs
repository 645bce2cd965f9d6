use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the catalog store, the edit applicator and the
/// translation generator.
///
/// Every variant is reported to the user at the boundary of the action that
/// produced it. Validation variants are raised before any state is touched.
#[derive(Error, Debug)]
pub enum EditorError {
    /// A catalog file is not valid JSON or not a flat object of strings.
    #[error("malformed catalog file {}: {reason}", path.display())]
    MalformedCatalog { path: PathBuf, reason: String },

    #[error("file '{0}' already exists")]
    DuplicateFile(String),

    #[error("unknown file '{0}'")]
    UnknownFile(String),

    #[error("unknown key '{key}' in '{file}'")]
    UnknownKey { file: String, key: String },

    #[error("unknown locale '{0}'")]
    UnknownLocale(String),

    /// Renaming onto a key that some locale already has.
    #[error("key '{key}' already exists in '{file}' for locale(s): {}", locales.join(", "))]
    KeyCollision {
        file: String,
        key: String,
        locales: Vec<String>,
    },

    #[error("invalid name '{0}'")]
    InvalidName(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Upstream call, response shape, or request validation failure.
    #[error("translation generation failed: {0}")]
    Generation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("session state error on {}: {reason}", path.display())]
    SessionState { path: PathBuf, reason: String },

    #[error("no locales folder is open")]
    NoFolder,

    /// The open folder has no locale subfolders to hold a new file.
    #[error("the catalog has no locale folders")]
    NoLocales,
}

impl EditorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EditorError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EditorError::MalformedCatalog {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
