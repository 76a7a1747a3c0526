use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can abort a translation. No variant leaves partial output
/// behind.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {source_name}:\n{message}")]
    Parse { source_name: String, message: String },

    #[error("unsupported construct at `{path}`: {reason}")]
    UnsupportedConstruct { path: String, reason: String },

    /// A compiler defect rather than bad input.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl Error {
    pub(crate) fn unsupported(path: impl ToString, reason: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
