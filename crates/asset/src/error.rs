//! Errors raised while loading a single mesh and its textures.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    /// Malformed numeric literal or face reference in OBJ text.
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The texture loader rejected a file (bad header, unsupported layout, ...).
    #[error("Texture error at {}: {message}", path.display())]
    Texture { path: PathBuf, message: String },

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),
}

impl AssetError {
    pub(crate) fn parse(line_no: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line: line_no + 1,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn texture(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Texture {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type AssetResult<T> = Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_reports_one_based_line() {
        let e = AssetError::parse(0, "bad float");
        assert_eq!(e.to_string(), "Parse error on line 1: bad float");
    }

    #[test]
    fn io_error_keeps_path_and_source() {
        let e = AssetError::io(
            "Textures/cube",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        let msg = e.to_string();
        assert!(msg.contains("Textures/cube"));
        assert!(msg.contains("missing"));
        assert!(std::error::Error::source(&e).is_some());
    }
}
