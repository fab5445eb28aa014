//! Error types for the symgraph front door.
//!
//! Engine errors ([`DecodeError`], [`EncodeError`]) are wrapped with the
//! file they came from. Every [`CliError`] maps to a stable exit code via
//! [`ExitCodeKind`].

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use symgraph_core::error::{DecodeError, EncodeError, MixinError, SemanticVersionError};

// ============================================================================
// Exit Codes
// ============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCodeKind {
    /// Bad flags or an empty input set.
    InvalidArguments = 2,
    /// Module selection failed (ambiguous or unknown module).
    ResolutionError = 3,
    /// A file could not be read, decoded or written.
    InputError = 4,
    /// Unexpected failure while encoding output.
    InternalError = 10,
}

impl ExitCodeKind {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ExitCodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// CLI Error
// ============================================================================

/// Errors reported by the `symgraph` command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid arguments from the caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// No symbol graph files were found in the inputs.
    #[error("no symbol graph files found in the given inputs")]
    NoInput,

    /// The inputs produced several modules and none was selected.
    #[error("inputs contain several modules ({}); pass --module-name", modules.join(", "))]
    AmbiguousModule { modules: Vec<String> },

    /// The requested module is not among the inputs.
    #[error("module '{name}' not found; available: {}", available.join(", "))]
    UnknownModule { name: String, available: Vec<String> },

    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A symbol graph file could not be decoded.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// The unified graph could not be encoded.
    #[error("failed to encode output: {0}")]
    Encode(#[from] EncodeError),
}

impl CliError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        CliError::InvalidArguments {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Encode(EncodeError::Json(err))
    }
}

impl From<&CliError> for ExitCodeKind {
    fn from(err: &CliError) -> Self {
        match err {
            CliError::InvalidArguments { .. } | CliError::NoInput => ExitCodeKind::InvalidArguments,
            CliError::AmbiguousModule { .. } | CliError::UnknownModule { .. } => {
                ExitCodeKind::ResolutionError
            }
            CliError::Io { .. } | CliError::Decode { .. } => ExitCodeKind::InputError,
            CliError::Encode(_) => ExitCodeKind::InternalError,
        }
    }
}
