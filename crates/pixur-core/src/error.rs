//! Error types for the Pixur client.

use crate::comment::CommentTreeError;
use crate::pic::VarintError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Pixur client.
///
/// The type is `Clone` so that one in-flight request can hand the same
/// failure to every caller that joined it.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PixurError {
    /// Connection failure, timeout, or an undecodable response body
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Missing or expired credentials that a refresh could not fix
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// A request was rejected before any I/O happened
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A pic or comment id failed to decode
    #[error("Invalid id: {0}")]
    InvalidId(#[from] VarintError),

    /// A comment list violated the post-order contract
    #[error("Comment tree error: {0}")]
    CommentTree(#[from] CommentTreeError),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PixurError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an Api error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates an Unauthenticated error
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    /// Creates an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a server-declared failure
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Check if this is an authentication failure.
    ///
    /// Returns true for `Unauthenticated` errors and for `Api` errors with
    /// status 401, which is how the server reports a rejected token.
    pub fn is_unauthenticated(&self) -> bool {
        match self {
            Self::Unauthenticated(_) => true,
            Self::Api { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PixurError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PixurError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PixurError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PixurError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, PixurError>`.
pub type Result<T> = std::result::Result<T, PixurError>;
