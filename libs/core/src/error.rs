use std::path::PathBuf;

use reqwest::StatusCode;

use crate::message::MessageKind;
use crate::platforms::PlatformKind;

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failure of a single webhook call. Every variant is terminal for the call;
/// nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{field} cannot be empty")]
    Validation { field: &'static str },
    #[error("{platform} does not support {kind} messages")]
    Unsupported {
        platform: PlatformKind,
        kind: MessageKind,
    },
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to send HTTP request")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode response")]
    Decode(#[source] serde_json::Error),
    #[error("media_id not found in response")]
    MissingMediaId,
    #[error("{platform} API error {code}: {message}")]
    Remote {
        platform: PlatformKind,
        code: i64,
        message: String,
    },
}

impl BridgeError {
    pub(crate) fn empty(field: &'static str) -> Self {
        BridgeError::Validation { field }
    }

    /// Stable identifier for log fields and tool error text.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Validation { .. } => "validation",
            BridgeError::Unsupported { .. } => "unsupported",
            BridgeError::Io { .. } => "io",
            BridgeError::Transport(_) => "transport",
            BridgeError::Status { .. } => "http_status",
            BridgeError::Decode(_) | BridgeError::MissingMediaId => "protocol",
            BridgeError::Remote { .. } => "remote_api",
        }
    }

    /// True when the failure was raised locally, before any network I/O.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            BridgeError::Validation { .. } | BridgeError::Unsupported { .. } | BridgeError::Io { .. }
        )
    }
}

/// Rejects an empty required field. Whitespace counts as content.
pub(crate) fn require(field: &'static str, value: &str) -> BridgeResult<()> {
    if value.is_empty() {
        return Err(BridgeError::empty(field));
    }
    Ok(())
}
