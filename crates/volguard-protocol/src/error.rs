//! Protocol and delivery errors.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by links and the JSON codec.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The other side has gone away (tab closed, aggregator stopped).
    #[error("receiving end does not exist")]
    LinkClosed,

    /// No reply arrived in time.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The other side answered with an error.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The reply did not match the request.
    #[error("unexpected reply to {0}")]
    UnexpectedReply(&'static str),

    /// JSON encode/decode failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Message `type` tag not recognized.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// A required field is absent or has the wrong type.
    #[error("missing or malformed field '{0}'")]
    MissingField(&'static str),
}

impl ProtocolError {
    /// Whether this error means the peer context no longer exists.
    pub fn is_teardown(&self) -> bool {
        matches!(self, ProtocolError::LinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_closed_is_teardown() {
        assert!(ProtocolError::LinkClosed.is_teardown());
        assert!(!ProtocolError::Timeout(Duration::from_millis(5)).is_teardown());
        assert!(!ProtocolError::Rejected("x".into()).is_teardown());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            ProtocolError::LinkClosed.to_string(),
            "receiving end does not exist"
        );
        assert_eq!(
            ProtocolError::MissingField("db").to_string(),
            "missing or malformed field 'db'"
        );
    }
}
