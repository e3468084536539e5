//! Protocol error types.

use thiserror::Error;

/// Errors raised while parsing parameter tokens or wire-encoded packets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Action name not in the protocol.
    #[error("unknown action: {0}")]
    UnknownAction(String),
    /// Parameter token is not `KEY:VALUE` with a known key.
    #[error("invalid parameter token: {0}")]
    InvalidParam(String),
    /// Input is empty.
    #[error("empty packet")]
    Empty,
    /// Input does not begin with `[UCP:`.
    #[error("packet must start with [UCP:<ACTION>]")]
    MissingActionTag,
    /// A `[` has no matching `]`.
    #[error("unterminated tag at byte {offset}")]
    UnterminatedTag {
        /// Byte offset of the opening bracket.
        offset: usize,
    },
    /// Something other than a tag appeared before the payload.
    #[error("unexpected content at byte {offset}")]
    UnexpectedContent {
        /// Byte offset of the offending text.
        offset: usize,
    },
    /// No `[DATA:START]` delimiter.
    #[error("missing [DATA:START]")]
    MissingDataStart,
    /// Packet does not end with `[DATA:END]`.
    #[error("missing [DATA:END]")]
    MissingDataEnd,
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
