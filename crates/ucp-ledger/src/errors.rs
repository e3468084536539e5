//! Ledger error types.

use thiserror::Error;

use crate::hop::HopType;
use crate::session::SessionStatus;

/// A recorded chain does not match its recomputation.
///
/// Never repaired automatically; the session's record can no longer be
/// trusted past `sequence_number`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerIntegrityError {
    /// Sequence numbers are not `1, 2, 3, ...`.
    #[error("hop sequence broken: expected {expected}, found {found}")]
    SequenceGap {
        /// Expected sequence number.
        expected: u64,
        /// Recorded sequence number.
        found: u64,
    },
    /// `prev_hash` is not the previous hop's hash.
    #[error("hop {sequence_number}: prev_hash does not link to the previous hop")]
    BrokenLink {
        /// First broken hop.
        sequence_number: u64,
    },
    /// Payload does not hash to the recorded digest.
    #[error("hop {sequence_number}: payload digest mismatch")]
    DigestMismatch {
        /// First broken hop.
        sequence_number: u64,
    },
    /// Recorded hash does not match its inputs.
    #[error("hop {sequence_number}: hash mismatch")]
    HashMismatch {
        /// First broken hop.
        sequence_number: u64,
    },
    /// Session `chain_hash` is not the last hop's hash.
    #[error("chain hash {recorded} does not match computed head {computed}")]
    ChainHashMismatch {
        /// Stored head.
        recorded: String,
        /// Head recomputed from the hops.
        computed: String,
    },
    /// Session `raw_prompt` is not the prompt the COMPILE hop recorded.
    #[error("raw prompt does not match the digest recorded by the compile hop")]
    PromptMismatch,
}

impl LedgerIntegrityError {
    /// First hop that failed, if the failure is tied to one.
    pub fn sequence_number(&self) -> Option<u64> {
        match self {
            Self::SequenceGap { found, .. } => Some(*found),
            Self::BrokenLink { sequence_number }
            | Self::DigestMismatch { sequence_number }
            | Self::HashMismatch { sequence_number } => Some(*sequence_number),
            Self::ChainHashMismatch { .. } | Self::PromptMismatch => None,
        }
    }
}

/// Errors raised while writing to or reading from the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Status change not allowed by the state machine.
    #[error("invalid session transition {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: SessionStatus,
        /// Requested status.
        to: SessionStatus,
    },
    /// Hop appended out of stage order.
    #[error("cannot append {hop_type} hop while {status} after {last:?}")]
    OutOfOrder {
        /// Hop being appended.
        hop_type: HopType,
        /// Session status.
        status: SessionStatus,
        /// Last recorded hop type.
        last: Option<HopType>,
    },
    /// Only terminal sessions can be replayed.
    #[error("session is {0}; only finished sessions can be replayed")]
    NotTerminal(SessionStatus),
    /// Chain verification failed.
    #[error(transparent)]
    Integrity(#[from] LedgerIntegrityError),
    /// Export document could not be (de)serialized.
    #[error("export serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
