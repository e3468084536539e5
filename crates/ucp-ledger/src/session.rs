//! Sessions and their lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;
use ucp_core::constants::GENESIS_HASH;
use ucp_core::{ProviderConfigId, SessionId};
use ucp_tokens::SessionTotals;

use crate::errors::{LedgerError, Result};
use crate::hop::{Hop, HopType};

/// Lifecycle state.
///
/// ```text
/// pending ──► compiling ──► running ──► success
///    │            │            │
///    └────────────┴────────────┴──────► error
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, nothing recorded.
    #[default]
    Pending,
    /// Compiler owns the session.
    Compiling,
    /// Executor owns the session.
    Running,
    /// Finished with provider output.
    Success,
    /// Finished with a failure.
    Error,
}

impl SessionStatus {
    /// Every status.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Compiling,
        Self::Running,
        Self::Success,
        Self::Error,
    ];

    /// Lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Compiling => "compiling",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// `success` or `error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Whether the state machine allows `self -> next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Compiling | Self::Error)
                | (Self::Compiling, Self::Running | Self::Error)
                | (Self::Running, Self::Success | Self::Error)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("unknown session status: {s}"))
    }
}

/// One prompt's journey through compile and execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Identifier.
    pub session_id: SessionId,
    /// Prompt exactly as submitted.
    pub raw_prompt: String,
    /// Provider configuration used for execution.
    pub provider_config_ref: Option<ProviderConfigId>,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Recorded hops, in sequence order.
    #[serde(default)]
    pub hops: Vec<Hop>,
    /// Usage and cost.
    pub totals: SessionTotals,
    /// Hash of the last hop, or the genesis hash.
    pub chain_hash: String,
    /// Session this one replays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_of: Option<SessionId>,
    /// Provider output on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<String>,
    /// Failure description on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last change.
    pub updated_at: String,
}

impl Session {
    /// New pending session with an empty chain.
    pub fn new(raw_prompt: impl Into<String>, provider_config_ref: Option<ProviderConfigId>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            session_id: SessionId::new(),
            raw_prompt: raw_prompt.into(),
            provider_config_ref,
            status: SessionStatus::Pending,
            hops: Vec::new(),
            totals: SessionTotals::default(),
            chain_hash: GENESIS_HASH.to_owned(),
            replay_of: None,
            final_output: None,
            failure: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Move to `next` if the state machine allows it.
    pub fn transition(&mut self, next: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        info!(session_id = %self.session_id, from = %self.status, to = %next, "session transition");
        self.status = next;
        self.touch();
        Ok(())
    }

    /// Move to `error`, recording why.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(SessionStatus::Error)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    /// New pending session with the same prompt and provider.
    ///
    /// The original is left untouched.
    pub fn replay(&self) -> Result<Self> {
        if !self.status.is_terminal() {
            return Err(LedgerError::NotTerminal(self.status));
        }
        let mut replay = Self::new(self.raw_prompt.clone(), self.provider_config_ref.clone());
        replay.replay_of = Some(self.session_id.clone());
        info!(session_id = %replay.session_id, replay_of = %self.session_id, "session replay created");
        Ok(replay)
    }

    /// Last recorded hop.
    pub fn last_hop(&self) -> Option<&Hop> {
        self.hops.last()
    }

    /// Hops of one type.
    pub fn hops_of(&self, hop_type: HopType) -> impl Iterator<Item = &Hop> {
        self.hops.iter().filter(move |h| h.hop_type == hop_type)
    }

    /// Mean hop score, if any hops exist.
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self) -> Option<f64> {
        if self.hops.is_empty() {
            return None;
        }
        let sum: u64 = self.hops.iter().map(|h| u64::from(h.score)).sum();
        Some(sum as f64 / self.hops.len() as f64)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
