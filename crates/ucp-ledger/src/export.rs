//! Self-contained audit exports.

use serde::{Deserialize, Serialize};
use tracing::warn;
use ucp_core::constants::EXPORT_FORMAT_VERSION;

use crate::chain::{verify_chain, verify_prompt, verify_session};
use crate::errors::{LedgerIntegrityError, Result};
use crate::hop::Hop;
use crate::session::Session;

/// Result of verifying a chain at export time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Chain recomputed to the recorded head.
    Verified,
    /// Chain did not verify; see `verification_error`.
    Failed,
}

/// Everything needed to re-verify a session without the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditExport {
    /// Document format version.
    pub format_version: u32,
    /// RFC 3339 export time.
    pub exported_at: String,
    /// Session fields; its hops are listed separately.
    pub session: Session,
    /// Full hop sequence.
    pub hops: Vec<Hop>,
    /// Head of the chain.
    pub chain_hash: String,
    /// Outcome of verification at export time.
    pub verification_status: VerificationStatus,
    /// Reason verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_error: Option<String>,
}

impl AuditExport {
    /// Pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Session with its hops reattached.
    pub fn into_session(self) -> Session {
        let mut session = self.session;
        session.hops = self.hops;
        session
    }
}

/// Snapshot `session` for offline audit.
///
/// A broken chain is still exported, marked [`VerificationStatus::Failed`].
pub fn export(session: &Session) -> AuditExport {
    let (verification_status, verification_error) = match verify_session(session) {
        Ok(()) => (VerificationStatus::Verified, None),
        Err(err) => {
            warn!(session_id = %session.session_id, error = %err, "exporting session with broken chain");
            (VerificationStatus::Failed, Some(err.to_string()))
        }
    };
    let mut header = session.clone();
    let hops = std::mem::take(&mut header.hops);
    AuditExport {
        format_version: EXPORT_FORMAT_VERSION,
        exported_at: chrono::Utc::now().to_rfc3339(),
        chain_hash: session.chain_hash.clone(),
        session: header,
        hops,
        verification_status,
        verification_error,
    }
}

/// Re-check an export from its own contents.
pub fn verify_export(export: &AuditExport) -> std::result::Result<(), LedgerIntegrityError> {
    let computed = verify_chain(&export.hops)?;
    for recorded in [&export.chain_hash, &export.session.chain_hash] {
        if *recorded != computed {
            return Err(LedgerIntegrityError::ChainHashMismatch {
                recorded: recorded.clone(),
                computed,
            });
        }
    }
    verify_prompt(&export.session.raw_prompt, &export.hops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::append;
    use crate::hop::{HopMetrics, HopType};
    use crate::session::SessionStatus;
    use serde_json::json;
    use ucp_tokens::TokenMethod;

    fn finished() -> Session {
        let mut s = Session::new("explain rust", None);
        s.transition(SessionStatus::Compiling).unwrap();
        let _ = append(&mut s, HopType::Compile, json!({"wire": "[UCP:EXPLAIN][DATA:START]rust[DATA:END]"}), HopMetrics::default()).unwrap();
        s.transition(SessionStatus::Running).unwrap();
        let _ = append(&mut s, HopType::ProviderRequest, json!({"model": "m"}), HopMetrics::default()).unwrap();
        let metrics = HopMetrics {
            token_count: 42,
            token_method: TokenMethod::ProviderReported,
            latency_ms: 250,
            ..HopMetrics::default()
        };
        let _ = append(&mut s, HopType::ProviderResponse, json!({"text": "Rust is a language."}), metrics).unwrap();
        let _ = append(&mut s, HopType::Execution, json!({"output": "Rust is a language."}), HopMetrics::default()).unwrap();
        s.final_output = Some("Rust is a language.".into());
        s.transition(SessionStatus::Success).unwrap();
        s
    }

    #[test]
    fn export_round_trips_and_verifies_offline() {
        let session = finished();
        let doc = export(&session);
        assert_eq!(doc.verification_status, VerificationStatus::Verified);
        assert!(doc.session.hops.is_empty());
        assert_eq!(doc.hops.len(), 4);

        let json = doc.to_json().unwrap();
        let parsed = AuditExport::from_json(&json).unwrap();
        assert_eq!(verify_export(&parsed), Ok(()));
        assert_eq!(parsed.into_session(), session);
    }

    #[test]
    fn tampered_document_fails_offline_verification() {
        let doc = export(&finished());
        let mut value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        value["hops"][2]["payload"]["text"] = json!("Rust is a snake.");
        let tampered: AuditExport = serde_json::from_value(value).unwrap();
        assert_eq!(
            verify_export(&tampered),
            Err(LedgerIntegrityError::DigestMismatch { sequence_number: 3 })
        );
    }

    #[test]
    fn rewritten_prompt_fails_offline_verification() {
        let doc = export(&finished());
        let mut value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        value["session"]["raw_prompt"] = json!("explain how to wire money");
        let tampered: AuditExport = serde_json::from_value(value).unwrap();
        assert_eq!(verify_export(&tampered), Err(LedgerIntegrityError::PromptMismatch));
    }

    #[test]
    fn broken_session_exports_as_failed() {
        let mut s = finished();
        s.hops[0].payload = json!({"wire": "forged"});
        let doc = export(&s);
        assert_eq!(doc.verification_status, VerificationStatus::Failed);
        assert!(doc.verification_error.unwrap().contains("hop 1"));
    }

    #[test]
    fn export_shape() {
        let doc = export(&finished());
        insta::assert_json_snapshot!(doc.hops[2], {
            ".timestamp" => "[timestamp]",
            ".payload_digest" => "[digest]",
            ".prev_hash" => "[hash]",
            ".hash" => "[hash]"
        }, @r#"
        {
          "sequence_number": 3,
          "hop_type": "PROVIDER_RESPONSE",
          "payload": {
            "text": "Rust is a language."
          },
          "payload_digest": "[digest]",
          "token_count": 42,
          "token_method": "provider-reported",
          "latency_ms": 250,
          "prev_hash": "[hash]",
          "hash": "[hash]",
          "score": 99,
          "timestamp": "[timestamp]"
        }
        "#);

        let value = serde_json::to_value(&doc).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        for key in ["format_version", "exported_at", "session", "hops", "chain_hash", "verification_status"] {
            assert!(keys.iter().any(|k| k == key), "missing {key}");
        }
        assert_eq!(value["verification_status"], "verified");
        assert_eq!(value["session"]["status"], "success");
    }
}
