//! `verify` and `export`.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::json;
use ucp_core::SessionId;
use ucp_ledger::AuditExport;

use crate::app::{App, display_path};
use crate::render;

/// Recompute a stored session's chain.
pub fn verify_session<W: Write>(app: &App, session_id: &str, out: &mut W) -> Result<()> {
    let session = app.store.require_session(&SessionId::from(session_id))?;
    let result = ucp_ledger::verify_session(&session);
    report(
        app.json,
        session_id,
        session.hops.len(),
        &session.chain_hash,
        result.err().map(|e| e.to_string()),
        out,
    )
}

/// Recompute the chain of an exported document.
pub fn verify_file<W: Write>(path: &Path, as_json: bool, out: &mut W) -> Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let export = AuditExport::from_json(&text).with_context(|| format!("{} is not an audit export", path.display()))?;
    let result = ucp_ledger::verify_export(&export);
    report(
        as_json,
        export.session.session_id.as_str(),
        export.hops.len(),
        &export.chain_hash,
        result.err().map(|e| e.to_string()),
        out,
    )
}

fn report<W: Write>(
    as_json: bool,
    session_id: &str,
    hops: usize,
    chain_hash: &str,
    error: Option<String>,
    out: &mut W,
) -> Result<()> {
    if as_json {
        render::json(
            out,
            &json!({
                "sessionId": session_id,
                "verified": error.is_none(),
                "hops": hops,
                "chainHash": chain_hash,
                "error": error,
            }),
        )?;
    } else if error.is_none() {
        writeln!(out, "verified {session_id}: {hops} hops, chain {}", render::short_hash(chain_hash))?;
    }

    match error {
        None => Ok(()),
        Some(err) => bail!("session {session_id} failed verification: {err}"),
    }
}

/// Write a session's audit document to `output` or `out`.
pub fn export<W: Write>(app: &App, session_id: &str, output: Option<&Path>, out: &mut W) -> Result<()> {
    let session = app.store.require_session(&SessionId::from(session_id))?;
    let document = ucp_ledger::export(&session);
    let json = document.to_json()?;

    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            writeln!(
                out,
                "exported {} hops ({:?}) to {}",
                document.hops.len(),
                document.verification_status,
                display_path(path).display()
            )?;
        }
        None => writeln!(out, "{json}")?,
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use ucp_ledger::{HopMetrics, HopType, Session, SessionStatus, append};
    use ucp_store::Store;

    fn stored_session(app: &App) -> Session {
        let mut session = Session::new("Explain lifetimes", None);
        session.transition(SessionStatus::Compiling).unwrap();
        let _ = append(
            &mut session,
            HopType::Compile,
            json!({"wire": "[UCP:EXPLAIN][DATA:START]lifetimes[DATA:END]"}),
            HopMetrics {
                token_count: 6,
                latency_ms: 2,
                ..HopMetrics::default()
            },
        )
        .unwrap();
        session.fail("provider unreachable").unwrap();
        app.store.save_session(&session).unwrap();
        session
    }

    #[test]
    fn verify_stored_session() {
        let app = App::with_store(Store::in_memory().unwrap(), false);
        let session = stored_session(&app);
        let mut buf = Vec::new();
        verify_session(&app, session.session_id.as_str(), &mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().starts_with("verified "));
    }

    #[test]
    fn verify_missing_session_fails() {
        let app = App::with_store(Store::in_memory().unwrap(), false);
        assert!(verify_session(&app, "sess_missing", &mut Vec::new()).is_err());
    }

    #[test]
    fn exported_file_verifies_and_tampering_is_caught() {
        let app = App::with_store(Store::in_memory().unwrap(), true);
        let session = stored_session(&app);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");

        export(&app, session.session_id.as_str(), Some(&path), &mut Vec::new()).unwrap();
        let mut buf = Vec::new();
        verify_file(&path, true, &mut buf).unwrap();
        let value: Value = serde_json::from_str(&String::from_utf8(buf).unwrap()).unwrap();
        assert_eq!(value["verified"], true);
        assert_eq!(value["hops"], 1);

        let tampered = std::fs::read_to_string(&path).unwrap().replace("lifetimes", "generics");
        std::fs::write(&path, tampered).unwrap();
        let mut buf = Vec::new();
        assert!(verify_file(&path, true, &mut buf).is_err());
        let value: Value = serde_json::from_str(&String::from_utf8(buf).unwrap()).unwrap();
        assert_eq!(value["verified"], false);
    }

    #[test]
    fn export_to_stdout_is_json() {
        let app = App::with_store(Store::in_memory().unwrap(), false);
        let session = stored_session(&app);
        let mut buf = Vec::new();
        export(&app, session.session_id.as_str(), None, &mut buf).unwrap();
        let value: Value = serde_json::from_str(&String::from_utf8(buf).unwrap()).unwrap();
        assert_eq!(value["hops"].as_array().unwrap().len(), 1);
    }
}
