//! `compile`, `decode`, `run` and `replay`.

use std::io::Write;

use anyhow::{Context, Result, bail};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use ucp_compiler::Compilation;
use ucp_core::SessionId;
use ucp_llm::ProviderConfig;
use ucp_runtime::{Pipeline, RunReport};

use crate::app::App;
use crate::render;

/// Compile `prompt` and print the packet. Nothing is recorded.
pub fn compile<W: Write>(app: &App, prompt: &str, provider: Option<&str>, out: &mut W) -> Result<()> {
    let pipeline = app.pipeline()?;
    let config = match provider {
        Some(name) => Some(named_provider(&pipeline, name)?),
        None => pipeline.resolve_provider(None).ok(),
    };
    let compilation = pipeline.compile_only(prompt, config.as_ref())?;

    if app.json {
        return render::json(out, &compilation);
    }
    print_compilation(&compilation, out)
}

fn print_compilation<W: Write>(compilation: &Compilation, out: &mut W) -> Result<()> {
    let stats = &compilation.compression;
    render::field(out, "action", compilation.packet.action.kind)?;
    render::field(out, "cache", render::cache_status(compilation.cache_status))?;
    render::field(
        out,
        "tokens",
        format!(
            "{} -> {} ({:.1}% saved)",
            stats.original_tokens, stats.compiled_tokens, compilation.savings_pct
        ),
    )?;
    render::field(out, "budget", compilation.token_budget)?;
    for flag in &compilation.flags {
        render::field(out, "flag", format!("{}/{}: {}", flag.rule_type, flag.rule_name, flag.reason))?;
    }
    writeln!(out)?;
    writeln!(out, "{}", compilation.wire)?;
    Ok(())
}

/// Parse a wire packet and print its parts.
pub fn decode<W: Write>(wire: &str, as_json: bool, out: &mut W) -> Result<()> {
    let frame = ucp_protocol::decode(wire).context("Failed to decode packet")?;
    let parameters: Vec<String> = frame.parameters.iter().map(ToString::to_string).collect();

    if as_json {
        return render::json(
            out,
            &json!({
                "action": frame.action.to_string(),
                "parameters": parameters,
                "data": frame.data,
            }),
        );
    }
    render::field(out, "action", frame.action)?;
    for param in &parameters {
        render::field(out, "param", param)?;
    }
    render::field(out, "data", &frame.data)?;
    Ok(())
}

/// Compile and execute `prompt` as a new session.
pub async fn run<W: Write>(app: &App, prompt: &str, provider: Option<&str>, out: &mut W) -> Result<()> {
    let pipeline = app.pipeline()?;
    let config = match provider {
        Some(name) => named_provider(&pipeline, name)?,
        None => pipeline.resolve_provider(None)?,
    };

    let cancel = CancellationToken::new();
    let interrupt = super::cancel_on_interrupt(cancel.clone());
    let report = pipeline.run(prompt, &config, &cancel).await;
    interrupt.abort();

    finish(app, report.context("Run failed")?, out)
}

/// Replay a stored session as a new one.
pub async fn replay<W: Write>(app: &App, session_id: &str, out: &mut W) -> Result<()> {
    let pipeline = app.pipeline()?;
    let id = SessionId::from(session_id);

    let cancel = CancellationToken::new();
    let interrupt = super::cancel_on_interrupt(cancel.clone());
    let report = pipeline.replay(&id, &cancel).await;
    interrupt.abort();

    finish(app, report.with_context(|| format!("Replay of {session_id} failed"))?, out)
}

fn named_provider(pipeline: &Pipeline, name: &str) -> Result<ProviderConfig> {
    pipeline
        .store()
        .get_provider_by_name(name)?
        .with_context(|| format!("No provider configuration named '{name}'"))
}

/// Print the report, then turn a failed outcome into the exit error.
fn finish<W: Write>(app: &App, report: RunReport, out: &mut W) -> Result<()> {
    let session = &report.session;
    let failure = report.outcome.as_ref().err();

    if app.json {
        render::json(
            out,
            &json!({
                "sessionId": session.session_id,
                "replayOf": session.replay_of,
                "status": session.status,
                "wire": report.compilation.as_ref().map(|c| &c.wire),
                "cacheStatus": report.compilation.as_ref().map(|c| c.cache_status),
                "totals": session.totals,
                "score": session.score(),
                "chainHash": session.chain_hash,
                "output": session.final_output,
                "error": failure.map(ToString::to_string),
                "category": failure.map(ucp_runtime::RuntimeError::category),
            }),
        )?;
    } else {
        render::field(out, "session", &session.session_id)?;
        if let Some(original) = &session.replay_of {
            render::field(out, "replay of", original)?;
        }
        render::field(out, "status", session.status)?;
        if let Some(compilation) = &report.compilation {
            render::field(out, "wire", compilation.wire.replace('\n', " "))?;
            render::field(out, "cache", render::cache_status(compilation.cache_status))?;
        }
        render::field(out, "tokens", render::totals(&session.totals))?;
        render::field(out, "latency", format!("{}ms", session.totals.latency_ms))?;
        render::field(out, "chain", render::short_hash(&session.chain_hash))?;
        if let Some(output) = &session.final_output {
            writeln!(out)?;
            writeln!(out, "{output}")?;
        }
    }

    match report.outcome {
        Ok(_) => Ok(()),
        Err(err) => {
            out.flush()?;
            bail!("session {} failed ({}): {err}", session.session_id, err.category())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use ucp_ledger::SessionStatus;
    use ucp_store::{SessionFilter, Store};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(json: bool) -> App {
        App::with_store(Store::in_memory().unwrap(), json)
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn provider_at(app: &App, server: &MockServer) {
        let mut config = ProviderConfig::new("local", server.uri(), "test-model");
        config.timeout_ms = 2_000;
        app.store.create_provider(&config).unwrap();
        app.store.set_default_provider(&config.id).unwrap();
    }

    fn completion(content: &str) -> Value {
        json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28}
        })
    }

    // ── compile / decode ──

    #[test]
    fn compile_prints_wire() {
        let app = app(false);
        let mut buf = Vec::new();
        compile(&app, "Summarize this in bullet points: the quarterly numbers", None, &mut buf).unwrap();
        let text = output(buf);
        assert!(text.contains("action     SUMMARIZE"));
        assert!(text.contains("[UCP:SUMMARIZE]"));
        assert!(text.contains("cache      miss"));
    }

    #[test]
    fn compile_records_nothing() {
        let app = app(true);
        let mut buf = Vec::new();
        compile(&app, "Translate to Spanish: good morning", None, &mut buf).unwrap();
        let value: Value = serde_json::from_str(&output(buf)).unwrap();
        assert_eq!(value["cacheStatus"], "miss");
        assert!(app.store.list_sessions(&SessionFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn compile_unknown_provider_fails() {
        let app = app(false);
        let err = compile(&app, "Explain recursion", Some("nope"), &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn decode_splits_frame() {
        let mut buf = Vec::new();
        decode("[UCP:TRANSLATE][LANG:ES][DATA:START]good morning[DATA:END]", true, &mut buf).unwrap();
        let value: Value = serde_json::from_str(&output(buf)).unwrap();
        assert_eq!(value["action"], "TRANSLATE");
        assert_eq!(value["parameters"], json!(["LANG:ES"]));
        assert_eq!(value["data"], "good morning");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("not a packet", false, &mut Vec::new()).is_err());
    }

    // ── run / replay ──

    #[tokio::test]
    async fn run_records_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("- up 4%")))
            .expect(2)
            .mount(&server)
            .await;
        let app = app(true);
        provider_at(&app, &server);

        let mut buf = Vec::new();
        run(&app, "Summarize in bullet points: revenue rose 4%", None, &mut buf).await.unwrap();
        let value: Value = serde_json::from_str(&output(buf)).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["output"], "- up 4%");
        assert_eq!(value["totals"]["total_tokens"], 28);

        let id = value["sessionId"].as_str().unwrap().to_owned();
        let mut buf = Vec::new();
        replay(&app, &id, &mut buf).await.unwrap();
        let replayed: Value = serde_json::from_str(&output(buf)).unwrap();
        assert_eq!(replayed["replayOf"], id.as_str());
        assert_eq!(replayed["status"], "success");
        assert_ne!(replayed["sessionId"], value["sessionId"]);
    }

    #[tokio::test]
    async fn provider_failure_is_an_error_but_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        let app = app(false);
        provider_at(&app, &server);

        let mut buf = Vec::new();
        let err = run(&app, "Explain the borrow checker", Some("local"), &mut buf).await.unwrap_err();
        assert!(err.to_string().contains("failed (provider)"));
        assert!(output(buf).contains("status     error"));

        let sessions = app.store.list_sessions(&SessionFilter::default()).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Error);
    }
}
