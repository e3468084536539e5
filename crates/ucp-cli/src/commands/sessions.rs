//! `sessions` subcommands.

use std::io::Write;

use anyhow::{Result, bail};
use clap::{Subcommand, ValueEnum};
use ucp_core::SessionId;
use ucp_ledger::SessionStatus;
use ucp_store::{SessionFilter, SessionOrder};
use ucp_tokens::{format_cost, format_tokens};

use crate::app::App;
use crate::render;

#[derive(Subcommand, Debug)]
pub enum SessionsCommand {
    /// List recorded sessions.
    List {
        /// Only sessions in this status.
        #[arg(long, value_parser = parse_status)]
        status: Option<SessionStatus>,
        /// Only replays of this session.
        #[arg(long)]
        replay_of: Option<String>,
        /// Sort order.
        #[arg(long, value_enum, default_value_t = Order::Newest)]
        order: Order,
        /// Maximum rows.
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Rows to skip.
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Show a session with its hops.
    Show {
        session_id: String,
    },
    /// Aggregate counts, tokens and cost.
    Stats,
    /// Delete a session and its hops.
    Delete {
        session_id: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Order {
    Newest,
    Oldest,
    Score,
    Tokens,
}

impl From<Order> for SessionOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Newest => Self::Newest,
            Order::Oldest => Self::Oldest,
            Order::Score => Self::Score,
            Order::Tokens => Self::Tokens,
        }
    }
}

fn parse_status(s: &str) -> Result<SessionStatus, String> {
    s.parse()
}

pub fn handle<W: Write>(app: &App, command: SessionsCommand, out: &mut W) -> Result<()> {
    match command {
        SessionsCommand::List {
            status,
            replay_of,
            order,
            limit,
            offset,
        } => {
            let filter = SessionFilter {
                status,
                replay_of: replay_of.map(SessionId::from_string),
                order: order.into(),
                limit: Some(limit),
                offset,
                ..SessionFilter::default()
            };
            list(app, &filter, out)
        }
        SessionsCommand::Show { session_id } => show(app, &session_id, out),
        SessionsCommand::Stats => stats(app, out),
        SessionsCommand::Delete { session_id } => {
            if !app.store.delete_session(&SessionId::from(session_id.as_str()))? {
                bail!("no session {session_id}");
            }
            writeln!(out, "deleted {session_id}")?;
            Ok(())
        }
    }
}

fn list<W: Write>(app: &App, filter: &SessionFilter, out: &mut W) -> Result<()> {
    let sessions = app.store.list_sessions(filter)?;
    if app.json {
        return render::json(out, &sessions);
    }
    for s in &sessions {
        let score = s.score.map_or_else(|| "-".to_owned(), |v| format!("{v:.2}"));
        writeln!(
            out,
            "{}  {:<9} {:>2} hops  {:>6} tok  score {score:<5} {}",
            s.session_id,
            s.status.as_str(),
            s.hop_count,
            format_tokens(s.totals.total_tokens),
            render::truncate(&s.raw_prompt, 40),
        )?;
    }
    Ok(())
}

fn show<W: Write>(app: &App, session_id: &str, out: &mut W) -> Result<()> {
    let session = app.store.require_session(&SessionId::from(session_id))?;
    if app.json {
        return render::json(out, &session);
    }

    render::field(out, "session", &session.session_id)?;
    render::field(out, "status", session.status)?;
    render::field(out, "prompt", &session.raw_prompt)?;
    if let Some(original) = &session.replay_of {
        render::field(out, "replay of", original)?;
    }
    render::field(out, "created", &session.created_at)?;
    render::field(out, "tokens", render::totals(&session.totals))?;
    render::field(out, "chain", render::short_hash(&session.chain_hash))?;
    if let Some(failure) = &session.failure {
        render::field(out, "failure", failure)?;
    }
    writeln!(out)?;
    for hop in &session.hops {
        writeln!(
            out,
            "{:>3}  {:<18} {:>6} tok {:>6}ms  score {:>3}  {}",
            hop.sequence_number,
            hop.hop_type.as_str(),
            hop.token_count,
            hop.latency_ms,
            hop.score,
            render::short_hash(&hop.hash),
        )?;
    }
    if let Some(output) = &session.final_output {
        writeln!(out)?;
        writeln!(out, "{output}")?;
    }
    Ok(())
}

fn stats<W: Write>(app: &App, out: &mut W) -> Result<()> {
    let stats = app.store.session_stats()?;
    if app.json {
        return render::json(out, &stats);
    }
    render::field(out, "sessions", stats.total)?;
    render::field(out, "success", stats.successful)?;
    render::field(out, "failed", stats.failed)?;
    render::field(out, "tokens", format_tokens(stats.total_tokens))?;
    render::field(out, "cost", format_cost(stats.total_cost))?;
    let average = stats.average_score.map_or_else(|| "-".to_owned(), |v| format!("{v:.2}"));
    render::field(out, "avg score", average)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use ucp_ledger::Session;
    use ucp_store::Store;

    fn app_with_sessions(json: bool) -> (App, Vec<Session>) {
        let app = App::with_store(Store::in_memory().unwrap(), json);
        let mut sessions = Vec::new();
        for prompt in ["Summarize the report", "Translate hello"] {
            let mut session = Session::new(prompt, None);
            session.fail("no provider").unwrap();
            app.store.save_session(&session).unwrap();
            sessions.push(session);
        }
        (app, sessions)
    }

    #[test]
    fn list_filters_by_status() {
        let (app, _) = app_with_sessions(true);
        let mut buf = Vec::new();
        let filter = SessionFilter {
            status: Some(SessionStatus::Success),
            ..SessionFilter::default()
        };
        list(&app, &filter, &mut buf).unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value, serde_json::json!([]));

        let mut buf = Vec::new();
        list(&app, &SessionFilter::default(), &mut buf).unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn show_prints_failure() {
        let (app, sessions) = app_with_sessions(false);
        let mut buf = Vec::new();
        show(&app, sessions[0].session_id.as_str(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("failure    no provider"));
        assert!(text.contains("status     error"));
    }

    #[test]
    fn delete_then_missing() {
        let (app, sessions) = app_with_sessions(false);
        let id = sessions[1].session_id.to_string();
        let mut buf = Vec::new();
        handle(&app, SessionsCommand::Delete { session_id: id.clone() }, &mut buf).unwrap();
        assert!(handle(&app, SessionsCommand::Delete { session_id: id }, &mut Vec::new()).is_err());
        assert_eq!(app.store.session_stats().unwrap().total, 1);
    }

    #[test]
    fn stats_count_failures() {
        let (app, _) = app_with_sessions(true);
        let mut buf = Vec::new();
        stats(&app, &mut buf).unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["failed"], 2);
        assert_eq!(value["successful"], 0);
    }
}
