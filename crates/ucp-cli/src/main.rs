//! # ucp
//!
//! Command-line front end: compiles prompts into command packets, runs them
//! against a provider, and audits the sessions left in the store.

#![deny(unsafe_code)]

mod app;
mod commands;
mod render;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::App;
use crate::commands::{catalog, prompt, providers, sessions};

/// Universal command protocol CLI.
#[derive(Parser, Debug)]
#[command(name = "ucp", version, about = "Compile prompts into command packets and audit their execution")]
struct Cli {
    /// Path to the `SQLite` database (overrides `store.path`).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Log filter (overrides `logging.level`).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a prompt without executing it.
    Compile {
        /// Natural-language prompt.
        prompt: String,
        /// Provider whose limits size the token budget.
        #[arg(long)]
        provider: Option<String>,
    },
    /// Decode a wire-format packet.
    Decode {
        /// Packet text, e.g. `[UCP:SUMMARIZE][FORMAT:BULLET][DATA:START]...[DATA:END]`.
        wire: String,
    },
    /// Compile and execute a prompt as a new session.
    Run {
        /// Natural-language prompt.
        prompt: String,
        /// Stored provider configuration to use instead of the default.
        #[arg(long)]
        provider: Option<String>,
    },
    /// Re-run a finished session as a new one.
    Replay {
        /// Session to replay.
        session_id: String,
    },
    /// Recompute a session's hash chain.
    Verify {
        /// Stored session to check.
        #[arg(required_unless_present = "file")]
        session_id: Option<String>,
        /// Exported audit document to check instead.
        #[arg(long, conflicts_with = "session_id")]
        file: Option<PathBuf>,
    },
    /// Export a session and its hops as an audit document.
    Export {
        /// Session to export.
        session_id: String,
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Recorded sessions.
    #[command(subcommand)]
    Sessions(sessions::SessionsCommand),
    /// Dictionary entries.
    #[command(subcommand)]
    Dictionary(catalog::DictionaryCommand),
    /// Compiler rules.
    #[command(subcommand)]
    Rules(catalog::RulesCommand),
    /// Provider configurations.
    #[command(subcommand)]
    Providers(providers::ProvidersCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut out = std::io::stdout().lock();

    // Commands that never touch the store.
    match &cli.command {
        Command::Decode { wire } => return prompt::decode(wire, cli.json, &mut out),
        Command::Verify {
            file: Some(path), ..
        } => return commands::audit::verify_file(path, cli.json, &mut out),
        _ => {}
    }

    let app = App::open(cli.db_path.as_deref(), cli.log_level.as_deref(), cli.json)?;
    dispatch(&app, cli.command, &mut out).await?;
    out.flush()?;
    Ok(())
}

async fn dispatch<W: Write>(app: &App, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::Compile { prompt, provider } => prompt::compile(app, &prompt, provider.as_deref(), out),
        Command::Decode { wire } => prompt::decode(&wire, app.json, out),
        Command::Run { prompt, provider } => prompt::run(app, &prompt, provider.as_deref(), out).await,
        Command::Replay { session_id } => prompt::replay(app, &session_id, out).await,
        Command::Verify { session_id, file } => match (session_id, file) {
            (_, Some(path)) => commands::audit::verify_file(&path, app.json, out),
            (Some(id), None) => commands::audit::verify_session(app, &id, out),
            (None, None) => anyhow::bail!("a session id or --file is required"),
        },
        Command::Export { session_id, output } => commands::audit::export(app, &session_id, output.as_deref(), out),
        Command::Sessions(cmd) => sessions::handle(app, cmd, out),
        Command::Dictionary(cmd) => catalog::handle_dictionary(app, cmd, out),
        Command::Rules(cmd) => catalog::handle_rules(app, cmd, out),
        Command::Providers(cmd) => providers::handle(app, cmd, out),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["ucp", "compile", "summarize this", "--json", "--db-path", "/tmp/x.db"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Command::Compile { ref prompt, provider: None } if prompt == "summarize this"));
    }

    #[test]
    fn verify_needs_a_target() {
        assert!(Cli::try_parse_from(["ucp", "verify"]).is_err());
        assert!(Cli::try_parse_from(["ucp", "verify", "sess_1"]).is_ok());
        assert!(Cli::try_parse_from(["ucp", "verify", "--file", "audit.json"]).is_ok());
        assert!(Cli::try_parse_from(["ucp", "verify", "sess_1", "--file", "audit.json"]).is_err());
    }

    #[test]
    fn nested_subcommands_parse() {
        let cli = Cli::try_parse_from(["ucp", "sessions", "list", "--status", "error", "--limit", "5"]).unwrap();
        assert!(matches!(cli.command, Command::Sessions(_)));

        let cli = Cli::try_parse_from(["ucp", "dictionary", "rollback", "summarize", "2"]).unwrap();
        assert!(matches!(cli.command, Command::Dictionary(_)));

        assert!(Cli::try_parse_from(["ucp", "sessions", "list", "--status", "bogus"]).is_err());
    }
}
