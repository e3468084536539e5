//! `dictionary` and `rules` subcommands.
//!
//! Edits load the stored catalog, apply one change through the owning type
//! so versioning and the audit trail stay consistent, then persist the
//! touched record.

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use serde_json::json;
use ucp_core::{EntryId, RuleId};
use ucp_dictionary::{Dictionary, extract_parameters};
use ucp_protocol::ActionKind;
use ucp_rules::{Rule, RuleEngine, RuleType};
use ucp_store::{EntryFilter, RuleFilter};

use crate::app::App;
use crate::render;

#[derive(Subcommand, Debug)]
pub enum DictionaryCommand {
    /// List entries in lookup order.
    List {
        /// Only entries producing this action.
        #[arg(long, value_parser = parse_action)]
        action: Option<ActionKind>,
        /// Only entries in this category.
        #[arg(long)]
        category: Option<String>,
        /// Include archived entries.
        #[arg(long)]
        all: bool,
    },
    /// Show an entry with its audit trail.
    Show { name: String },
    /// Show which entry a prompt would match.
    Lookup { text: String },
    /// Archive an entry so lookups skip it.
    Archive { name: String },
    /// Bring an archived entry back.
    Restore { name: String },
    /// Restore the body recorded at an earlier version.
    Rollback { name: String, version: u32 },
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// List rules in execution order.
    List {
        /// Only rules of this type.
        #[arg(long = "type", value_parser = parse_rule_type)]
        rule_type: Option<RuleType>,
        /// Include archived rules.
        #[arg(long)]
        all: bool,
    },
    /// Show a rule with its audit trail.
    Show {
        name: String,
        /// Disambiguate rules sharing a name.
        #[arg(long = "type", value_parser = parse_rule_type)]
        rule_type: Option<RuleType>,
    },
    /// Archive a rule so the engine skips it.
    Archive {
        name: String,
        #[arg(long = "type", value_parser = parse_rule_type)]
        rule_type: Option<RuleType>,
    },
    /// Bring an archived rule back.
    Restore {
        name: String,
        #[arg(long = "type", value_parser = parse_rule_type)]
        rule_type: Option<RuleType>,
    },
    /// Restore the body recorded at an earlier version.
    Rollback {
        name: String,
        version: u32,
        #[arg(long = "type", value_parser = parse_rule_type)]
        rule_type: Option<RuleType>,
    },
}

fn parse_action(s: &str) -> Result<ActionKind, String> {
    s.parse().map_err(|e: ucp_protocol::ProtocolError| e.to_string())
}

fn parse_rule_type(s: &str) -> Result<RuleType, String> {
    s.parse()
}

// ─────────────────────────────────────────────────────────────────────────────
// Dictionary
// ─────────────────────────────────────────────────────────────────────────────

pub fn handle_dictionary<W: Write>(app: &App, command: DictionaryCommand, out: &mut W) -> Result<()> {
    let (mut dictionary, _) = app.catalog()?;
    let actor = App::actor();

    match command {
        DictionaryCommand::List { action, category, all } => {
            let filter = EntryFilter {
                action,
                category,
                include_archived: all,
                ..EntryFilter::default()
            };
            list_entries(app, &filter, out)
        }
        DictionaryCommand::Show { name } => {
            let entry = dictionary
                .get_by_name(&name)
                .with_context(|| format!("No dictionary entry named '{name}'"))?;
            render::json(out, entry)
        }
        DictionaryCommand::Lookup { text } => lookup(app, &dictionary, &text, out),
        DictionaryCommand::Archive { name } => {
            let id = entry_id(&dictionary, &name)?;
            let changed = dictionary.archive(&id, &actor)?;
            persist_entry(app, &dictionary, &id)?;
            report_change(out, &name, changed, "archived", "already archived")
        }
        DictionaryCommand::Restore { name } => {
            let id = entry_id(&dictionary, &name)?;
            let changed = dictionary.restore(&id, &actor)?;
            persist_entry(app, &dictionary, &id)?;
            report_change(out, &name, changed, "restored", "already active")
        }
        DictionaryCommand::Rollback { name, version } => {
            let id = entry_id(&dictionary, &name)?;
            let fields = dictionary.rollback(&id, version, &actor)?;
            persist_entry(app, &dictionary, &id)?;
            let current = dictionary.get(&id).map_or(0, ucp_dictionary::DictionaryEntry::version);
            writeln!(out, "{name}: rolled back to v{version} as v{current} ({})", fields.join(", "))?;
            Ok(())
        }
    }
}

fn entry_id(dictionary: &Dictionary, name: &str) -> Result<EntryId> {
    dictionary
        .get_by_name(name)
        .map(|e| e.id.clone())
        .with_context(|| format!("No dictionary entry named '{name}'"))
}

fn persist_entry(app: &App, dictionary: &Dictionary, id: &EntryId) -> Result<()> {
    let entry = dictionary.get(id).with_context(|| format!("Entry {id} vanished"))?;
    app.store.save_entry(entry)?;
    Ok(())
}

fn list_entries<W: Write>(app: &App, filter: &EntryFilter, out: &mut W) -> Result<()> {
    let entries = app.store.list_entries(filter)?;
    if app.json {
        return render::json(out, &entries);
    }
    for entry in &entries {
        let body = entry.body();
        writeln!(
            out,
            "{:<14} {:<10} {:<12} v{:<3}{} {}",
            body.command_name,
            body.action.as_str(),
            body.category,
            entry.version(),
            if entry.is_archived() { " [archived]" } else { "" },
            body.trigger_keywords.join(", "),
        )?;
    }
    Ok(())
}

fn lookup<W: Write>(app: &App, dictionary: &Dictionary, text: &str, out: &mut W) -> Result<()> {
    let Some(found) = dictionary.lookup(text) else {
        if app.json {
            return render::json(out, &serde_json::Value::Null);
        }
        writeln!(out, "no entry matches; the prompt would fall back to REQUEST")?;
        return Ok(());
    };
    let body = found.entry.body();
    let parameters: Vec<String> = extract_parameters(body, text).iter().map(ToString::to_string).collect();

    if app.json {
        return render::json(
            out,
            &json!({
                "command": body.command_name,
                "action": body.action.to_string(),
                "keyword": found.keyword,
                "parameters": parameters,
                "remainder": found.remainder,
            }),
        );
    }
    render::field(out, "command", &body.command_name)?;
    render::field(out, "action", body.action)?;
    render::field(out, "keyword", found.keyword)?;
    for param in &parameters {
        render::field(out, "param", param)?;
    }
    render::field(out, "remainder", &found.remainder)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Rules
// ─────────────────────────────────────────────────────────────────────────────

pub fn handle_rules<W: Write>(app: &App, command: RulesCommand, out: &mut W) -> Result<()> {
    let (_, mut engine) = app.catalog()?;
    let actor = App::actor();

    match command {
        RulesCommand::List { rule_type, all } => {
            let filter = RuleFilter {
                rule_type,
                include_archived: all,
                ..RuleFilter::default()
            };
            list_rules(app, &filter, out)
        }
        RulesCommand::Show { name, rule_type } => {
            let id = rule_id(&engine, &name, rule_type)?;
            let rule = engine.get(&id).with_context(|| format!("Rule {id} vanished"))?;
            render::json(out, rule)
        }
        RulesCommand::Archive { name, rule_type } => {
            let id = rule_id(&engine, &name, rule_type)?;
            let changed = engine.archive(&id, &actor)?;
            persist_rule(app, &engine, &id)?;
            report_change(out, &name, changed, "archived", "already archived")
        }
        RulesCommand::Restore { name, rule_type } => {
            let id = rule_id(&engine, &name, rule_type)?;
            let changed = engine.restore(&id, &actor)?;
            persist_rule(app, &engine, &id)?;
            report_change(out, &name, changed, "restored", "already active")
        }
        RulesCommand::Rollback {
            name,
            version,
            rule_type,
        } => {
            let id = rule_id(&engine, &name, rule_type)?;
            let fields = engine.rollback(&id, version, &actor)?;
            persist_rule(app, &engine, &id)?;
            let current = engine.get(&id).map_or(0, Rule::version);
            writeln!(out, "{name}: rolled back to v{version} as v{current} ({})", fields.join(", "))?;
            Ok(())
        }
    }
}

/// Rule named `name`, preferring effective rules when archived ones share
/// the name.
fn rule_id(engine: &RuleEngine, name: &str, rule_type: Option<RuleType>) -> Result<RuleId> {
    let candidates: Vec<&Rule> = engine
        .rules()
        .iter()
        .filter(|r| r.body().rule_name == name && rule_type.is_none_or(|t| r.body().rule_type == t))
        .collect();
    let effective: Vec<&Rule> = candidates.iter().copied().filter(|r| r.is_effective()).collect();

    match (effective.as_slice(), candidates.as_slice()) {
        ([only], _) | ([], [only]) => Ok(only.id.clone()),
        (_, []) => bail!("No rule named '{name}'"),
        _ => bail!("Several rules are named '{name}'; pass --type"),
    }
}

fn persist_rule(app: &App, engine: &RuleEngine, id: &RuleId) -> Result<()> {
    let rule = engine.get(id).with_context(|| format!("Rule {id} vanished"))?;
    app.store.save_rule(rule)?;
    Ok(())
}

fn list_rules<W: Write>(app: &App, filter: &RuleFilter, out: &mut W) -> Result<()> {
    let rules = app.store.list_rules(filter)?;
    if app.json {
        return render::json(out, &rules);
    }
    for rule in &rules {
        let body = rule.body();
        let state = if rule.record.archived {
            " [archived]"
        } else if body.is_active {
            ""
        } else {
            " [inactive]"
        };
        writeln!(
            out,
            "{:<14} {:>4} {:<28} v{:<3} {}{state}",
            body.rule_type.as_str(),
            body.priority,
            body.rule_name,
            rule.version(),
            body.action.name(),
        )?;
    }
    Ok(())
}

fn report_change<W: Write>(out: &mut W, name: &str, changed: bool, done: &str, unchanged: &str) -> Result<()> {
    let what = if changed { done } else { unchanged };
    writeln!(out, "{name}: {what}")?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use ucp_store::Store;

    fn app(json: bool) -> App {
        App::with_store(Store::in_memory().unwrap(), json)
    }

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    // ── Dictionary ──

    #[test]
    fn list_seeds_defaults() {
        let app = app(false);
        let mut buf = Vec::new();
        handle_dictionary(
            &app,
            DictionaryCommand::List {
                action: None,
                category: None,
                all: false,
            },
            &mut buf,
        )
        .unwrap();
        assert!(text(buf).lines().any(|l| l.starts_with("summarize ")));
    }

    #[test]
    fn archive_persists_and_hides_entry() {
        let app = app(true);
        handle_dictionary(&app, DictionaryCommand::Archive { name: "summarize".into() }, &mut Vec::new()).unwrap();

        let reloaded = app.store.load_dictionary().unwrap();
        assert!(reloaded.get_by_name("summarize").unwrap().is_archived());

        let mut buf = Vec::new();
        handle_dictionary(&app, DictionaryCommand::Lookup { text: "summarize this".into() }, &mut buf).unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_ne!(value["command"], "summarize");

        let mut buf = Vec::new();
        handle_dictionary(&app, DictionaryCommand::Restore { name: "summarize".into() }, &mut buf).unwrap();
        assert_eq!(text(buf), "summarize: restored\n");
        assert!(!app.store.load_dictionary().unwrap().get_by_name("summarize").unwrap().is_archived());
    }

    #[test]
    fn lookup_reports_match() {
        let app = app(true);
        let mut buf = Vec::new();
        handle_dictionary(
            &app,
            DictionaryCommand::Lookup {
                text: "Translate to Spanish: good morning".into(),
            },
            &mut buf,
        )
        .unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["command"], "translate");
        assert_eq!(value["action"], "TRANSLATE");
    }

    #[test]
    fn unknown_entry_is_an_error() {
        let app = app(false);
        let err = handle_dictionary(&app, DictionaryCommand::Archive { name: "nope".into() }, &mut Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn rollback_to_unknown_version_fails() {
        let app = app(false);
        let result = handle_dictionary(
            &app,
            DictionaryCommand::Rollback {
                name: "summarize".into(),
                version: 9,
            },
            &mut Vec::new(),
        );
        assert!(result.is_err());
    }

    // ── Rules ──

    #[test]
    fn archive_rule_round_trip() {
        let app = app(false);
        let (_, engine) = app.catalog().unwrap();
        let rule = engine.rules().first().unwrap().clone();
        let name = rule.body().rule_name.clone();
        let rule_type = Some(rule.body().rule_type);

        let mut buf = Vec::new();
        handle_rules(&app, RulesCommand::Archive { name: name.clone(), rule_type }, &mut buf).unwrap();
        assert_eq!(text(buf), format!("{name}: archived\n"));
        assert!(app.store.get_rule(&rule.id).unwrap().unwrap().record.archived);

        let mut buf = Vec::new();
        handle_rules(&app, RulesCommand::Archive { name: name.clone(), rule_type }, &mut buf).unwrap();
        assert_eq!(text(buf), format!("{name}: already archived\n"));

        handle_rules(&app, RulesCommand::Restore { name, rule_type }, &mut Vec::new()).unwrap();
        assert!(!app.store.get_rule(&rule.id).unwrap().unwrap().record.archived);
    }

    #[test]
    fn list_rules_by_type() {
        let app = app(true);
        let mut buf = Vec::new();
        handle_rules(
            &app,
            RulesCommand::List {
                rule_type: Some(RuleType::Safety),
                all: false,
            },
            &mut buf,
        )
        .unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        let rules = value.as_array().unwrap();
        assert!(!rules.is_empty());
        assert!(rules.iter().all(|r| r["body"]["rule_type"] == "safety"));
    }
}
