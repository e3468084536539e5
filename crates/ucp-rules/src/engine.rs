//! Rule table and staged evaluation.

use serde::Serialize;
use tracing::{debug, info, warn};
use ucp_core::RuleId;
use ucp_core::text::collapse_whitespace;
use ucp_protocol::{ActionKind, ParamToken};

use crate::compiled::{CompiledAction, CompiledRule, View, validate_body};
use crate::defaults::default_rules;
use crate::errors::{Result, RuleError, RuleRejected};
use crate::types::{Rule, RuleBody, RuleType};

/// Point in the compile pipeline where rules run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Before dictionary lookup.
    Input,
    /// After the dictionary match, before the packet is built.
    Route,
    /// On the assembled packet contents.
    Gate,
}

impl Stage {
    /// Rule types evaluated in this stage, in order.
    pub fn rule_types(self) -> &'static [RuleType] {
        match self {
            Self::Input => &[RuleType::Normalization],
            Self::Route => &[RuleType::Routing, RuleType::Transformation],
            Self::Gate => &[RuleType::Validation, RuleType::Safety],
        }
    }
}

/// Packet contents while they are still editable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draft {
    /// Action.
    pub action: ActionKind,
    /// Parameters in order.
    pub parameters: Vec<ParamToken>,
    /// Payload.
    pub data: String,
}

impl Draft {
    /// Build a draft.
    pub fn new(action: ActionKind, parameters: Vec<ParamToken>, data: impl Into<String>) -> Self {
        Self {
            action,
            parameters,
            data: data.into(),
        }
    }
}

/// Something rules can inspect and rewrite.
///
/// Text conditions and normalization actions see [`Subject::text`]; the
/// draft-only conditions and actions need [`Subject::draft_mut`].
pub trait Subject {
    /// Text tested by `contains`, `matches` and `data_longer_than`.
    fn text(&self) -> &str;
    /// Replace the text.
    fn set_text(&mut self, text: String);
    /// The draft, if this subject has one.
    fn draft(&self) -> Option<&Draft>;
    /// Mutable draft, if this subject has one.
    fn draft_mut(&mut self) -> Option<&mut Draft>;
}

impl Subject for String {
    fn text(&self) -> &str {
        self
    }

    fn set_text(&mut self, text: String) {
        *self = text;
    }

    fn draft(&self) -> Option<&Draft> {
        None
    }

    fn draft_mut(&mut self) -> Option<&mut Draft> {
        None
    }
}

impl Subject for Draft {
    fn text(&self) -> &str {
        &self.data
    }

    fn set_text(&mut self, text: String) {
        self.data = text;
    }

    fn draft(&self) -> Option<&Draft> {
        Some(self)
    }

    fn draft_mut(&mut self) -> Option<&mut Draft> {
        Some(self)
    }
}

/// Non-fatal warning raised by a `flag` action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFlag {
    /// Rule that raised it.
    pub rule_name: String,
    /// Type of that rule.
    pub rule_type: RuleType,
    /// Configured warning text.
    pub reason: String,
}

/// Result of running one stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation<S> {
    /// Subject after every effect.
    pub subject: S,
    /// Warnings raised.
    pub flags: Vec<RuleFlag>,
    /// Names of rules whose condition held, in evaluation order.
    pub fired: Vec<String>,
}

/// Stored rules plus their compiled, ordered form.
#[derive(Clone, Debug, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    compiled: Vec<CompiledRule>,
    revision: u64,
}

impl RuleEngine {
    /// Engine with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine holding [`default_rules`].
    pub fn with_defaults(actor: &str) -> Result<Self> {
        let mut engine = Self::new();
        for body in default_rules() {
            let _ = engine.insert(body, actor)?;
        }
        Ok(engine)
    }

    /// Load stored rules, validating each and the name invariant.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self> {
        let mut engine = Self::new();
        for rule in rules {
            validate_body(rule.body())?;
            if rule.is_effective() {
                engine.ensure_unique_name(rule.body(), None)?;
            }
            engine.rules.push(rule);
        }
        engine.recompile()?;
        Ok(engine)
    }

    /// Change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// All stored rules, archived and inactive included.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rule by ID.
    pub fn get(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| &r.id == id)
    }

    /// Effective rule of `rule_type` named `name`.
    pub fn get_by_name(&self, rule_type: RuleType, name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|r| r.is_effective() && r.body().rule_type == rule_type && r.body().rule_name == name)
    }

    /// Add a rule.
    pub fn insert(&mut self, body: RuleBody, actor: &str) -> Result<&Rule> {
        validate_body(&body)?;
        self.ensure_unique_name(&body, None)?;
        let rule = Rule {
            id: RuleId::new(),
            record: ucp_core::Versioned::new(body, actor),
        };
        info!(rule = %rule.body().rule_name, rule_type = %rule.body().rule_type, id = %rule.id, "rule created");
        self.rules.push(rule);
        self.changed()?;
        let idx = self.rules.len() - 1;
        Ok(&self.rules[idx])
    }

    /// Replace a rule's body as a new version. Returns changed fields.
    pub fn edit(&mut self, id: &RuleId, body: RuleBody, actor: &str) -> Result<Vec<String>> {
        validate_body(&body)?;
        if !self.get(id).ok_or_else(|| RuleError::NotFound(id.clone()))?.record.archived {
            self.ensure_unique_name(&body, Some(id))?;
        }
        let rule = self.rule_mut(id)?;
        let changed = rule.record.revise(body, actor);
        if !changed.is_empty() {
            info!(%id, version = rule.version(), ?changed, "rule revised");
            self.changed()?;
        }
        Ok(changed)
    }

    /// Soft-delete a rule. Returns `false` if it was already archived.
    pub fn archive(&mut self, id: &RuleId, actor: &str) -> Result<bool> {
        let archived = self.rule_mut(id)?.record.archive(actor);
        if archived {
            info!(%id, "rule archived");
            self.changed()?;
        }
        Ok(archived)
    }

    /// Bring an archived rule back, provided its name is free.
    pub fn restore(&mut self, id: &RuleId, actor: &str) -> Result<bool> {
        let body = self.get(id).ok_or_else(|| RuleError::NotFound(id.clone()))?.body().clone();
        self.ensure_unique_name(&body, Some(id))?;
        let restored = self.rule_mut(id)?.record.restore(actor);
        if restored {
            self.changed()?;
        }
        Ok(restored)
    }

    /// Restore the body recorded at `version` as a new version.
    pub fn rollback(&mut self, id: &RuleId, version: u32, actor: &str) -> Result<Vec<String>> {
        let rule = self.get(id).ok_or_else(|| RuleError::NotFound(id.clone()))?;
        let unknown = || RuleError::UnknownVersion {
            id: id.clone(),
            version,
        };
        let snapshot = rule.record.audit_log.snapshot_at(version).cloned().ok_or_else(unknown)?;
        if !rule.record.archived {
            self.ensure_unique_name(&snapshot, Some(id))?;
        }
        let rule = self.rule_mut(id)?;
        let changed = rule.record.rollback(version, actor).ok_or_else(unknown)?;
        info!(%id, to = version, version = rule.version(), "rule rolled back");
        self.changed()?;
        Ok(changed)
    }

    /// Run the rules of `stage` over `subject`.
    ///
    /// Rules run grouped by type in stage order, then by ascending priority
    /// and name. The first `reject` whose condition holds ends evaluation.
    pub fn apply<S: Subject>(&self, stage: Stage, mut subject: S) -> std::result::Result<Evaluation<S>, RuleRejected> {
        let mut flags = Vec::new();
        let mut fired = Vec::new();
        let types = stage.rule_types();
        for rule in self.compiled.iter().filter(|r| types.contains(&r.rule_type)) {
            let holds = {
                let draft = subject.draft();
                let view = View {
                    text: subject.text(),
                    action: draft.map(|d| d.action),
                    parameters: draft.map(|d| d.parameters.as_slice()).unwrap_or_default(),
                };
                rule.condition.holds(&view)
            };
            if !holds {
                continue;
            }
            debug!(rule = %rule.name, id = %rule.id, ?stage, "rule fired");
            fired.push(rule.name.clone());
            apply_action(rule, &mut subject, &mut flags)?;
        }
        Ok(Evaluation { subject, flags, fired })
    }

    /// Input stage over raw prompt text.
    pub fn normalize(&self, text: &str) -> String {
        // Normalization actions never reject.
        match self.apply(Stage::Input, text.to_owned()) {
            Ok(eval) => eval.subject,
            Err(_) => text.to_owned(),
        }
    }

    /// Route stage over a draft.
    pub fn route(&self, draft: Draft) -> std::result::Result<Evaluation<Draft>, RuleRejected> {
        self.apply(Stage::Route, draft)
    }

    /// Gate stage over a draft.
    pub fn gate(&self, draft: Draft) -> std::result::Result<Evaluation<Draft>, RuleRejected> {
        self.apply(Stage::Gate, draft)
    }

    fn rule_mut(&mut self, id: &RuleId) -> Result<&mut Rule> {
        self.rules
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| RuleError::NotFound(id.clone()))
    }

    fn ensure_unique_name(&self, body: &RuleBody, except: Option<&RuleId>) -> Result<()> {
        if !body.is_active {
            return Ok(());
        }
        let taken = self.rules.iter().any(|r| {
            r.is_effective()
                && Some(&r.id) != except
                && r.body().rule_type == body.rule_type
                && r.body().rule_name == body.rule_name
        });
        if taken {
            return Err(RuleError::DuplicateName {
                rule_type: body.rule_type,
                rule_name: body.rule_name.clone(),
            });
        }
        Ok(())
    }

    fn changed(&mut self) -> Result<()> {
        self.revision += 1;
        self.recompile()
    }

    fn recompile(&mut self) -> Result<()> {
        let mut compiled = self
            .rules
            .iter()
            .filter(|r| r.is_effective())
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        compiled.sort_by(|a, b| {
            a.rule_type
                .cmp(&b.rule_type)
                .then(a.priority.cmp(&b.priority))
                .then_with(|| a.name.cmp(&b.name))
        });
        self.compiled = compiled;
        Ok(())
    }
}

fn apply_action<S: Subject>(
    rule: &CompiledRule,
    subject: &mut S,
    flags: &mut Vec<RuleFlag>,
) -> std::result::Result<(), RuleRejected> {
    match &rule.action {
        CompiledAction::Replace { regex, replacement } => {
            let next = regex.replace_all(subject.text(), replacement.as_str()).into_owned();
            subject.set_text(next);
        }
        CompiledAction::CollapseWhitespace => {
            let next = collapse_whitespace(subject.text());
            subject.set_text(next);
        }
        CompiledAction::StripPhrases(Some(regex)) => {
            let next = collapse_whitespace(&regex.replace_all(subject.text(), ""));
            subject.set_text(next);
        }
        CompiledAction::StripPhrases(None) => {}
        CompiledAction::Route(action) => {
            if let Some(draft) = subject.draft_mut() {
                let from = draft.action;
                draft.action = *action;
                let before = draft.parameters.len();
                draft.parameters.retain(|p| action.accepts(p.key()));
                debug!(rule = %rule.name, %from, to = %action, dropped = before - draft.parameters.len(), "action rerouted");
            }
        }
        CompiledAction::AddParam(token) => {
            if let Some(draft) = subject.draft_mut() {
                if !draft.action.accepts(token.key()) {
                    debug!(rule = %rule.name, %token, action = %draft.action, "parameter outside schema, skipped");
                } else if !draft.parameters.contains(token) {
                    draft.parameters.push(token.clone());
                }
            }
        }
        CompiledAction::RemoveParam(token) => {
            if let Some(draft) = subject.draft_mut() {
                draft.parameters.retain(|p| p != token);
            }
        }
        CompiledAction::PrefixData(prefix) => {
            let next = format!("{prefix}{}", subject.text());
            subject.set_text(next);
        }
        CompiledAction::Reject(reason) => {
            warn!(rule = %rule.name, %reason, "request rejected by rule");
            return Err(RuleRejected {
                rule_name: rule.name.clone(),
                reason: reason.clone(),
            });
        }
        CompiledAction::Flag(reason) => {
            warn!(rule = %rule.name, rule_type = %rule.rule_type, %reason, "rule flag raised");
            flags.push(RuleFlag {
                rule_name: rule.name.clone(),
                rule_type: rule.rule_type,
                reason: reason.clone(),
            });
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
