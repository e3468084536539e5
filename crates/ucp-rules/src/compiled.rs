//! Load-time compiled form of rules.

use regex::{Regex, RegexBuilder};
use ucp_core::RuleId;
use ucp_core::text::contains_ignore_case;
use ucp_protocol::{ActionKind, ParamToken};

use crate::errors::{Result, RuleError};
use crate::types::{Condition, Rule, RuleAction, RuleType};

/// What a condition is evaluated against.
pub(crate) struct View<'a> {
    pub text: &'a str,
    pub action: Option<ActionKind>,
    pub parameters: &'a [ParamToken],
}

#[derive(Clone, Debug)]
pub(crate) enum CompiledCondition {
    Always,
    Contains(String),
    Matches(Regex),
    ActionIs(ActionKind),
    HasParam(ParamToken),
    DataLongerThan(usize),
    All(Vec<CompiledCondition>),
    Any(Vec<CompiledCondition>),
    Not(Box<CompiledCondition>),
}

impl CompiledCondition {
    fn compile(condition: &Condition, rule_name: &str) -> Result<Self> {
        Ok(match condition {
            Condition::Always => Self::Always,
            Condition::Contains { needle } => Self::Contains(needle.clone()),
            Condition::Matches { pattern } => Self::Matches(build_regex(pattern, rule_name)?),
            Condition::ActionIs { action } => Self::ActionIs(*action),
            Condition::HasParam { token } => Self::HasParam(token.clone()),
            Condition::DataLongerThan { chars } => Self::DataLongerThan(*chars),
            Condition::All { conditions } => Self::All(compile_all(conditions, rule_name)?),
            Condition::Any { conditions } => Self::Any(compile_all(conditions, rule_name)?),
            Condition::Not { condition } => Self::Not(Box::new(Self::compile(condition, rule_name)?)),
        })
    }

    pub fn holds(&self, view: &View<'_>) -> bool {
        match self {
            Self::Always => true,
            Self::Contains(needle) => contains_ignore_case(view.text, needle),
            Self::Matches(re) => re.is_match(view.text),
            Self::ActionIs(action) => view.action == Some(*action),
            Self::HasParam(token) => view.parameters.contains(token),
            Self::DataLongerThan(chars) => view.text.chars().count() > *chars,
            Self::All(children) => children.iter().all(|c| c.holds(view)),
            Self::Any(children) => children.iter().any(|c| c.holds(view)),
            Self::Not(child) => !child.holds(view),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum CompiledAction {
    Replace { regex: Regex, replacement: String },
    CollapseWhitespace,
    StripPhrases(Option<Regex>),
    Route(ActionKind),
    AddParam(ParamToken),
    RemoveParam(ParamToken),
    PrefixData(String),
    Reject(String),
    Flag(String),
}

impl CompiledAction {
    fn compile(action: &RuleAction, rule_name: &str) -> Result<Self> {
        Ok(match action {
            RuleAction::Replace { pattern, replacement } => Self::Replace {
                regex: build_regex(pattern, rule_name)?,
                replacement: replacement.clone(),
            },
            RuleAction::CollapseWhitespace => Self::CollapseWhitespace,
            RuleAction::StripPhrases { phrases } => {
                let alternation = phrases
                    .iter()
                    .filter(|p| !p.is_empty())
                    .map(|p| regex::escape(p))
                    .collect::<Vec<_>>()
                    .join("|");
                if alternation.is_empty() {
                    Self::StripPhrases(None)
                } else {
                    Self::StripPhrases(Some(build_regex(&alternation, rule_name)?))
                }
            }
            RuleAction::Route { action } => Self::Route(*action),
            RuleAction::AddParam { token } => Self::AddParam(token.clone()),
            RuleAction::RemoveParam { token } => Self::RemoveParam(token.clone()),
            RuleAction::PrefixData { text } => Self::PrefixData(text.clone()),
            RuleAction::Reject { reason } => Self::Reject(reason.clone()),
            RuleAction::Flag { reason } => Self::Flag(reason.clone()),
        })
    }
}

/// An effective rule ready for evaluation.
#[derive(Clone, Debug)]
pub(crate) struct CompiledRule {
    pub id: RuleId,
    pub name: String,
    pub rule_type: RuleType,
    pub priority: i32,
    pub condition: CompiledCondition,
    pub action: CompiledAction,
}

impl CompiledRule {
    pub fn compile(rule: &Rule) -> Result<Self> {
        let body = rule.body();
        validate_shape(body.rule_name.as_str(), body.rule_type, &body.action)?;
        Ok(Self {
            id: rule.id.clone(),
            name: body.rule_name.clone(),
            rule_type: body.rule_type,
            priority: body.priority,
            condition: CompiledCondition::compile(&body.condition, &body.rule_name)?,
            action: CompiledAction::compile(&body.action, &body.rule_name)?,
        })
    }
}

/// Check everything about a rule body that does not need the other rules.
pub(crate) fn validate_body(body: &crate::types::RuleBody) -> Result<()> {
    validate_shape(&body.rule_name, body.rule_type, &body.action)?;
    let _ = CompiledCondition::compile(&body.condition, &body.rule_name)?;
    let _ = CompiledAction::compile(&body.action, &body.rule_name)?;
    Ok(())
}

fn validate_shape(rule_name: &str, rule_type: RuleType, action: &RuleAction) -> Result<()> {
    if rule_name.trim().is_empty() {
        return Err(RuleError::EmptyName);
    }
    if !action.allowed_for(rule_type) {
        return Err(RuleError::IncompatibleAction {
            rule_name: rule_name.to_owned(),
            rule_type,
            action: action.name(),
        });
    }
    Ok(())
}

fn compile_all(conditions: &[Condition], rule_name: &str) -> Result<Vec<CompiledCondition>> {
    conditions
        .iter()
        .map(|c| CompiledCondition::compile(c, rule_name))
        .collect()
}

fn build_regex(pattern: &str, rule_name: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| RuleError::InvalidPattern {
            rule_name: rule_name.to_owned(),
            source,
        })
}
