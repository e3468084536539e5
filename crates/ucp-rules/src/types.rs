//! Rule definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use ucp_core::RuleId;
use ucp_core::audit::{Revisable, Versioned};
use ucp_protocol::{ActionKind, ParamToken};

/// Rule category; decides the stage a rule runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Rewrites the raw prompt before dictionary lookup.
    Normalization,
    /// Overrides the matched action.
    Routing,
    /// Adjusts parameters or payload.
    Transformation,
    /// Structural checks on the assembled draft.
    Validation,
    /// Content checks on the assembled draft.
    Safety,
}

impl RuleType {
    /// Every type, in execution order.
    pub const ALL: [Self; 5] = [
        Self::Normalization,
        Self::Routing,
        Self::Transformation,
        Self::Validation,
        Self::Safety,
    ];

    /// Lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normalization => "normalization",
            Self::Routing => "routing",
            Self::Transformation => "transformation",
            Self::Validation => "validation",
            Self::Safety => "safety",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown rule type: {s}"))
    }
}

/// Predicate a rule tests before acting.
///
/// Text conditions test the prompt at the input stage and the payload
/// afterwards. `contains` and `matches` are case-insensitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Always holds.
    Always,
    /// Text contains a substring.
    Contains {
        /// Substring to look for.
        needle: String,
    },
    /// Text matches a regular expression.
    Matches {
        /// Regex source.
        pattern: String,
    },
    /// Draft action equals `action`.
    ActionIs {
        /// Expected action.
        action: ActionKind,
    },
    /// Draft carries `token`.
    HasParam {
        /// Expected token.
        token: ParamToken,
    },
    /// Text is longer than `chars` characters.
    DataLongerThan {
        /// Length threshold.
        chars: usize,
    },
    /// Every child holds.
    All {
        /// Children.
        conditions: Vec<Condition>,
    },
    /// At least one child holds.
    Any {
        /// Children.
        conditions: Vec<Condition>,
    },
    /// Child does not hold.
    Not {
        /// Negated child.
        condition: Box<Condition>,
    },
}

/// Effect of a rule whose condition holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Regex replace over the whole text (normalization).
    Replace {
        /// Regex source.
        pattern: String,
        /// Replacement, `$1`-style groups allowed.
        replacement: String,
    },
    /// Collapse whitespace runs and trim (normalization).
    CollapseWhitespace,
    /// Remove phrases wherever they occur (normalization).
    StripPhrases {
        /// Phrases to remove, case-insensitive.
        phrases: Vec<String>,
    },
    /// Replace the matched action (routing).
    Route {
        /// New action.
        action: ActionKind,
    },
    /// Append a parameter if absent (transformation).
    AddParam {
        /// Token to add.
        token: ParamToken,
    },
    /// Drop a parameter (transformation).
    RemoveParam {
        /// Token to drop.
        token: ParamToken,
    },
    /// Prepend text to the payload (transformation).
    PrefixData {
        /// Text to prepend.
        text: String,
    },
    /// Refuse the request (validation, safety).
    Reject {
        /// Reason reported to the caller.
        reason: String,
    },
    /// Record a warning and continue (validation, safety).
    Flag {
        /// Warning text.
        reason: String,
    },
}

impl RuleAction {
    /// Snake-case action name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Replace { .. } => "replace",
            Self::CollapseWhitespace => "collapse_whitespace",
            Self::StripPhrases { .. } => "strip_phrases",
            Self::Route { .. } => "route",
            Self::AddParam { .. } => "add_param",
            Self::RemoveParam { .. } => "remove_param",
            Self::PrefixData { .. } => "prefix_data",
            Self::Reject { .. } => "reject",
            Self::Flag { .. } => "flag",
        }
    }

    /// Whether a rule of `rule_type` may carry this action.
    pub fn allowed_for(&self, rule_type: RuleType) -> bool {
        match rule_type {
            RuleType::Normalization => matches!(
                self,
                Self::Replace { .. } | Self::CollapseWhitespace | Self::StripPhrases { .. }
            ),
            RuleType::Routing => matches!(self, Self::Route { .. }),
            RuleType::Transformation => matches!(
                self,
                Self::AddParam { .. } | Self::RemoveParam { .. } | Self::PrefixData { .. }
            ),
            RuleType::Validation | RuleType::Safety => {
                matches!(self, Self::Reject { .. } | Self::Flag { .. })
            }
        }
    }
}

/// The editable part of a rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleBody {
    /// Name, unique among active rules of the same type.
    pub rule_name: String,
    /// Category.
    pub rule_type: RuleType,
    /// Lower runs earlier.
    pub priority: i32,
    /// Predicate.
    pub condition: Condition,
    /// Effect.
    pub action: RuleAction,
    /// Inactive rules are kept but skipped.
    pub is_active: bool,
    /// Operator notes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl RuleBody {
    /// An active rule with no description.
    pub fn new(rule_name: &str, rule_type: RuleType, priority: i32, condition: Condition, action: RuleAction) -> Self {
        Self {
            rule_name: rule_name.to_owned(),
            rule_type,
            priority,
            condition,
            action,
            is_active: true,
            description: String::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }
}

impl Revisable for RuleBody {
    fn changed_fields(&self, next: &Self) -> Vec<String> {
        let mut changed = Vec::new();
        if self.rule_name != next.rule_name {
            changed.push("rule_name".to_owned());
        }
        if self.rule_type != next.rule_type {
            changed.push("rule_type".to_owned());
        }
        if self.priority != next.priority {
            changed.push("priority".to_owned());
        }
        if self.condition != next.condition {
            changed.push("condition".to_owned());
        }
        if self.action != next.action {
            changed.push("action".to_owned());
        }
        if self.is_active != next.is_active {
            changed.push("is_active".to_owned());
        }
        if self.description != next.description {
            changed.push("description".to_owned());
        }
        changed
    }
}

/// A stored rule with its history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier.
    pub id: RuleId,
    /// Body, version counter, archive flag and audit trail.
    #[serde(flatten)]
    pub record: Versioned<RuleBody>,
}

impl Rule {
    /// Current body.
    pub fn body(&self) -> &RuleBody {
        &self.record.body
    }

    /// Current version.
    pub fn version(&self) -> u32 {
        self.record.version
    }

    /// Whether the rule takes part in evaluation.
    pub fn is_effective(&self) -> bool {
        self.record.body.is_active && !self.record.archived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_json_is_tagged() {
        let c = Condition::All {
            conditions: vec![
                Condition::Contains { needle: "x".into() },
                Condition::ActionIs {
                    action: ActionKind::Summarize,
                },
            ],
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "all");
        assert_eq!(json["conditions"][1]["type"], "action_is");
        assert_eq!(json["conditions"][1]["action"], "SUMMARIZE");
        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn action_json_is_tagged() {
        let a: RuleAction =
            serde_json::from_str(r#"{"type": "add_param", "token": "FORMAT:BULLET"}"#).unwrap();
        assert_eq!(a.name(), "add_param");
        assert!(a.allowed_for(RuleType::Transformation));
        assert!(!a.allowed_for(RuleType::Safety));
    }

    #[test]
    fn reject_and_flag_are_gate_actions() {
        let reject = RuleAction::Reject { reason: "no".into() };
        assert!(reject.allowed_for(RuleType::Validation));
        assert!(reject.allowed_for(RuleType::Safety));
        assert!(!reject.allowed_for(RuleType::Normalization));
        assert!(RuleAction::CollapseWhitespace.allowed_for(RuleType::Normalization));
        assert!(!RuleAction::CollapseWhitespace.allowed_for(RuleType::Routing));
    }

    #[test]
    fn rule_type_parse() {
        assert_eq!("safety".parse::<RuleType>().unwrap(), RuleType::Safety);
        assert!("magic".parse::<RuleType>().is_err());
    }

    #[test]
    fn changed_fields() {
        let a = RuleBody::new("r", RuleType::Safety, 1, Condition::Always, RuleAction::Flag { reason: "x".into() });
        let mut b = a.clone();
        b.priority = 5;
        b.is_active = false;
        assert_eq!(a.changed_fields(&b), vec!["priority", "is_active"]);
    }
}
