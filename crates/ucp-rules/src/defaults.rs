//! Built-in rules seeded into a fresh catalog.

use ucp_core::constants::MAX_PROMPT_LENGTH;

use crate::types::{Condition, RuleAction, RuleBody, RuleType};

const SENSITIVE_KEYWORDS: &str = "password|hack|exploit|weapon|illegal|confidential|private|secret";
const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
const PHONE_PATTERN: &str = r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b";
const SSN_PATTERN: &str = r"\b\d{3}-?\d{2}-?\d{4}\b";

/// Whitespace normalization, payload length validation, and safety flags
/// for sensitive keywords and personal data.
pub fn default_rules() -> Vec<RuleBody> {
    vec![
        RuleBody::new(
            "collapse-whitespace",
            RuleType::Normalization,
            10,
            Condition::Always,
            RuleAction::CollapseWhitespace,
        )
        .with_description("Collapse whitespace runs and trim the prompt"),
        RuleBody::new(
            "max-payload",
            RuleType::Validation,
            10,
            Condition::DataLongerThan {
                chars: MAX_PROMPT_LENGTH,
            },
            RuleAction::Reject {
                reason: format!("payload exceeds {MAX_PROMPT_LENGTH} characters"),
            },
        ),
        RuleBody::new(
            "sensitive-keywords",
            RuleType::Safety,
            10,
            Condition::Matches {
                pattern: SENSITIVE_KEYWORDS.to_owned(),
            },
            RuleAction::Flag {
                reason: "sensitive content".to_owned(),
            },
        ),
        pii_flag("pii-email", 20, EMAIL_PATTERN, "email address"),
        pii_flag("pii-phone", 20, PHONE_PATTERN, "phone number"),
        pii_flag("pii-ssn", 20, SSN_PATTERN, "social security number")
            .with_description("High severity"),
    ]
}

fn pii_flag(name: &str, priority: i32, pattern: &str, what: &str) -> RuleBody {
    RuleBody::new(
        name,
        RuleType::Safety,
        priority,
        Condition::Matches {
            pattern: pattern.to_owned(),
        },
        RuleAction::Flag {
            reason: format!("possible {what} in payload"),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleEngine;

    #[test]
    fn defaults_load() {
        let engine = RuleEngine::with_defaults("system").unwrap();
        assert_eq!(engine.rules().len(), default_rules().len());
        assert!(engine.rules().iter().all(|r| r.is_effective()));
    }

    #[test]
    fn whitespace_is_collapsed() {
        let engine = RuleEngine::with_defaults("system").unwrap();
        assert_eq!(engine.normalize("  summarize\n\tthis   text "), "summarize this text");
    }

    #[test]
    fn sensitive_keywords_match_inside_words() {
        let engine = RuleEngine::with_defaults("system").unwrap();
        let draft = crate::engine::Draft::new(ucp_protocol::ActionKind::Explain, Vec::new(), "Passwords and privately held data");
        let eval = engine.gate(draft).unwrap();
        assert_eq!(eval.flags.len(), 1);
        assert_eq!(eval.flags[0].rule_name, "sensitive-keywords");
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let engine = RuleEngine::with_defaults("system").unwrap();
        let draft = crate::engine::Draft::new(
            ucp_protocol::ActionKind::Summarize,
            Vec::new(),
            "x".repeat(MAX_PROMPT_LENGTH + 1),
        );
        let err = engine.gate(draft).unwrap_err();
        assert_eq!(err.rule_name, "max-payload");
    }
}
