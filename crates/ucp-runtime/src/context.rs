//! System context sent alongside a packet.

use ucp_protocol::Packet;
use ucp_rules::RuleFlag;

const PREAMBLE: &str = "You are a helpful AI assistant.";
const SENSITIVE_NOTE: &str = "Note: Handle any sensitive information carefully.";

/// Instructions for the provider derived from the packet: the task type,
/// one constraint line per parameter, and a caution when rules flagged the
/// packet.
pub fn build_system_context(packet: &Packet, flags: &[RuleFlag]) -> String {
    let mut lines = vec![
        PREAMBLE.to_owned(),
        String::new(),
        format!("Task Type: {}", packet.action.kind),
    ];

    if !packet.action.parameters.is_empty() {
        lines.push(String::new());
        lines.push("Constraints:".to_owned());
        for param in &packet.action.parameters {
            lines.push(format!("- {}: {}", param.key().label(), param.value()));
        }
    }

    if !flags.is_empty() {
        lines.push(String::new());
        lines.push(SENSITIVE_NOTE.to_owned());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucp_protocol::{ActionKind, ParamToken, fingerprint};
    use ucp_rules::RuleType;

    fn packet(kind: ActionKind, params: &[&str]) -> Packet {
        let parameters = params.iter().map(|p| p.parse::<ParamToken>().unwrap()).collect();
        Packet::new(kind, parameters, "Hello world".into(), fingerprint("x"))
    }

    #[test]
    fn bare_task() {
        let ctx = build_system_context(&packet(ActionKind::Explain, &[]), &[]);
        assert_eq!(ctx, "You are a helpful AI assistant.\n\nTask Type: EXPLAIN");
    }

    #[test]
    fn constraints_use_labels() {
        let ctx = build_system_context(&packet(ActionKind::Summarize, &["FORMAT:BULLET", "MOD:CONCISE"]), &[]);
        assert_eq!(
            ctx,
            "You are a helpful AI assistant.\n\nTask Type: SUMMARIZE\n\nConstraints:\n\
             - Output format: BULLET\n- Modifier: CONCISE"
        );
    }

    #[test]
    fn flags_add_caution() {
        let flag = RuleFlag {
            rule_name: "pii-email".into(),
            rule_type: RuleType::Safety,
            reason: "email address in payload".into(),
        };
        let ctx = build_system_context(&packet(ActionKind::Translate, &["LANG:ES"]), &[flag]);
        assert!(ctx.ends_with("- Language: ES\n\nNote: Handle any sensitive information carefully."));
    }
}
