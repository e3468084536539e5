//! Built-in protocol dictionary (v1.0).

use ucp_protocol::ActionKind;

use crate::entry::EntryBody;
use crate::errors::Result;

type SeedRow = (
    &'static str,
    ActionKind,
    &'static str,
    &'static [&'static str],
    &'static [(&'static str, &'static str)],
);

const SEED: &[SeedRow] = &[
    (
        "summarize",
        ActionKind::Summarize,
        "text",
        &["summarize", "summary", "tl;dr", "key points", "condense", "brief overview"],
        &[
            ("bullet", "FORMAT:BULLET"),
            ("paragraph", "FORMAT:PARA"),
            ("numbered", "FORMAT:NUM"),
            ("hierarchical", "FORMAT:HIER"),
            ("concise", "MOD:CONCISE"),
            ("detailed", "MOD:DETAIL"),
            ("brief", "MOD:BRIEF"),
        ],
    ),
    (
        "translate",
        ActionKind::Translate,
        "language",
        &["translate", "convert to", "translation", "in spanish", "in french", "in german"],
        &[
            ("spanish", "LANG:ES"),
            ("french", "LANG:FR"),
            ("german", "LANG:DE"),
            ("chinese", "LANG:ZH"),
            ("japanese", "LANG:JA"),
            ("portuguese", "LANG:PT"),
            ("italian", "LANG:IT"),
            ("russian", "LANG:RU"),
        ],
    ),
    (
        "gencode",
        ActionKind::GenCode,
        "code",
        &["create code", "write code", "generate code", "write a script", "code for", "program"],
        &[
            ("python", "LANG:PY"),
            ("javascript", "LANG:JS"),
            ("typescript", "LANG:TS"),
            ("java", "LANG:JAVA"),
            ("c#", "LANG:CS"),
            ("php", "LANG:PHP"),
            ("with comments", "MOD:COMMENT"),
            ("optimized", "MOD:OPTIMIZED"),
            ("documented", "MOD:DOC"),
        ],
    ),
    (
        "explain",
        ActionKind::Explain,
        "knowledge",
        &["explain", "clarify", "break down", "describe", "what is", "how does", "tell me about"],
        &[
            ("simple", "MOD:SIMPLE"),
            ("technical", "MOD:TECH"),
            ("beginner", "MOD:BEGINNER"),
            ("advanced", "MOD:ADV"),
            ("eli5", "MOD:ELI5"),
            ("detailed", "MOD:DETAIL"),
        ],
    ),
    (
        "analyze",
        ActionKind::Analyze,
        "analysis",
        &["analyze", "analysis", "examine", "evaluate", "assess", "review"],
        &[
            ("sentiment", "TYPE:SENTIMENT"),
            ("structure", "TYPE:STRUCTURE"),
            ("quality", "TYPE:QUALITY"),
            ("style", "TYPE:STYLE"),
            ("performance", "TYPE:PERF"),
        ],
    ),
    (
        "rewrite",
        ActionKind::Rewrite,
        "text",
        &["rewrite", "rephrase", "revise", "improve", "refactor", "make it"],
        &[
            ("formal", "TONE:FORMAL"),
            ("casual", "TONE:CASUAL"),
            ("professional", "TONE:PRO"),
            ("creative", "TONE:CREATIVE"),
            ("concise", "MOD:CONCISE"),
        ],
    ),
    (
        "list",
        ActionKind::List,
        "structure",
        &["list", "enumerate", "outline", "structure", "organize", "give me"],
        &[
            ("bullet", "FORMAT:BULLET"),
            ("numbered", "FORMAT:NUM"),
            ("hierarchical", "FORMAT:HIER"),
            ("table", "FORMAT:TABLE"),
        ],
    ),
    (
        "payment",
        ActionKind::Payment,
        "action",
        &["send money", "pay", "transfer", "venmo", "cash app", "zelle"],
        &[
            ("cash app", "APP:CASHAPP"),
            ("venmo", "APP:VENMO"),
            ("paypal", "APP:PAYPAL"),
            ("zelle", "APP:ZELLE"),
        ],
    ),
    (
        "message",
        ActionKind::Message,
        "action",
        &["send message", "text", "email", "notify", "alert", "remind"],
        &[
            ("sms", "CHANNEL:SMS"),
            ("email", "CHANNEL:EMAIL"),
            ("slack", "CHANNEL:SLACK"),
            ("urgent", "PRIORITY:HIGH"),
        ],
    ),
    (
        "schedule",
        ActionKind::Schedule,
        "action",
        &["schedule", "calendar", "meeting", "appointment", "remind me", "set reminder"],
        &[
            ("today", "TIME:TODAY"),
            ("tomorrow", "TIME:TOMORROW"),
            ("recurring", "MODE:RECURRING"),
        ],
    ),
];

/// Bodies of the built-in entries, in lookup order.
pub fn default_entries() -> Result<Vec<EntryBody>> {
    SEED.iter()
        .map(|(name, action, category, keywords, params)| {
            EntryBody::new(name, *action, category, keywords, params)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_valid() {
        let entries = default_entries().unwrap();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].command_name, "summarize");
        assert_eq!(entries[1].action, ActionKind::Translate);
    }

    #[test]
    fn seed_names_are_unique() {
        let entries = default_entries().unwrap();
        let mut names: Vec<_> = entries.iter().map(|e| e.command_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), entries.len());
    }

    #[test]
    fn every_action_except_request_is_seeded() {
        let entries = default_entries().unwrap();
        for action in ActionKind::ALL {
            let seeded = entries.iter().any(|e| e.action == action);
            assert_eq!(seeded, action != ActionKind::Request, "{action}");
        }
    }
}
