//! Action kinds and their parameter schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;
use crate::param::ParamKey;

/// Every action a packet can carry.
///
/// `Request` is the generic fallback for input that matches no dictionary
/// entry; it accepts no parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    /// Condense text.
    Summarize,
    /// Translate text.
    Translate,
    /// Generate source code.
    GenCode,
    /// Explain a concept.
    Explain,
    /// Analyze text.
    Analyze,
    /// Rewrite text.
    Rewrite,
    /// Produce a list.
    List,
    /// Send money.
    Payment,
    /// Send a message.
    Message,
    /// Schedule an event.
    Schedule,
    /// Generic request.
    Request,
}

impl ActionKind {
    /// Every action, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Summarize,
        Self::Translate,
        Self::GenCode,
        Self::Explain,
        Self::Analyze,
        Self::Rewrite,
        Self::List,
        Self::Payment,
        Self::Message,
        Self::Schedule,
        Self::Request,
    ];

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "SUMMARIZE",
            Self::Translate => "TRANSLATE",
            Self::GenCode => "GENCODE",
            Self::Explain => "EXPLAIN",
            Self::Analyze => "ANALYZE",
            Self::Rewrite => "REWRITE",
            Self::List => "LIST",
            Self::Payment => "PAYMENT",
            Self::Message => "MESSAGE",
            Self::Schedule => "SCHEDULE",
            Self::Request => "REQUEST",
        }
    }

    /// Tag written after `UCP:` in the wire syntax.
    pub fn wire_tag(self) -> &'static str {
        match self {
            Self::Request => "REQ",
            other => other.as_str(),
        }
    }

    /// Parse a wire tag; accepts both `REQ` and `REQUEST`.
    pub fn from_wire_tag(tag: &str) -> Option<Self> {
        if tag == "REQ" {
            return Some(Self::Request);
        }
        Self::ALL.into_iter().find(|a| a.as_str() == tag)
    }

    /// Parameter keys this action accepts.
    pub fn param_schema(self) -> &'static [ParamKey] {
        use ParamKey::{App, Channel, Format, Lang, Mod, Mode, Priority, Time, Tone, Type};
        match self {
            Self::Summarize => &[Format, Mod],
            Self::Translate => &[Lang],
            Self::GenCode => &[Lang, Mod],
            Self::Explain => &[Mod],
            Self::Analyze => &[Type],
            Self::Rewrite => &[Tone, Mod],
            Self::List => &[Format],
            Self::Payment => &[App],
            Self::Message => &[Channel, Priority],
            Self::Schedule => &[Time, Mode],
            Self::Request => &[],
        }
    }

    /// Whether `key` belongs to this action's schema.
    pub fn accepts(self, key: ParamKey) -> bool {
        self.param_schema().contains(&key)
    }
}

impl FromStr for ActionKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire_tag(&s.to_ascii_uppercase())
            .ok_or_else(|| ProtocolError::UnknownAction(s.to_owned()))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
