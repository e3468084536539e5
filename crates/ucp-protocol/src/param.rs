//! Canonical parameter tokens (`KEY:VALUE`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Parameter namespace. The set is closed; each [`crate::ActionKind`]
/// declares which keys it accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    /// Output layout (`BULLET`, `NUM`, `TABLE`, ...).
    Format,
    /// Free modifier (`CONCISE`, `DETAIL`, `ELI5`, ...).
    Mod,
    /// Natural or programming language.
    Lang,
    /// Analysis type.
    Type,
    /// Writing tone.
    Tone,
    /// Payment app.
    App,
    /// Messaging channel.
    Channel,
    /// Urgency.
    Priority,
    /// Scheduling time.
    Time,
    /// Scheduling mode.
    Mode,
}

impl ParamKey {
    /// Every key, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Format,
        Self::Mod,
        Self::Lang,
        Self::Type,
        Self::Tone,
        Self::App,
        Self::Channel,
        Self::Priority,
        Self::Time,
        Self::Mode,
    ];

    /// Upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Format => "FORMAT",
            Self::Mod => "MOD",
            Self::Lang => "LANG",
            Self::Type => "TYPE",
            Self::Tone => "TONE",
            Self::App => "APP",
            Self::Channel => "CHANNEL",
            Self::Priority => "PRIORITY",
            Self::Time => "TIME",
            Self::Mode => "MODE",
        }
    }

    /// Human label used when describing constraints to a provider.
    pub fn label(self) -> &'static str {
        match self {
            Self::Format => "Output format",
            Self::Mod => "Modifier",
            Self::Lang => "Language",
            Self::Type => "Analysis type",
            Self::Tone => "Tone",
            Self::App => "Payment app",
            Self::Channel => "Channel",
            Self::Priority => "Priority",
            Self::Time => "Time",
            Self::Mode => "Mode",
        }
    }
}

impl FromStr for ParamKey {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidParam(s.to_owned()))
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical modifier such as `LANG:ES`.
///
/// Values are upper-case ASCII letters, digits and underscores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParamToken {
    key: ParamKey,
    value: String,
}

impl ParamToken {
    /// Build a token, validating the value.
    pub fn new(key: ParamKey, value: &str) -> Result<Self, ProtocolError> {
        let valid = !value.is_empty()
            && value
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
        if !valid {
            return Err(ProtocolError::InvalidParam(format!("{key}:{value}")));
        }
        Ok(Self {
            key,
            value: value.to_owned(),
        })
    }

    /// Namespace of the token.
    pub fn key(&self) -> ParamKey {
        self.key
    }

    /// Value part of the token.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for ParamToken {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once(':')
            .ok_or_else(|| ProtocolError::InvalidParam(s.to_owned()))?;
        let key: ParamKey = key
            .parse()
            .map_err(|_| ProtocolError::InvalidParam(s.to_owned()))?;
        Self::new(key, value)
    }
}

impl TryFrom<String> for ParamToken {
    type Error = ProtocolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ParamToken> for String {
    fn from(t: ParamToken) -> Self {
        t.to_string()
    }
}

impl fmt::Display for ParamToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}
