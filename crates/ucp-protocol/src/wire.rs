//! Bracket-tag wire syntax.
//!
//! ```text
//! packet  := action param* "[DATA:START]" payload "[DATA:END]"
//! action  := "[UCP:" TAG "]"
//! param   := "[" KEY ":" VALUE "]"
//! payload := any text; the final "[DATA:END]" terminates it
//! ```
//!
//! The payload may contain brackets, including the delimiter strings, since
//! the parser stops only at the trailing `[DATA:END]`.

use crate::action::ActionKind;
use crate::errors::{ProtocolError, Result};
use crate::packet::Packet;
use crate::param::ParamToken;

const ACTION_OPEN: &str = "[UCP:";
const DATA_START: &str = "[DATA:START]";
const DATA_END: &str = "[DATA:END]";

/// The parts of a packet carried on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireFrame {
    /// Action kind.
    pub action: ActionKind,
    /// Parameters in wire order.
    pub parameters: Vec<ParamToken>,
    /// Payload.
    pub data: String,
}

/// Encode a packet.
pub fn encode(packet: &Packet) -> String {
    encode_parts(packet.action.kind, &packet.action.parameters, &packet.data)
}

/// Encode an action, parameters and payload.
pub fn encode_parts(action: ActionKind, parameters: &[ParamToken], data: &str) -> String {
    let mut out = String::with_capacity(data.len() + 32 + parameters.len() * 12);
    out.push_str(ACTION_OPEN);
    out.push_str(action.wire_tag());
    out.push(']');
    for p in parameters {
        out.push('[');
        out.push_str(&p.to_string());
        out.push(']');
    }
    out.push_str(DATA_START);
    out.push_str(data);
    out.push_str(DATA_END);
    out
}

/// Parse wire syntax. Surrounding whitespace is ignored.
pub fn decode(input: &str) -> Result<WireFrame> {
    let leading = input.len() - input.trim_start().len();
    let text = input.trim();
    if text.is_empty() {
        return Err(ProtocolError::Empty);
    }
    let mut cur = Cursor {
        text,
        pos: 0,
        base: leading,
    };

    let action = cur.action()?;
    let mut parameters = Vec::new();
    loop {
        if cur.eat(DATA_START) {
            break;
        }
        if cur.at_end() {
            return Err(ProtocolError::MissingDataStart);
        }
        parameters.push(cur.param()?);
    }

    let data = cur
        .rest()
        .strip_suffix(DATA_END)
        .ok_or(ProtocolError::MissingDataEnd)?;

    Ok(WireFrame {
        action,
        parameters,
        data: data.to_owned(),
    })
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn eat(&mut self, lit: &str) -> bool {
        if self.rest().starts_with(lit) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }

    /// Body of a `[...]` tag, without brackets.
    fn tag_body(&mut self) -> Result<&'a str> {
        let open = self.pos;
        if !self.eat("[") {
            return Err(ProtocolError::UnexpectedContent {
                offset: self.base + open,
            });
        }
        let rest = self.rest();
        let close = rest
            .find([']', '['])
            .filter(|&i| rest.as_bytes()[i] == b']')
            .ok_or(ProtocolError::UnterminatedTag {
                offset: self.base + open,
            })?;
        let body = &rest[..close];
        self.pos += close + 1;
        Ok(body)
    }

    fn action(&mut self) -> Result<ActionKind> {
        if !self.rest().starts_with(ACTION_OPEN) {
            return Err(ProtocolError::MissingActionTag);
        }
        let body = self.tag_body()?;
        let tag = &body["UCP:".len()..];
        ActionKind::from_wire_tag(tag).ok_or_else(|| ProtocolError::UnknownAction(tag.to_owned()))
    }

    fn param(&mut self) -> Result<ParamToken> {
        let body = self.tag_body()?;
        body.parse()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
