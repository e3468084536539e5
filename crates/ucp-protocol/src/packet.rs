//! Compiled command packets.

use serde::{Deserialize, Serialize};
use ucp_core::CommandId;
use ucp_core::constants::UCP_VERSION;

use crate::action::ActionKind;
use crate::fingerprint::CacheKey;
use crate::param::ParamToken;
use crate::wire;

/// Action plus its ordered parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketAction {
    /// Action kind.
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Parameters in emission order.
    pub parameters: Vec<ParamToken>,
}

/// One compiled command. Never mutated after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Unique per compilation.
    pub command_id: CommandId,
    /// RFC 3339 creation time.
    pub timestamp: String,
    /// Protocol version.
    pub version: String,
    /// What to do.
    pub action: PacketAction,
    /// Payload, original casing preserved.
    pub data: String,
    /// Fingerprint of the input this packet was compiled from.
    pub cache_key: CacheKey,
}

impl Packet {
    /// Stamp a new packet with a fresh command ID and the current time.
    pub fn new(kind: ActionKind, parameters: Vec<ParamToken>, data: String, cache_key: CacheKey) -> Self {
        Self {
            command_id: CommandId::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: UCP_VERSION.to_owned(),
            action: PacketAction { kind, parameters },
            data,
            cache_key,
        }
    }

    /// Wire encoding of this packet.
    pub fn to_wire(&self) -> String {
        wire::encode(self)
    }

    /// Whether two packets describe the same command, ignoring identity
    /// and timestamp.
    pub fn same_command(&self, other: &Self) -> bool {
        self.action == other.action && self.data == other.data && self.cache_key == other.cache_key
    }
}
