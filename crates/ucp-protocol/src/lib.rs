//! # ucp-protocol
//!
//! The vocabulary of the Universal Command Protocol.
//!
//! - [`ActionKind`]: closed set of actions, each with the parameter keys it accepts
//! - [`ParamToken`]: canonical `KEY:VALUE` modifier such as `LANG:ES`
//! - [`Packet`]: one compiled command, immutable once built
//! - [`CacheKey`]: SHA-256 fingerprint of case-folded, trimmed input
//! - [`wire`]: `[UCP:<ACTION>][<PARAM>]...[DATA:START]<payload>[DATA:END]`

#![deny(unsafe_code)]

pub mod action;
pub mod errors;
pub mod fingerprint;
pub mod packet;
pub mod param;
pub mod wire;

pub use action::ActionKind;
pub use errors::{ProtocolError, Result};
pub use fingerprint::{CacheKey, fingerprint, normalize_for_key};
pub use packet::{Packet, PacketAction};
pub use param::{ParamKey, ParamToken};
pub use wire::{WireFrame, decode, encode};
