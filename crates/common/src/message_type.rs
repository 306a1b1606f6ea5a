//! Versioned, typed message identifiers.
//!
//! A [`MessageTypeId`] packs three things into 64 bits:
//!
//! ```text
//! bit 63      command flag (1 = command, 0 = event)
//! bits 56-62  version (0-127)
//! bits 0-55   type id (content hash of the canonical message name)
//! ```
//!
//! Inputs wider than their slot are truncated silently.

use serde::{Deserialize, Serialize};

const EVENT_BIT_MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;
const COMMAND_BIT_MASK: u64 = 0x8000_0000_0000_0000;
const VERSION_BIT_MASK: u64 = 0x7F00_0000_0000_0000;
const ID_BIT_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Packed identifier of a message type within the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTypeId(i64);

impl MessageTypeId {
    /// Wraps an already packed value.
    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// Returns the packed value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Returns true when the command bit is set.
    pub fn is_command(&self) -> bool {
        is_command(self.0)
    }

    /// Returns the 7-bit version slot.
    pub fn version(&self) -> u8 {
        ((self.0 as u64 & VERSION_BIT_MASK) >> 56) as u8
    }

    /// Returns the 56-bit type id slot.
    pub fn type_id(&self) -> i64 {
        (self.0 as u64 & ID_BIT_MASK) as i64
    }
}

impl std::fmt::Display for MessageTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016X}", self.0 as u64)
    }
}

impl From<MessageTypeId> for i64 {
    fn from(id: MessageTypeId) -> Self {
        id.0
    }
}

fn make_versioned_message_type(type_id: i64, version: u8) -> u64 {
    ((u64::from(version) << 56) & VERSION_BIT_MASK) | (type_id as u64 & ID_BIT_MASK)
}

/// Packs a type id and version with the command bit set.
pub fn make_versioned_command_type(type_id: i64, version: u8) -> MessageTypeId {
    MessageTypeId((COMMAND_BIT_MASK | make_versioned_message_type(type_id, version)) as i64)
}

/// Packs a type id and version with the command bit cleared.
pub fn make_versioned_event_type(type_id: i64, version: u8) -> MessageTypeId {
    MessageTypeId((EVENT_BIT_MASK & make_versioned_message_type(type_id, version)) as i64)
}

/// Returns true when the raw packed value carries the command bit.
pub fn is_command(id: i64) -> bool {
    COMMAND_BIT_MASK & (id as u64) == COMMAND_BIT_MASK
}
