//! Line-oriented text protocol.
//!
//! - Handshake (server → client): the player id in decimal, alone on a line.
//! - Input (client → server): `W`, `A`, `S`, `D`, or an empty line for "no input".
//! - Snapshot (server → all): one flat comma-separated list of records,
//!   `P,id,x,y,direction,frame,moving` for players and
//!   `N,id,x,y,direction,frame,moving,npcType` for NPCs.
//!
//! Snapshot decoding is partial-success: records are read left to right and
//! decoding stops at the first record that is short or malformed. Records before
//! that point are still returned alongside the error.

use crate::entity::Direction;
use thiserror::Error;

const PLAYER_TAG: &str = "P";
const NPC_TAG: &str = "N";
const PLAYER_FIELDS: usize = 6;
const NPC_FIELDS: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("record {tag} at field {offset} needs {needed} fields, {available} left")]
    ShortRecord {
        tag: String,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("unknown record tag {0:?}")]
    UnknownTag(String),
    #[error("invalid {field} value {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("invalid handshake line {0:?}")]
    InvalidHandshake(String),
}

/// One movement input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputToken {
    Move(Direction),
    /// Empty line: all movement keys released.
    Release,
    /// Anything else. The server treats it as a no-op.
    Unknown,
}

impl InputToken {
    pub fn parse(line: &str) -> InputToken {
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if line.is_empty() {
            return InputToken::Release;
        }

        let mut chars = line.chars();
        match (chars.next(), chars.next()) {
            (Some(key), None) => Direction::from_key(key)
                .map(InputToken::Move)
                .unwrap_or(InputToken::Unknown),
            _ => InputToken::Unknown,
        }
    }

    /// Line body without the terminator.
    pub fn as_line(&self) -> String {
        match self {
            InputToken::Move(direction) => direction.key().to_string(),
            InputToken::Release | InputToken::Unknown => String::new(),
        }
    }
}

pub fn encode_handshake(player_id: u32) -> String {
    player_id.to_string()
}

pub fn parse_handshake(line: &str) -> Result<u32, ProtocolError> {
    line.trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidHandshake(line.to_string()))
}

/// Per-entity fields common to both record kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityView {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub frame: u8,
    pub moving: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEntry {
    Player(EntityView),
    Npc { view: EntityView, npc_type: String },
}

impl SnapshotEntry {
    pub fn view(&self) -> &EntityView {
        match self {
            SnapshotEntry::Player(view) => view,
            SnapshotEntry::Npc { view, .. } => view,
        }
    }
}

/// Result of decoding one snapshot line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedSnapshot {
    pub entries: Vec<SnapshotEntry>,
    /// Why decoding stopped early, if it did.
    pub error: Option<ProtocolError>,
}

pub fn encode_snapshot(entries: &[SnapshotEntry]) -> String {
    let records: Vec<String> = entries
        .iter()
        .map(|entry| match entry {
            SnapshotEntry::Player(view) => format!("{},{}", PLAYER_TAG, encode_view(view)),
            SnapshotEntry::Npc { view, npc_type } => {
                format!("{},{},{}", NPC_TAG, encode_view(view), npc_type)
            }
        })
        .collect();
    records.join(",")
}

fn encode_view(view: &EntityView) -> String {
    format!(
        "{},{},{},{},{},{}",
        view.id,
        view.x,
        view.y,
        view.direction.wire_name(),
        view.frame,
        view.moving
    )
}

pub fn decode_snapshot(line: &str) -> DecodedSnapshot {
    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    let mut snapshot = DecodedSnapshot::default();
    if line.is_empty() {
        return snapshot;
    }

    let fields: Vec<&str> = line.split(',').collect();
    let mut i = 0;

    while i < fields.len() {
        let tag = fields[i];
        let needed = match tag {
            PLAYER_TAG => PLAYER_FIELDS,
            NPC_TAG => NPC_FIELDS,
            other => {
                snapshot.error = Some(ProtocolError::UnknownTag(other.to_string()));
                break;
            }
        };

        let available = fields.len() - i - 1;
        if available < needed {
            snapshot.error = Some(ProtocolError::ShortRecord {
                tag: tag.to_string(),
                offset: i,
                needed,
                available,
            });
            break;
        }

        let body = &fields[i + 1..i + 1 + needed];
        let view = match decode_view(body) {
            Ok(view) => view,
            Err(e) => {
                snapshot.error = Some(e);
                break;
            }
        };

        let entry = if tag == NPC_TAG {
            SnapshotEntry::Npc {
                view,
                npc_type: body[6].to_string(),
            }
        } else {
            SnapshotEntry::Player(view)
        };
        snapshot.entries.push(entry);
        i += 1 + needed;
    }

    snapshot
}

fn decode_view(fields: &[&str]) -> Result<EntityView, ProtocolError> {
    Ok(EntityView {
        id: parse_field("id", fields[0])?,
        x: parse_field("x", fields[1])?,
        y: parse_field("y", fields[2])?,
        direction: Direction::from_wire(fields[3]).ok_or_else(|| ProtocolError::InvalidField {
            field: "direction",
            value: fields[3].to_string(),
        })?,
        frame: parse_field("frame", fields[4])?,
        moving: parse_field("moving", fields[5])?,
    })
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidField {
        field,
        value: value.to_string(),
    })
}
