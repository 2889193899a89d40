//! Types shared by the movement server and the reconciling client: the entity
//! record, grid directions, collision geometry, static map input, the tunable
//! [`SimConfig`] and the line-based wire protocol.

pub mod collision;
pub mod config;
pub mod entity;
pub mod map;
pub mod protocol;

pub use collision::{probe_footprint, CollisionIndex, LinearScan, Rect};
pub use config::SimConfig;
pub use entity::{Animator, Direction, Entity, Point};
pub use map::{MapBounds, MapData, MapError, NpcBehavior, NpcSeed};
pub use protocol::{
    decode_snapshot, encode_handshake, encode_snapshot, parse_handshake, DecodedSnapshot,
    EntityView, InputToken, ProtocolError, SnapshotEntry,
};
