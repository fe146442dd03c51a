//! # Game State
//!
//! Avatars, rooms and the tracker that keeps them current from intercepted
//! traffic.

pub mod avatar;
pub mod room;
pub mod tracker;

pub use avatar::{Avatar, AvatarKind, ChatType, Gender, Posture, Tile, UserData};
pub use room::Room;
pub use tracker::{AvatarChange, RoomTracker, TrackerEvent};
