//! Symbolic message identifiers.
//!
//! An [`Identifier`] names a message independently of any client variant.
//! The [`DialectRegistry`](crate::protocol::dialect::DialectRegistry) maps
//! it to the opcode a specific client uses on the wire.

use serde::Serialize;
use std::fmt;

/// Direction a frame travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    /// Server to client.
    Incoming,
    /// Client to server.
    Outgoing,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Incoming => Direction::Outgoing,
            Direction::Outgoing => Direction::Incoming,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Incoming => f.write_str("in"),
            Direction::Outgoing => f.write_str("out"),
        }
    }
}

/// A (direction, symbolic name) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Identifier {
    pub direction: Direction,
    pub name: &'static str,
}

impl Identifier {
    pub const fn incoming(name: &'static str) -> Self {
        Self {
            direction: Direction::Incoming,
            name,
        }
    }

    pub const fn outgoing(name: &'static str) -> Self {
        Self {
            direction: Direction::Outgoing,
            name,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.direction, self.name)
    }
}

/// Incoming (server to client) identifiers.
pub struct In;

impl In {
    pub const USER_OBJECT: Identifier = Identifier::incoming("UserObject");
    pub const ROOM_READY: Identifier = Identifier::incoming("RoomReady");
    pub const CLOSE_CONNECTION: Identifier = Identifier::incoming("CloseConnection");
    pub const USERS: Identifier = Identifier::incoming("Users");
    pub const USER_UPDATE: Identifier = Identifier::incoming("UserUpdate");
    pub const USER_REMOVE: Identifier = Identifier::incoming("UserRemove");
    pub const USER_CHANGE: Identifier = Identifier::incoming("UserChange");
    pub const EXPRESSION: Identifier = Identifier::incoming("Expression");
    pub const DANCE: Identifier = Identifier::incoming("Dance");
    pub const AVATAR_EFFECT: Identifier = Identifier::incoming("AvatarEffect");
    pub const USER_TYPING: Identifier = Identifier::incoming("UserTyping");
    pub const CHAT: Identifier = Identifier::incoming("Chat");
    pub const SHOUT: Identifier = Identifier::incoming("Shout");
    pub const WHISPER: Identifier = Identifier::incoming("Whisper");
    pub const WARDROBE: Identifier = Identifier::incoming("Wardrobe");
    pub const FURNI_LIST_ADD_OR_UPDATE: Identifier = Identifier::incoming("FurniListAddOrUpdate");
}

/// Outgoing (client to server) identifiers.
pub struct Out;

impl Out {
    pub const UPDATE_FIGURE_DATA: Identifier = Identifier::outgoing("UpdateFigureData");
    pub const CHANGE_MOTTO: Identifier = Identifier::outgoing("ChangeMotto");
    pub const LOOK_TO: Identifier = Identifier::outgoing("LookTo");
    pub const MOVE_AVATAR: Identifier = Identifier::outgoing("MoveAvatar");
    pub const CHANGE_POSTURE: Identifier = Identifier::outgoing("ChangePosture");
    pub const SIGN: Identifier = Identifier::outgoing("Sign");
    pub const AVATAR_EXPRESSION: Identifier = Identifier::outgoing("AvatarExpression");
    pub const DANCE: Identifier = Identifier::outgoing("Dance");
    pub const AVATAR_EFFECT_ACTIVATED: Identifier = Identifier::outgoing("AvatarEffectActivated");
    pub const AVATAR_EFFECT_SELECTED: Identifier = Identifier::outgoing("AvatarEffectSelected");
    pub const START_TYPING: Identifier = Identifier::outgoing("StartTyping");
    pub const CANCEL_TYPING: Identifier = Identifier::outgoing("CancelTyping");
    pub const CHAT: Identifier = Identifier::outgoing("Chat");
    pub const SHOUT: Identifier = Identifier::outgoing("Shout");
    pub const WHISPER: Identifier = Identifier::outgoing("Whisper");
    pub const GET_SELECTED_BADGES: Identifier = Identifier::outgoing("GetSelectedBadges");
    pub const GET_WARDROBE: Identifier = Identifier::outgoing("GetWardrobe");
}
