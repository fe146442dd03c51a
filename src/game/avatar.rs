//! Avatars and the small value types that describe them.

use crate::core::buffer::Id;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Male,
    Female,
    Unisex,
}

impl Gender {
    /// Gender as the client writes it in figure updates.
    pub fn to_client_str(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Unisex => "U",
        }
    }

    /// Parse a client gender string. Unknown values map to `Unisex`.
    pub fn from_client_str(s: &str) -> Gender {
        match s {
            "M" | "m" => Gender::Male,
            "F" | "f" => Gender::Female,
            _ => Gender::Unisex,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_client_str())
    }
}

/// A tile position with height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub z: f64,
}

impl Tile {
    pub fn new(x: i32, y: i32, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Posture {
    #[default]
    Stand,
    Sit {
        height: f64,
    },
    Lay {
        height: f64,
    },
}

impl Posture {
    pub fn is_sitting(&self) -> bool {
        matches!(self, Posture::Sit { .. })
    }
}

/// What kind of entity an avatar is, with kind-specific details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AvatarKind {
    User {
        gender: Gender,
        achievement_score: i32,
    },
    Pet {
        owner_id: Id,
        owner_name: String,
    },
    PublicBot,
    PrivateBot,
}

impl AvatarKind {
    pub fn code(&self) -> i32 {
        match self {
            AvatarKind::User { .. } => 1,
            AvatarKind::Pet { .. } => 2,
            AvatarKind::PublicBot => 3,
            AvatarKind::PrivateBot => 4,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, AvatarKind::User { .. })
    }
}

/// One entity in the current room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: Id,
    /// Only stable within one room visit.
    pub index: i32,
    pub name: String,
    pub motto: String,
    pub figure: String,
    pub kind: AvatarKind,
    pub location: Tile,
    pub direction: i32,
    pub head_direction: i32,
    pub posture: Posture,
    pub moving_to: Option<Tile>,
    pub sign: Option<i32>,
    pub dance: i32,
    pub effect: i32,
    pub action: i32,
    pub is_typing: bool,
}

impl Avatar {
    pub fn gender(&self) -> Gender {
        match &self.kind {
            AvatarKind::User { gender, .. } => *gender,
            _ => Gender::Unisex,
        }
    }

    pub fn is_user(&self) -> bool {
        self.kind.is_user()
    }
}

/// The local user's own profile data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: Id,
    pub name: String,
    pub figure: String,
    pub gender: Gender,
    pub motto: String,
}

/// Chat category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatType {
    Talk,
    Shout,
    Whisper,
}
