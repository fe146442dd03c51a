//! Client variants and variant sets.
//!
//! Each client build family speaks its own dialect of the protocol. A
//! [`ClientSet`] is a bit mask over [`ClientType`] used by messages and
//! handlers to declare which dialects they apply to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

/// A client build family with its own opcode table and field widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// The Unity client ("Modern"). Ids are 64-bit, array lengths 16-bit.
    Unity,
    /// The Flash client ("Modern").
    Flash,
    /// The Shockwave client ("Origins").
    Shockwave,
}

impl ClientType {
    pub const ALL: [ClientType; 3] = [ClientType::Unity, ClientType::Flash, ClientType::Shockwave];

    /// Bit used for this client inside a [`ClientSet`].
    pub const fn bit(self) -> u8 {
        match self {
            ClientType::Unity => 0b001,
            ClientType::Flash => 0b010,
            ClientType::Shockwave => 0b100,
        }
    }

    /// Whether `Id` values are carried as 64-bit integers.
    pub fn has_long_ids(self) -> bool {
        matches!(self, ClientType::Unity)
    }

    /// Whether array lengths are carried as 16-bit integers.
    pub fn has_short_lengths(self) -> bool {
        matches!(self, ClientType::Unity)
    }

    /// Most elements an array can carry on this client.
    pub fn max_array_length(self) -> usize {
        if self.has_short_lengths() {
            i16::MAX as usize
        } else {
            i32::MAX as usize
        }
    }

    pub fn is_modern(self) -> bool {
        ClientSet::MODERN.contains(self)
    }

    pub fn is_origins(self) -> bool {
        ClientSet::ORIGINS.contains(self)
    }

    pub fn name(self) -> &'static str {
        match self {
            ClientType::Unity => "unity",
            ClientType::Flash => "flash",
            ClientType::Shockwave => "shockwave",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unity" => Ok(ClientType::Unity),
            "flash" => Ok(ClientType::Flash),
            "shockwave" | "origins" => Ok(ClientType::Shockwave),
            other => Err(format!("unknown client type: {other}")),
        }
    }
}

/// A set of client variants.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClientSet(u8);

impl ClientSet {
    pub const NONE: ClientSet = ClientSet(0);
    pub const UNITY: ClientSet = ClientSet(ClientType::Unity.bit());
    pub const FLASH: ClientSet = ClientSet(ClientType::Flash.bit());
    pub const SHOCKWAVE: ClientSet = ClientSet(ClientType::Shockwave.bit());
    pub const MODERN: ClientSet = ClientSet(ClientType::Unity.bit() | ClientType::Flash.bit());
    pub const ORIGINS: ClientSet = ClientSet::SHOCKWAVE;
    pub const ALL: ClientSet = ClientSet(0b111);

    pub const fn contains(self, client: ClientType) -> bool {
        self.0 & client.bit() != 0
    }

    pub const fn union(self, other: ClientSet) -> ClientSet {
        ClientSet(self.0 | other.0)
    }

    pub const fn intersection(self, other: ClientSet) -> ClientSet {
        ClientSet(self.0 & other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<ClientType> for ClientSet {
    fn from(client: ClientType) -> Self {
        ClientSet(client.bit())
    }
}

impl BitOr for ClientSet {
    type Output = ClientSet;

    fn bitor(self, rhs: ClientSet) -> ClientSet {
        self.union(rhs)
    }
}

impl BitAnd for ClientSet {
    type Output = ClientSet;

    fn bitand(self, rhs: ClientSet) -> ClientSet {
        self.intersection(rhs)
    }
}

impl Not for ClientSet {
    type Output = ClientSet;

    fn not(self) -> ClientSet {
        ClientSet(!self.0 & ClientSet::ALL.0)
    }
}

impl fmt::Debug for ClientSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = ClientType::ALL
            .iter()
            .filter(|c| self.contains(**c))
            .map(|c| c.name())
            .collect();
        write!(f, "ClientSet({})", names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_and_origins_are_disjoint() {
        assert!((ClientSet::MODERN & ClientSet::ORIGINS).is_empty());
        assert_eq!(ClientSet::MODERN | ClientSet::ORIGINS, ClientSet::ALL);
        assert_eq!(!ClientSet::SHOCKWAVE, ClientSet::MODERN);
    }

    #[test]
    fn test_client_type_parsing() {
        assert_eq!("Flash".parse::<ClientType>(), Ok(ClientType::Flash));
        assert_eq!("origins".parse::<ClientType>(), Ok(ClientType::Shockwave));
        assert!("air".parse::<ClientType>().is_err());
    }

    #[test]
    fn test_field_widths() {
        assert!(ClientType::Unity.has_long_ids());
        assert!(!ClientType::Flash.has_long_ids());
        assert!(ClientType::Flash.is_modern());
        assert!(ClientType::Shockwave.is_origins());
    }
}
