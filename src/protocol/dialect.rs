//! # Dialect Registry
//!
//! Maps symbolic [`Identifier`]s to wire opcodes per [`ClientType`].
//!
//! The registry is built once from a static table per client. An identifier
//! that is missing from a client's table is simply not supported by that
//! dialect; lookups return `None` rather than failing.

use crate::protocol::client::ClientType;
use crate::protocol::identifier::{Direction, Identifier, In, Out};
use std::collections::HashMap;
use tracing::warn;

/// Static opcode table for one client.
pub type OpcodeTable = &'static [(Identifier, u16)];

#[derive(Debug, Default, Clone)]
struct DialectTable {
    forward: HashMap<Identifier, u16>,
    reverse: HashMap<(Direction, u16), Identifier>,
}

impl DialectTable {
    fn insert(&mut self, identifier: Identifier, opcode: u16) {
        if let Some(existing) = self.reverse.get(&(identifier.direction, opcode)) {
            if *existing != identifier {
                warn!(
                    %identifier,
                    %existing,
                    opcode,
                    "Opcode already mapped in this direction, keeping first mapping"
                );
                return;
            }
        }
        self.forward.insert(identifier, opcode);
        self.reverse.insert((identifier.direction, opcode), identifier);
    }
}

/// Per-client opcode mapping.
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    tables: HashMap<ClientType, DialectTable>,
}

impl DialectRegistry {
    /// Create an empty registry. Every lookup returns `None` until tables are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the built-in tables for every client.
    pub fn builtin() -> Self {
        Self::new()
            .with_table(ClientType::Flash, FLASH_TABLE)
            .with_table(ClientType::Unity, UNITY_TABLE)
            .with_table(ClientType::Shockwave, SHOCKWAVE_TABLE)
    }

    /// Add (or extend) the table for `client`.
    pub fn with_table(mut self, client: ClientType, table: OpcodeTable) -> Self {
        let entry = self.tables.entry(client).or_default();
        for (identifier, opcode) in table {
            entry.insert(*identifier, *opcode);
        }
        self
    }

    /// Resolve `identifier` to the opcode used by `client`.
    pub fn resolve(&self, identifier: Identifier, client: ClientType) -> Option<u16> {
        self.tables
            .get(&client)
            .and_then(|table| table.forward.get(&identifier))
            .copied()
    }

    /// Classify an opcode seen travelling in `direction` on `client`.
    pub fn identifier_of(
        &self,
        direction: Direction,
        opcode: u16,
        client: ClientType,
    ) -> Option<Identifier> {
        self.tables
            .get(&client)
            .and_then(|table| table.reverse.get(&(direction, opcode)))
            .copied()
    }

    pub fn is_supported(&self, identifier: Identifier, client: ClientType) -> bool {
        self.resolve(identifier, client).is_some()
    }

    /// Number of identifiers known for `client`.
    pub fn len(&self, client: ClientType) -> usize {
        self.tables.get(&client).map_or(0, |t| t.forward.len())
    }
}

static FLASH_TABLE: OpcodeTable = &[
    (In::USER_OBJECT, 2725),
    (In::ROOM_READY, 2031),
    (In::CLOSE_CONNECTION, 122),
    (In::USERS, 374),
    (In::USER_UPDATE, 1640),
    (In::USER_REMOVE, 2661),
    (In::USER_CHANGE, 3920),
    (In::EXPRESSION, 1631),
    (In::DANCE, 2233),
    (In::AVATAR_EFFECT, 1167),
    (In::USER_TYPING, 1717),
    (In::CHAT, 1446),
    (In::SHOUT, 1036),
    (In::WHISPER, 2704),
    (In::WARDROBE, 3315),
    (In::FURNI_LIST_ADD_OR_UPDATE, 104),
    (Out::UPDATE_FIGURE_DATA, 2730),
    (Out::CHANGE_MOTTO, 2228),
    (Out::LOOK_TO, 3301),
    (Out::MOVE_AVATAR, 3320),
    (Out::CHANGE_POSTURE, 2235),
    (Out::SIGN, 1975),
    (Out::AVATAR_EXPRESSION, 2456),
    (Out::DANCE, 2080),
    (Out::AVATAR_EFFECT_ACTIVATED, 2959),
    (Out::AVATAR_EFFECT_SELECTED, 1752),
    (Out::START_TYPING, 1597),
    (Out::CANCEL_TYPING, 1474),
    (Out::CHAT, 1314),
    (Out::SHOUT, 2085),
    (Out::WHISPER, 1543),
    (Out::GET_SELECTED_BADGES, 2091),
    (Out::GET_WARDROBE, 2742),
];

static UNITY_TABLE: OpcodeTable = &[
    (In::USER_OBJECT, 10),
    (In::ROOM_READY, 61),
    (In::CLOSE_CONNECTION, 62),
    (In::USERS, 70),
    (In::USER_UPDATE, 71),
    (In::USER_REMOVE, 72),
    (In::USER_CHANGE, 73),
    (In::EXPRESSION, 74),
    (In::DANCE, 75),
    (In::AVATAR_EFFECT, 76),
    (In::USER_TYPING, 77),
    (In::CHAT, 80),
    (In::SHOUT, 81),
    (In::WHISPER, 82),
    (In::WARDROBE, 120),
    (In::FURNI_LIST_ADD_OR_UPDATE, 131),
    (Out::UPDATE_FIGURE_DATA, 20),
    (Out::CHANGE_MOTTO, 21),
    (Out::LOOK_TO, 40),
    (Out::MOVE_AVATAR, 41),
    (Out::CHANGE_POSTURE, 42),
    (Out::SIGN, 43),
    (Out::AVATAR_EXPRESSION, 44),
    (Out::DANCE, 45),
    (Out::AVATAR_EFFECT_ACTIVATED, 46),
    (Out::AVATAR_EFFECT_SELECTED, 47),
    (Out::START_TYPING, 48),
    (Out::CANCEL_TYPING, 49),
    (Out::CHAT, 52),
    (Out::SHOUT, 53),
    (Out::WHISPER, 54),
    (Out::GET_SELECTED_BADGES, 90),
    (Out::GET_WARDROBE, 91),
];

// Origins lacks badges, wardrobe, inventory updates, effects and typing.
static SHOCKWAVE_TABLE: OpcodeTable = &[
    (In::USER_OBJECT, 5),
    (In::ROOM_READY, 166),
    (In::CLOSE_CONNECTION, 18),
    (In::USERS, 28),
    (In::USER_UPDATE, 34),
    (In::USER_REMOVE, 29),
    (In::USER_CHANGE, 266),
    (In::EXPRESSION, 481),
    (In::DANCE, 480),
    (In::CHAT, 24),
    (In::SHOUT, 26),
    (In::WHISPER, 25),
    (Out::UPDATE_FIGURE_DATA, 44),
    (Out::CHANGE_MOTTO, 484),
    (Out::LOOK_TO, 79),
    (Out::MOVE_AVATAR, 75),
    (Out::CHANGE_POSTURE, 485),
    (Out::SIGN, 104),
    (Out::AVATAR_EXPRESSION, 486),
    (Out::DANCE, 93),
    (Out::CHAT, 52),
    (Out::SHOUT, 55),
    (Out::WHISPER, 56),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_and_reverse_lookup_agree() {
        let registry = DialectRegistry::builtin();
        for client in ClientType::ALL {
            let opcode = registry.resolve(Out::CHAT, client).expect("chat exists everywhere");
            assert_eq!(
                registry.identifier_of(Direction::Outgoing, opcode, client),
                Some(Out::CHAT)
            );
        }
    }

    #[test]
    fn test_missing_identifier_is_not_supported() {
        let registry = DialectRegistry::builtin();
        assert_eq!(registry.resolve(Out::GET_SELECTED_BADGES, ClientType::Shockwave), None);
        assert!(!registry.is_supported(In::WARDROBE, ClientType::Shockwave));
        assert!(registry.is_supported(In::WARDROBE, ClientType::Unity));
    }

    #[test]
    fn test_direction_is_part_of_the_key() {
        let registry = DialectRegistry::builtin();
        // Origins uses 52 for outgoing chat; no incoming message has that opcode.
        assert_eq!(registry.identifier_of(Direction::Incoming, 52, ClientType::Shockwave), None);
    }

    #[test]
    fn test_empty_registry_never_resolves() {
        let registry = DialectRegistry::new();
        assert_eq!(registry.resolve(In::CHAT, ClientType::Flash), None);
        assert_eq!(registry.identifier_of(Direction::Incoming, 1446, ClientType::Flash), None);
        assert_eq!(registry.len(ClientType::Flash), 0);
    }

    #[test]
    fn test_conflicting_opcode_keeps_first_mapping() {
        static TABLE: OpcodeTable = &[(In::CHAT, 7), (In::SHOUT, 7)];
        let registry = DialectRegistry::new().with_table(ClientType::Flash, TABLE);
        assert_eq!(registry.identifier_of(Direction::Incoming, 7, ClientType::Flash), Some(In::CHAT));
        assert_eq!(registry.resolve(In::SHOUT, ClientType::Flash), None);
    }
}
