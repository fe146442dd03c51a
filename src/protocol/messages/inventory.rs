//! Inventory messages.

use crate::core::buffer::{Compose, Id, PacketReader, PacketWriter, Parse};
use crate::error::{ProtocolError, Result};
use crate::protocol::client::ClientSet;
use crate::protocol::identifier::{Identifier, In};
use crate::protocol::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Floor,
    Wall,
}

impl ItemType {
    fn code(self) -> &'static str {
        match self {
            ItemType::Floor => "S",
            ItemType::Wall => "I",
        }
    }
}

/// One item in the user's inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub item_id: Id,
    pub item_type: ItemType,
    pub id: Id,
    pub kind: i32,
    pub category: i32,
    pub data: String,
    pub is_recyclable: bool,
    pub is_tradeable: bool,
    pub is_groupable: bool,
    pub is_sellable: bool,
    pub seconds_to_expiration: i32,
}

impl Parse for InventoryItem {
    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        let item_id = p.read_id()?;
        let item_type = match p.read_string()?.as_str() {
            "S" | "s" => ItemType::Floor,
            "I" | "i" => ItemType::Wall,
            other => {
                return Err(ProtocolError::InvalidFrame(format!(
                    "unknown item type {other:?}"
                )))
            }
        };
        Ok(Self {
            item_id,
            item_type,
            id: p.read_id()?,
            kind: p.read_i32()?,
            category: p.read_i32()?,
            data: p.read_string()?,
            is_recyclable: p.read_bool()?,
            is_tradeable: p.read_bool()?,
            is_groupable: p.read_bool()?,
            is_sellable: p.read_bool()?,
            seconds_to_expiration: p.read_i32()?,
        })
    }
}

impl Compose for InventoryItem {
    fn compose(&self, p: &mut PacketWriter) {
        p.write_id(self.item_id)
            .write_string(self.item_type.code())
            .write_id(self.id)
            .write_i32(self.kind)
            .write_i32(self.category)
            .write_string(&self.data)
            .write_bool(self.is_recyclable)
            .write_bool(self.is_tradeable)
            .write_bool(self.is_groupable)
            .write_bool(self.is_sellable)
            .write_i32(self.seconds_to_expiration);
    }
}

/// Received when items are added to or updated in the user's inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItemAddedOrUpdatedMsg {
    pub items: Vec<InventoryItem>,
}

impl Message for InventoryItemAddedOrUpdatedMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::MODERN;
    const IDENTIFIERS: &'static [Identifier] = &[In::FURNI_LIST_ADD_OR_UPDATE];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            items: p.parse_array()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.compose_array(&self.items);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::protocol::client::ClientType;
    use crate::protocol::message::{decode, encode};

    fn item(item_type: ItemType) -> InventoryItem {
        InventoryItem {
            item_id: Id(-77),
            item_type,
            id: Id(77),
            kind: 3011,
            category: 1,
            data: String::new(),
            is_recyclable: false,
            is_tradeable: true,
            is_groupable: true,
            is_sellable: true,
            seconds_to_expiration: -1,
        }
    }

    #[test]
    fn test_items_decode_on_both_modern_clients() {
        let msg = InventoryItemAddedOrUpdatedMsg {
            items: vec![item(ItemType::Floor), item(ItemType::Wall)],
        };
        for client in [ClientType::Flash, ClientType::Unity] {
            let bytes = encode(&msg, client).unwrap();
            let decoded: InventoryItemAddedOrUpdatedMsg =
                decode(client, In::FURNI_LIST_ADD_OR_UPDATE, &bytes).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn test_unknown_item_type_is_a_decode_error() {
        let mut writer = PacketWriter::new(ClientType::Flash);
        writer.write_length(1).write_id(Id(1)).write_string("X");
        let bytes = writer.into_bytes();
        let err = decode::<InventoryItemAddedOrUpdatedMsg>(
            ClientType::Flash,
            In::FURNI_LIST_ADD_OR_UPDATE,
            &bytes,
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidFrame(_)));
    }

    #[test]
    fn test_not_available_on_origins() {
        let msg = InventoryItemAddedOrUpdatedMsg { items: Vec::new() };
        assert!(matches!(
            encode(&msg, ClientType::Shockwave),
            Err(ProtocolError::UnsupportedVariant { .. })
        ));
    }
}
