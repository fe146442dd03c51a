//! Wardrobe messages.

use crate::core::buffer::{Compose, PacketReader, PacketWriter, Parse};
use crate::error::Result;
use crate::game::avatar::Gender;
use crate::protocol::client::ClientSet;
use crate::protocol::identifier::{Identifier, In, Out};
use crate::protocol::message::Message;

/// Ask the server for the saved wardrobe outfits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetWardrobeMsg;

impl Message for GetWardrobeMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::MODERN;
    const IDENTIFIERS: &'static [Identifier] = &[Out::GET_WARDROBE];

    fn parse(_p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self)
    }

    fn compose(&self, _p: &mut PacketWriter) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardrobeSlot {
    pub slot: i32,
    pub figure: String,
    pub gender: Gender,
}

impl Parse for WardrobeSlot {
    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            slot: p.read_i32()?,
            figure: p.read_string()?,
            gender: Gender::from_client_str(&p.read_string()?),
        })
    }
}

impl Compose for WardrobeSlot {
    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.slot)
            .write_string(&self.figure)
            .write_string(self.gender.to_client_str());
    }
}

/// The server's reply to [`GetWardrobeMsg`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardrobeMsg {
    pub state: i32,
    pub slots: Vec<WardrobeSlot>,
}

impl Message for WardrobeMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::MODERN;
    const IDENTIFIERS: &'static [Identifier] = &[In::WARDROBE];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            state: p.read_i32()?,
            slots: p.parse_array()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.state).compose_array(&self.slots);
    }
}
