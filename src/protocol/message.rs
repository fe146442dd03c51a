//! # Message Contract
//!
//! A [`Message`] is a typed record bound to one or more identifiers. It
//! declares the clients it supports, decodes itself from a positioned
//! [`PacketReader`] and encodes itself into a [`PacketWriter`].
//!
//! Callers must check [`Message::SUPPORTED_CLIENTS`] before encoding or
//! decoding for a client; [`encode`] and [`decode`] do that check and report
//! [`ProtocolError::UnsupportedVariant`] instead of producing garbage.
//!
//! Encoding is lossless within the wire limits of the target client: strings
//! up to `u16::MAX` bytes, arrays up to [`ClientType::max_array_length`]
//! elements (32767 on Unity), and ids within `i32` on Flash and Shockwave.
//! Larger values are cut down by the writer, see [`crate::core::buffer`].

use crate::core::buffer::{PacketReader, PacketWriter};
use crate::error::{ProtocolError, Result};
use crate::protocol::client::{ClientSet, ClientType};
use crate::protocol::identifier::Identifier;
use bytes::Bytes;

pub trait Message: Sized + Send + 'static {
    /// Clients this message exists on.
    const SUPPORTED_CLIENTS: ClientSet;

    /// Identifiers that carry this message. Must not be empty; the first
    /// entry is the default identifier used when composing.
    const IDENTIFIERS: &'static [Identifier];

    /// Identifier this instance is sent with.
    fn identifier(&self) -> Identifier {
        Self::IDENTIFIERS[0]
    }

    fn parse(p: &mut PacketReader<'_>) -> Result<Self>;

    fn compose(&self, p: &mut PacketWriter);

    fn is_supported_on(client: ClientType) -> bool {
        Self::SUPPORTED_CLIENTS.contains(client)
    }

    fn is_carried_by(identifier: Identifier) -> bool {
        Self::IDENTIFIERS.contains(&identifier)
    }
}

fn short_name<M>() -> &'static str {
    let full = std::any::type_name::<M>();
    full.rsplit("::").next().unwrap_or(full)
}

pub(crate) fn ensure_supported<M: Message>(client: ClientType) -> Result<()> {
    if M::is_supported_on(client) {
        Ok(())
    } else {
        Err(ProtocolError::UnsupportedVariant {
            message: short_name::<M>(),
            client,
        })
    }
}

/// Encode `message` into a payload for `client`.
pub fn encode<M: Message>(message: &M, client: ClientType) -> Result<Bytes> {
    ensure_supported::<M>(client)?;
    let mut writer = PacketWriter::new(client);
    message.compose(&mut writer);
    Ok(writer.into_bytes())
}

/// Decode a payload that was classified as `identifier` on `client`.
pub fn decode<M: Message>(client: ClientType, identifier: Identifier, payload: &[u8]) -> Result<M> {
    ensure_supported::<M>(client)?;
    let mut reader = PacketReader::new(client, payload).with_identifier(identifier);
    M::parse(&mut reader)
}

/// A classified frame: the payload together with the identifier and client
/// it was seen on. Returned by the correlator and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub client: ClientType,
    pub identifier: Identifier,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(client: ClientType, identifier: Identifier, payload: Bytes) -> Self {
        Self {
            client,
            identifier,
            payload,
        }
    }

    /// A reader positioned at the start of the payload.
    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader::new(self.client, &self.payload).with_identifier(self.identifier)
    }

    /// Decode the payload as `M`.
    pub fn parse<M: Message>(&self) -> Result<M> {
        decode::<M>(self.client, self.identifier, &self.payload)
    }
}
