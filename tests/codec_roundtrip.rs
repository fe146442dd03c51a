//! Property-based tests for framing and payload primitives
//!
//! These check that frames survive arbitrary chunking on the byte stream and
//! that dialect-dependent field widths are honored.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use proptest::prelude::*;
use room_intercept::core::buffer::{Id, PacketReader, PacketWriter};
use room_intercept::core::codec::FrameCodec;
use room_intercept::core::frame::RawFrame;
use room_intercept::game::ChatType;
use room_intercept::protocol::message::{decode, encode};
use room_intercept::protocol::messages::{AvatarChatMsg, ChatLink, ChatMsg};
use room_intercept::protocol::{ClientType, In, Out};
use room_intercept::ProtocolError;
use tokio_util::codec::{Decoder, Encoder};

fn any_client() -> impl Strategy<Value = ClientType> {
    prop_oneof![
        Just(ClientType::Flash),
        Just(ClientType::Unity),
        Just(ClientType::Shockwave),
    ]
}

fn any_frame() -> impl Strategy<Value = RawFrame> {
    (any::<u16>(), prop::collection::vec(any::<u8>(), 0..512))
        .prop_map(|(opcode, payload)| RawFrame::new(opcode, payload))
}

// Property: frames decode identically however the stream is split
proptest! {
    #[test]
    fn prop_frames_survive_arbitrary_chunking(
        frames in prop::collection::vec(any_frame(), 1..16),
        chunk in 1usize..64,
    ) {
        let mut codec = FrameCodec::default();
        let mut wire = BytesMut::new();
        for frame in &frames {
            codec.encode(frame.clone(), &mut wire).unwrap();
        }

        let mut inbound = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in wire.chunks(chunk) {
            inbound.extend_from_slice(piece);
            while let Some(frame) = codec.decode(&mut inbound).unwrap() {
                decoded.push(frame);
            }
        }

        prop_assert!(inbound.is_empty());
        prop_assert_eq!(decoded, frames);
    }
}

// Property: strings keep their content on every dialect
proptest! {
    #[test]
    fn prop_strings_roundtrip(client in any_client(), text in "\\PC{0,200}") {
        let mut writer = PacketWriter::new(client);
        writer.write_string(&text).write_i32(7);
        let bytes = writer.into_bytes();

        let mut reader = PacketReader::new(client, &bytes);
        prop_assert_eq!(reader.read_string().unwrap(), text);
        prop_assert_eq!(reader.read_i32().unwrap(), 7);
        prop_assert!(reader.is_empty());
    }
}

// Property: ids are 8 bytes on Unity and 4 bytes elsewhere
proptest! {
    #[test]
    fn prop_id_width_follows_dialect(client in any_client(), id in any::<i32>()) {
        let mut writer = PacketWriter::new(client);
        writer.write_id(Id::from(id));
        let expected = if client == ClientType::Unity { 8 } else { 4 };
        prop_assert_eq!(writer.len(), expected);

        let bytes = writer.into_bytes();
        prop_assert_eq!(PacketReader::new(client, &bytes).read_id().unwrap(), Id::from(id));
    }
}

// Property: array lengths are 2 bytes on Unity and 4 bytes elsewhere
proptest! {
    #[test]
    fn prop_length_width_follows_dialect(client in any_client(), len in 0usize..=i16::MAX as usize) {
        let mut writer = PacketWriter::new(client);
        writer.write_length(len);
        let expected = if client == ClientType::Unity { 2 } else { 4 };
        prop_assert_eq!(writer.len(), expected);

        let bytes = writer.into_bytes();
        prop_assert_eq!(PacketReader::new(client, &bytes).read_length().unwrap(), len);
    }
}

// Property: incoming chat decodes to what was composed
proptest! {
    #[test]
    fn prop_incoming_chat_roundtrip(
        client in any_client(),
        index in any::<i32>(),
        message in "\\PC{0,100}",
        bubble in 0i32..40,
        chat_type in prop_oneof![Just(ChatType::Talk), Just(ChatType::Shout), Just(ChatType::Whisper)],
    ) {
        let chat = AvatarChatMsg {
            chat_type,
            index,
            message,
            gesture: 0,
            bubble,
            links: vec![ChatLink {
                url: "https://example.org".to_string(),
                text: "link".to_string(),
                trusted: true,
            }],
        };
        let identifier = match chat_type {
            ChatType::Talk => In::CHAT,
            ChatType::Shout => In::SHOUT,
            ChatType::Whisper => In::WHISPER,
        };

        let bytes = encode(&chat, client).unwrap();
        prop_assert_eq!(decode::<AvatarChatMsg>(client, identifier, &bytes).unwrap(), chat);
    }
}

#[test]
fn test_negative_length_is_rejected() {
    for client in [ClientType::Flash, ClientType::Unity, ClientType::Shockwave] {
        let mut writer = PacketWriter::new(client);
        if client == ClientType::Unity {
            writer.write_i16(-1);
        } else {
            writer.write_i32(-1);
        }
        let bytes = writer.into_bytes();
        let err = PacketReader::new(client, &bytes).read_length().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidLength(-1)));
    }
}

#[test]
fn test_whisper_has_no_tracking_id() {
    let talk = encode(&ChatMsg::talk("hi"), ClientType::Flash).unwrap();
    let whisper = encode(&ChatMsg::whisper("bob", "hi", 0), ClientType::Flash).unwrap();
    // "bob hi" is four bytes longer than "hi", which the missing id offsets.
    assert_eq!(talk.len(), whisper.len());
    assert_eq!(
        decode::<ChatMsg>(ClientType::Flash, Out::WHISPER, &whisper).unwrap(),
        ChatMsg::whisper("bob", "hi", 0)
    );
}

#[test]
fn test_oversized_length_prefix_is_rejected_before_buffering() {
    let mut codec = FrameCodec::new(1024);
    let mut buf = BytesMut::from(&[0x00, 0x10, 0x00, 0x00, 0x00, 0x01][..]);
    assert!(matches!(
        codec.decode(&mut buf),
        Err(ProtocolError::OversizedFrame(0x0010_0000))
    ));
}

#[test]
fn test_length_below_opcode_size_is_invalid() {
    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::from(&[0x00, 0x00, 0x00, 0x01, 0xFF][..]);
    assert!(matches!(
        codec.decode(&mut buf),
        Err(ProtocolError::InvalidFrame(_))
    ));
}
