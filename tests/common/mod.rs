//! Helpers shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use room_intercept::core::buffer::Id;
use room_intercept::core::frame::{RawFrame, Relay};
use room_intercept::game::avatar::{AvatarKind, Gender, Tile, UserData};
use room_intercept::protocol::message::{self, Message, Packet};
use room_intercept::protocol::messages::{AvatarInfo, AvatarsAddedMsg, RoomEnteredMsg, UserDataMsg};
use room_intercept::protocol::{ClientType, DialectRegistry, Direction, Interceptor, Session};
use tokio::sync::mpsc;

pub fn attached(client: ClientType) -> (Interceptor, mpsc::UnboundedReceiver<Relay>) {
    let interceptor = Interceptor::new(DialectRegistry::builtin());
    let rx = interceptor.attach(Session::new(client, "test-build"));
    (interceptor, rx)
}

/// Encode `msg` into the frame the attached client would put on the wire.
pub fn frame_of<M: Message>(interceptor: &Interceptor, msg: &M) -> RawFrame {
    let client = interceptor.client().expect("session attached");
    let opcode = interceptor
        .registry()
        .resolve(msg.identifier(), client)
        .expect("identifier supported");
    RawFrame::new(opcode, message::encode(msg, client).expect("message supported"))
}

/// Run `msg` through the pipeline in the direction its identifier names.
pub fn feed<M: Message>(interceptor: &Interceptor, msg: &M) -> Option<RawFrame> {
    interceptor.dispatch(msg.identifier().direction, frame_of(interceptor, msg))
}

/// Everything queued by handlers and senders so far, classified.
pub fn drain(interceptor: &Interceptor, rx: &mut mpsc::UnboundedReceiver<Relay>) -> Vec<Packet> {
    let client = interceptor.client().expect("session attached");
    let mut packets = Vec::new();
    while let Ok(relay) = rx.try_recv() {
        let identifier = interceptor
            .registry()
            .identifier_of(relay.direction, relay.frame.opcode, client)
            .expect("queued frame is classified");
        packets.push(Packet::new(client, identifier, relay.frame.payload));
    }
    packets
}

pub fn user(id: i64, figure: &str, motto: &str) -> UserDataMsg {
    UserDataMsg {
        user: UserData {
            id: Id(id),
            name: "local".to_string(),
            figure: figure.to_string(),
            gender: Gender::Male,
            motto: motto.to_string(),
        },
    }
}

pub fn room(id: i64) -> RoomEnteredMsg {
    RoomEnteredMsg {
        model: "model_a".to_string(),
        room_id: Id(id),
    }
}

pub fn avatar(id: i64, index: i32, name: &str, figure: &str, motto: &str) -> AvatarInfo {
    AvatarInfo {
        id: Id(id),
        name: name.to_string(),
        motto: motto.to_string(),
        figure: figure.to_string(),
        index,
        location: Tile::new(3, 4, 0.0),
        direction: 2,
        kind: AvatarKind::User {
            gender: Gender::Female,
            achievement_score: 10,
        },
    }
}

pub fn added(avatars: Vec<AvatarInfo>) -> AvatarsAddedMsg {
    AvatarsAddedMsg { avatars }
}

pub const IN: Direction = Direction::Incoming;
pub const OUT: Direction = Direction::Outgoing;
