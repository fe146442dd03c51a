//! Server to client messages.

use crate::core::buffer::{Compose, Id, PacketReader, PacketWriter, Parse};
use crate::error::{ProtocolError, Result};
use crate::game::avatar::{AvatarKind, ChatType, Gender, Posture, Tile, UserData};
use crate::protocol::client::ClientSet;
use crate::protocol::identifier::{Identifier, In};
use crate::protocol::message::Message;

/// The local user's profile, received after login.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDataMsg {
    pub user: UserData,
}

impl Message for UserDataMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::USER_OBJECT];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            user: UserData {
                id: p.read_id()?,
                name: p.read_string()?,
                figure: p.read_string()?,
                gender: Gender::from_client_str(&p.read_string()?),
                motto: p.read_string()?,
            },
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_id(self.user.id)
            .write_string(&self.user.name)
            .write_string(&self.user.figure)
            .write_string(self.user.gender.to_client_str())
            .write_string(&self.user.motto);
    }
}

/// Sent once the room is loaded and the user is inside.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEnteredMsg {
    pub model: String,
    pub room_id: Id,
}

impl Message for RoomEnteredMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::ROOM_READY];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            model: p.read_string()?,
            room_id: p.read_id()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_string(&self.model).write_id(self.room_id);
    }
}

/// Sent when the user leaves the current room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomLeftMsg;

impl Message for RoomLeftMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::CLOSE_CONNECTION];

    fn parse(_p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self)
    }

    fn compose(&self, _p: &mut PacketWriter) {}
}

/// Presence record for one avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarInfo {
    pub id: Id,
    pub name: String,
    pub motto: String,
    pub figure: String,
    pub index: i32,
    pub location: Tile,
    pub direction: i32,
    pub kind: AvatarKind,
}

impl Parse for AvatarInfo {
    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        let id = p.read_id()?;
        let name = p.read_string()?;
        let motto = p.read_string()?;
        let figure = p.read_string()?;
        let index = p.read_i32()?;
        let x = p.read_i32()?;
        let y = p.read_i32()?;
        let z = p.read_float_string()?;
        let direction = p.read_i32()?;
        let kind = match p.read_i32()? {
            1 => AvatarKind::User {
                gender: Gender::from_client_str(&p.read_string()?),
                achievement_score: p.read_i32()?,
            },
            2 => AvatarKind::Pet {
                owner_id: p.read_id()?,
                owner_name: p.read_string()?,
            },
            3 => AvatarKind::PublicBot,
            4 => AvatarKind::PrivateBot,
            other => {
                return Err(ProtocolError::InvalidFrame(format!(
                    "unknown avatar kind {other}"
                )))
            }
        };
        Ok(Self {
            id,
            name,
            motto,
            figure,
            index,
            location: Tile::new(x, y, z),
            direction,
            kind,
        })
    }
}

impl Compose for AvatarInfo {
    fn compose(&self, p: &mut PacketWriter) {
        p.write_id(self.id)
            .write_string(&self.name)
            .write_string(&self.motto)
            .write_string(&self.figure)
            .write_i32(self.index)
            .write_i32(self.location.x)
            .write_i32(self.location.y)
            .write_float_string(self.location.z)
            .write_i32(self.direction)
            .write_i32(self.kind.code());
        match &self.kind {
            AvatarKind::User {
                gender,
                achievement_score,
            } => {
                p.write_string(gender.to_client_str())
                    .write_i32(*achievement_score);
            }
            AvatarKind::Pet {
                owner_id,
                owner_name,
            } => {
                p.write_id(*owner_id).write_string(owner_name);
            }
            AvatarKind::PublicBot | AvatarKind::PrivateBot => {}
        }
    }
}

/// One or more avatars appeared in the room.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarsAddedMsg {
    pub avatars: Vec<AvatarInfo>,
}

impl Message for AvatarsAddedMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::USERS];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            avatars: p.parse_array()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.compose_array(&self.avatars);
    }
}

/// One avatar's entry in a status update.
///
/// The protocol carries posture, movement and sign as a slash separated
/// action string such as `/mv 3,4,0.0/sit 1.0/sign 5/`. Fragments that are not
/// understood are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarStatusUpdate {
    pub index: i32,
    pub location: Tile,
    pub head_direction: i32,
    pub direction: i32,
    pub posture: Posture,
    pub moving_to: Option<Tile>,
    pub sign: Option<i32>,
    pub extra: Vec<String>,
}

impl AvatarStatusUpdate {
    fn apply_actions(&mut self, actions: &str) {
        for fragment in actions.split('/').filter(|f| !f.is_empty()) {
            let (name, args) = fragment.split_once(' ').unwrap_or((fragment, ""));
            let handled = match name {
                "mv" => parse_tile(args).map(|tile| self.moving_to = Some(tile)),
                "sit" => first_float(args).map(|height| self.posture = Posture::Sit { height }),
                "lay" => first_float(args).map(|height| self.posture = Posture::Lay { height }),
                "sign" => args.trim().parse().ok().map(|sign| self.sign = Some(sign)),
                _ => None,
            };
            if handled.is_none() {
                self.extra.push(fragment.to_string());
            }
        }
    }

    fn actions(&self) -> String {
        let mut fragments = Vec::new();
        if let Some(tile) = self.moving_to {
            fragments.push(format!("mv {tile}"));
        }
        match self.posture {
            Posture::Stand => {}
            Posture::Sit { height } => fragments.push(format!("sit {height}")),
            Posture::Lay { height } => fragments.push(format!("lay {height}")),
        }
        if let Some(sign) = self.sign {
            fragments.push(format!("sign {sign}"));
        }
        fragments.extend(self.extra.iter().cloned());
        format!("/{}/", fragments.join("/"))
    }
}

fn parse_tile(args: &str) -> Option<Tile> {
    let mut parts = args.trim().split(',');
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Tile::new(x, y, z))
}

fn first_float(args: &str) -> Option<f64> {
    args.split_whitespace().next()?.parse().ok()
}

impl Parse for AvatarStatusUpdate {
    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        let index = p.read_i32()?;
        let x = p.read_i32()?;
        let y = p.read_i32()?;
        let z = p.read_float_string()?;
        let head_direction = p.read_i32()?;
        let direction = p.read_i32()?;
        let actions = p.read_string()?;

        let mut update = Self {
            index,
            location: Tile::new(x, y, z),
            head_direction,
            direction,
            posture: Posture::Stand,
            moving_to: None,
            sign: None,
            extra: Vec::new(),
        };
        update.apply_actions(&actions);
        Ok(update)
    }
}

impl Compose for AvatarStatusUpdate {
    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.index)
            .write_i32(self.location.x)
            .write_i32(self.location.y)
            .write_float_string(self.location.z)
            .write_i32(self.head_direction)
            .write_i32(self.direction)
            .write_string(&self.actions());
    }
}

/// Position, posture and sign updates for avatars in the room.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarStatusMsg {
    pub updates: Vec<AvatarStatusUpdate>,
}

impl Message for AvatarStatusMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::USER_UPDATE];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            updates: p.parse_array()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.compose_array(&self.updates);
    }
}

/// An avatar left the room. The index travels as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarRemovedMsg {
    pub index: i32,
}

impl Message for AvatarRemovedMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::USER_REMOVE];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        let text = p.read_string()?;
        let index = text
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidFrame(format!("invalid avatar index {text:?}")))?;
        Ok(Self { index })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_string(&self.index.to_string());
    }
}

/// An avatar changed figure, gender or motto.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarChangedMsg {
    pub index: i32,
    pub figure: String,
    pub gender: Gender,
    pub motto: String,
    pub achievement_score: i32,
}

impl Message for AvatarChangedMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::USER_CHANGE];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            index: p.read_i32()?,
            figure: p.read_string()?,
            gender: Gender::from_client_str(&p.read_string()?),
            motto: p.read_string()?,
            achievement_score: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.index)
            .write_string(&self.figure)
            .write_string(self.gender.to_client_str())
            .write_string(&self.motto)
            .write_i32(self.achievement_score);
    }
}

/// An avatar performed a gesture (wave, blow kiss, laugh...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarActionMsg {
    pub index: i32,
    pub action: i32,
}

impl Message for AvatarActionMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::EXPRESSION];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            index: p.read_i32()?,
            action: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.index).write_i32(self.action);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarDanceMsg {
    pub index: i32,
    pub dance: i32,
}

impl Message for AvatarDanceMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::DANCE];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            index: p.read_i32()?,
            dance: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.index).write_i32(self.dance);
    }
}

/// An avatar's visual effect changed. `0` and `-1` clear the effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarEffectMsg {
    pub index: i32,
    pub effect: i32,
    pub delay: i32,
}

impl Message for AvatarEffectMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::MODERN;
    const IDENTIFIERS: &'static [Identifier] = &[In::AVATAR_EFFECT];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            index: p.read_i32()?,
            effect: p.read_i32()?,
            delay: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.index)
            .write_i32(self.effect)
            .write_i32(self.delay);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarTypingMsg {
    pub index: i32,
    pub typing: bool,
}

impl Message for AvatarTypingMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::MODERN;
    const IDENTIFIERS: &'static [Identifier] = &[In::USER_TYPING];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            index: p.read_i32()?,
            typing: p.read_i32()? != 0,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.index).write_i32(self.typing as i32);
    }
}

/// A link embedded in a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLink {
    pub url: String,
    pub text: String,
    pub trusted: bool,
}

impl Parse for ChatLink {
    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            url: p.read_string()?,
            text: p.read_string()?,
            trusted: p.read_bool()?,
        })
    }
}

impl Compose for ChatLink {
    fn compose(&self, p: &mut PacketWriter) {
        p.write_string(&self.url)
            .write_string(&self.text)
            .write_bool(self.trusted);
    }
}

/// Chat from an avatar. The chat category is decided by which identifier
/// carried the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarChatMsg {
    pub chat_type: ChatType,
    pub index: i32,
    pub message: String,
    pub gesture: i32,
    pub bubble: i32,
    pub links: Vec<ChatLink>,
}

impl Message for AvatarChatMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[In::CHAT, In::SHOUT, In::WHISPER];

    fn identifier(&self) -> Identifier {
        match self.chat_type {
            ChatType::Talk => In::CHAT,
            ChatType::Shout => In::SHOUT,
            ChatType::Whisper => In::WHISPER,
        }
    }

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        let chat_type = match p.identifier() {
            Some(id) if id == In::SHOUT => ChatType::Shout,
            Some(id) if id == In::WHISPER => ChatType::Whisper,
            _ => ChatType::Talk,
        };
        Ok(Self {
            chat_type,
            index: p.read_i32()?,
            message: p.read_string()?,
            gesture: p.read_i32()?,
            bubble: p.read_i32()?,
            links: p.parse_array()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.index)
            .write_string(&self.message)
            .write_i32(self.gesture)
            .write_i32(self.bubble)
            .compose_array(&self.links);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::protocol::client::ClientType;
    use crate::protocol::message::{decode, encode};

    #[test]
    fn test_status_actions_are_parsed() {
        let mut w = PacketWriter::new(ClientType::Flash);
        w.write_i32(3)
            .write_i32(5)
            .write_i32(6)
            .write_string("0.0")
            .write_i32(2)
            .write_i32(2)
            .write_string("/flatctrl 4/mv 6,7,0.5/sit 1.0 1/sign 11/");
        let bytes = w.into_bytes();
        let update: AvatarStatusUpdate = PacketReader::new(ClientType::Flash, &bytes).parse().unwrap();

        assert_eq!(update.moving_to, Some(Tile::new(6, 7, 0.5)));
        assert_eq!(update.posture, Posture::Sit { height: 1.0 });
        assert_eq!(update.sign, Some(11));
        assert_eq!(update.extra, vec!["flatctrl 4".to_string()]);
    }

    #[test]
    fn test_empty_status_is_standing() {
        let update = AvatarStatusUpdate {
            index: 0,
            location: Tile::default(),
            head_direction: 0,
            direction: 0,
            posture: Posture::Stand,
            moving_to: None,
            sign: None,
            extra: vec![],
        };
        assert_eq!(update.actions(), "//");
    }

    #[test]
    fn test_chat_type_follows_identifier() {
        let msg = AvatarChatMsg {
            chat_type: ChatType::Whisper,
            index: 1,
            message: "psst".into(),
            gesture: 0,
            bubble: 0,
            links: vec![],
        };
        let bytes = encode(&msg, ClientType::Flash).unwrap();
        let decoded: AvatarChatMsg = decode(ClientType::Flash, msg.identifier(), &bytes).unwrap();
        assert_eq!(decoded, msg);

        let as_shout: AvatarChatMsg = decode(ClientType::Flash, In::SHOUT, &bytes).unwrap();
        assert_eq!(as_shout.chat_type, ChatType::Shout);
    }

    #[test]
    fn test_removed_index_travels_as_text() {
        let bytes = encode(&AvatarRemovedMsg { index: 12 }, ClientType::Flash).unwrap();
        assert_eq!(&bytes[..], &[0, 2, b'1', b'2']);
    }

    #[test]
    fn test_effect_is_modern_only() {
        let msg = AvatarEffectMsg { index: 0, effect: 140, delay: 0 };
        assert!(matches!(
            encode(&msg, ClientType::Shockwave),
            Err(ProtocolError::UnsupportedVariant { .. })
        ));
    }
}
