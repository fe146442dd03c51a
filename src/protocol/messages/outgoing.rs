//! Client to server messages.

use crate::core::buffer::{Id, PacketReader, PacketWriter};
use crate::error::Result;
use crate::game::avatar::{ChatType, Gender};
use crate::protocol::client::ClientSet;
use crate::protocol::identifier::{Identifier, Out};
use crate::protocol::message::Message;

/// Change the local user's figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAvatarMsg {
    pub gender: Gender,
    pub figure: String,
}

impl Message for UpdateAvatarMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[Out::UPDATE_FIGURE_DATA];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            gender: Gender::from_client_str(&p.read_string()?),
            figure: p.read_string()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_string(self.gender.to_client_str())
            .write_string(&self.figure);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeMottoMsg {
    pub motto: String,
}

impl Message for ChangeMottoMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[Out::CHANGE_MOTTO];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            motto: p.read_string()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_string(&self.motto);
    }
}

/// Turn the local avatar to face a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookToMsg {
    pub x: i32,
    pub y: i32,
}

impl Message for LookToMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[Out::LOOK_TO];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            x: p.read_i32()?,
            y: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.x).write_i32(self.y);
    }
}

/// Walk the local avatar to a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveAvatarMsg {
    pub x: i32,
    pub y: i32,
}

impl Message for MoveAvatarMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[Out::MOVE_AVATAR];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            x: p.read_i32()?,
            y: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.x).write_i32(self.y);
    }
}

/// `0` stands, `1` sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangePostureMsg {
    pub posture: i32,
}

impl ChangePostureMsg {
    pub const STAND: i32 = 0;
    pub const SIT: i32 = 1;

    pub fn sit(sitting: bool) -> Self {
        Self {
            posture: if sitting { Self::SIT } else { Self::STAND },
        }
    }
}

impl Message for ChangePostureMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[Out::CHANGE_POSTURE];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            posture: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.posture);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignMsg {
    pub sign: i32,
}

impl Message for SignMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[Out::SIGN];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            sign: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.sign);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionMsg {
    pub action: i32,
}

impl Message for ExpressionMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[Out::AVATAR_EXPRESSION];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            action: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.action);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DanceMsg {
    pub dance: i32,
}

impl Message for DanceMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[Out::DANCE];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            dance: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.dance);
    }
}

/// Activate an effect from the inventory. `-1` deactivates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectActivatedMsg {
    pub effect: i32,
}

impl Message for EffectActivatedMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::MODERN;
    const IDENTIFIERS: &'static [Identifier] = &[Out::AVATAR_EFFECT_ACTIVATED];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            effect: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.effect);
    }
}

/// Select the active effect. `-1` clears the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectSelectedMsg {
    pub effect: i32,
}

impl Message for EffectSelectedMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::MODERN;
    const IDENTIFIERS: &'static [Identifier] = &[Out::AVATAR_EFFECT_SELECTED];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            effect: p.read_i32()?,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_i32(self.effect);
    }
}

/// Start or stop the typing indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingMsg {
    pub typing: bool,
}

impl Message for TypingMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::MODERN;
    const IDENTIFIERS: &'static [Identifier] = &[Out::START_TYPING, Out::CANCEL_TYPING];

    fn identifier(&self) -> Identifier {
        if self.typing {
            Out::START_TYPING
        } else {
            Out::CANCEL_TYPING
        }
    }

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            typing: p.identifier() != Some(Out::CANCEL_TYPING),
        })
    }

    fn compose(&self, _p: &mut PacketWriter) {}
}

/// Chat as the local user.
///
/// Talk and shout carry a trailing tracking id of `-1`. Whispers have no
/// recipient field; the recipient's name leads the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMsg {
    pub chat_type: ChatType,
    pub message: String,
    pub bubble: i32,
}

impl ChatMsg {
    const TRACKING_ID: i32 = -1;

    pub fn talk(message: impl Into<String>) -> Self {
        Self {
            chat_type: ChatType::Talk,
            message: message.into(),
            bubble: 0,
        }
    }

    pub fn whisper(recipient: &str, message: &str, bubble: i32) -> Self {
        Self {
            chat_type: ChatType::Whisper,
            message: format!("{recipient} {message}"),
            bubble,
        }
    }
}

impl Message for ChatMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::ALL;
    const IDENTIFIERS: &'static [Identifier] = &[Out::CHAT, Out::SHOUT, Out::WHISPER];

    fn identifier(&self) -> Identifier {
        match self.chat_type {
            ChatType::Talk => Out::CHAT,
            ChatType::Shout => Out::SHOUT,
            ChatType::Whisper => Out::WHISPER,
        }
    }

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        let chat_type = match p.identifier() {
            Some(id) if id == Out::SHOUT => ChatType::Shout,
            Some(id) if id == Out::WHISPER => ChatType::Whisper,
            _ => ChatType::Talk,
        };
        let message = p.read_string()?;
        let bubble = p.read_i32()?;
        if chat_type != ChatType::Whisper {
            p.read_i32()?;
        }
        Ok(Self {
            chat_type,
            message,
            bubble,
        })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_string(&self.message).write_i32(self.bubble);
        if self.chat_type != ChatType::Whisper {
            p.write_i32(Self::TRACKING_ID);
        }
    }
}

/// Sent by the client when the user clicks another avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectAvatarMsg {
    pub id: Id,
}

impl Message for SelectAvatarMsg {
    const SUPPORTED_CLIENTS: ClientSet = ClientSet::MODERN;
    const IDENTIFIERS: &'static [Identifier] = &[Out::GET_SELECTED_BADGES];

    fn parse(p: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self { id: p.read_id()? })
    }

    fn compose(&self, p: &mut PacketWriter) {
        p.write_id(self.id);
    }
}
