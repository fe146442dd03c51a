//! Typed messages for every identifier the core understands.

pub mod incoming;
pub mod inventory;
pub mod outgoing;
pub mod wardrobe;

pub use incoming::{
    AvatarActionMsg, AvatarChangedMsg, AvatarChatMsg, AvatarDanceMsg, AvatarEffectMsg,
    AvatarInfo, AvatarRemovedMsg, AvatarStatusMsg, AvatarStatusUpdate, AvatarTypingMsg,
    AvatarsAddedMsg, ChatLink, RoomEnteredMsg, RoomLeftMsg, UserDataMsg,
};
pub use inventory::{InventoryItem, InventoryItemAddedOrUpdatedMsg, ItemType};
pub use outgoing::{
    ChangeMottoMsg, ChangePostureMsg, ChatMsg, DanceMsg, EffectActivatedMsg, EffectSelectedMsg,
    ExpressionMsg, LookToMsg, MoveAvatarMsg, SelectAvatarMsg, SignMsg, TypingMsg,
    UpdateAvatarMsg,
};
pub use wardrobe::{GetWardrobeMsg, WardrobeMsg, WardrobeSlot};
