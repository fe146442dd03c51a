//! # Mimic
//!
//! Copies another avatar: its look, motto, gestures, dances, effects,
//! posture, sign, typing indicator and chat.
//!
//! ```text
//! Idle --start--> Selecting --click on avatar--> Active
//!   ^                 |                             |
//!   +------stop-------+---room change, target gone,-+
//!                          stop or disconnect
//! ```
//!
//! While selecting, the client's own look-at command is swallowed so that
//! clicking a user does not turn the local avatar. Leaving the active state
//! restores the figure and motto the local user had before mimicking began.

use crate::core::buffer::Id;
use crate::game::avatar::{Avatar, ChatType, Gender};
use crate::game::tracker::{AvatarChange, RoomTracker, TrackerEvent};
use crate::protocol::dispatcher::Interceptor;
use crate::protocol::identifier::Out;
use crate::protocol::messages::{
    AvatarChatMsg, ChangeMottoMsg, ChangePostureMsg, ChatMsg, DanceMsg, EffectActivatedMsg,
    EffectSelectedMsg, ExpressionMsg, LookToMsg, MoveAvatarMsg, SelectAvatarMsg, SignMsg,
    TypingMsg, UpdateAvatarMsg,
};
use crate::service::controller::{Controller, ControllerBase, ControllerStatus};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use tokio::sync::watch;
use tracing::{debug, info};

/// Effects the client cannot select directly; they are triggered by chat commands.
const EFFECT_MACROS: [(i32, &str); 3] = [(140, ":habnam"), (196, ":YYXXABXA"), (136, ":moonwalk")];

const NO_EFFECT: i32 = -1;

fn effect_macro(effect: i32) -> Option<&'static str> {
    EFFECT_MACROS
        .iter()
        .find(|(code, _)| *code == effect)
        .map(|(_, command)| *command)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MimicState {
    #[default]
    Idle,
    Selecting,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MimicOption {
    Figure,
    Motto,
    Action,
    Dance,
    Sign,
    Effect,
    Sit,
    Follow,
    Typing,
    Talk,
    Shout,
    Whisper,
}

impl MimicOption {
    pub const ALL: [MimicOption; 12] = [
        MimicOption::Figure,
        MimicOption::Motto,
        MimicOption::Action,
        MimicOption::Dance,
        MimicOption::Sign,
        MimicOption::Effect,
        MimicOption::Sit,
        MimicOption::Follow,
        MimicOption::Typing,
        MimicOption::Talk,
        MimicOption::Shout,
        MimicOption::Whisper,
    ];

    pub fn for_chat(chat_type: ChatType) -> MimicOption {
        match chat_type {
            ChatType::Talk => MimicOption::Talk,
            ChatType::Shout => MimicOption::Shout,
            ChatType::Whisper => MimicOption::Whisper,
        }
    }
}

/// Which aspects of the target are copied. Everything is on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MimicConfig {
    pub figure: bool,
    pub motto: bool,
    pub action: bool,
    pub dance: bool,
    pub sign: bool,
    pub effect: bool,
    pub sit: bool,
    pub follow: bool,
    pub typing: bool,
    pub talk: bool,
    pub shout: bool,
    pub whisper: bool,
}

impl Default for MimicConfig {
    fn default() -> Self {
        Self::all(true)
    }
}

impl MimicConfig {
    /// Every option set to `enabled`.
    pub fn all(enabled: bool) -> Self {
        Self {
            figure: enabled,
            motto: enabled,
            action: enabled,
            dance: enabled,
            sign: enabled,
            effect: enabled,
            sit: enabled,
            follow: enabled,
            typing: enabled,
            talk: enabled,
            shout: enabled,
            whisper: enabled,
        }
    }

    pub fn is_enabled(&self, option: MimicOption) -> bool {
        match option {
            MimicOption::Figure => self.figure,
            MimicOption::Motto => self.motto,
            MimicOption::Action => self.action,
            MimicOption::Dance => self.dance,
            MimicOption::Sign => self.sign,
            MimicOption::Effect => self.effect,
            MimicOption::Sit => self.sit,
            MimicOption::Follow => self.follow,
            MimicOption::Typing => self.typing,
            MimicOption::Talk => self.talk,
            MimicOption::Shout => self.shout,
            MimicOption::Whisper => self.whisper,
        }
    }

    pub fn set(&mut self, option: MimicOption, enabled: bool) {
        let slot = match option {
            MimicOption::Figure => &mut self.figure,
            MimicOption::Motto => &mut self.motto,
            MimicOption::Action => &mut self.action,
            MimicOption::Dance => &mut self.dance,
            MimicOption::Sign => &mut self.sign,
            MimicOption::Effect => &mut self.effect,
            MimicOption::Sit => &mut self.sit,
            MimicOption::Follow => &mut self.follow,
            MimicOption::Typing => &mut self.typing,
            MimicOption::Talk => &mut self.talk,
            MimicOption::Shout => &mut self.shout,
            MimicOption::Whisper => &mut self.whisper,
        };
        *slot = enabled;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    id: Id,
    index: i32,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OriginalLook {
    figure: String,
    gender: Gender,
    motto: String,
}

#[derive(Debug, Default)]
struct Binding {
    state: MimicState,
    target: Option<Target>,
    original: Option<OriginalLook>,
    effect_macro: Option<&'static str>,
}

pub struct Mimic {
    base: ControllerBase<MimicState>,
    config: RwLock<MimicConfig>,
    binding: Mutex<Binding>,
}

impl Mimic {
    pub const NAME: &'static str = "mimic";

    /// Create the controller and register its handlers. It starts idle.
    pub fn new(
        interceptor: Interceptor,
        tracker: Arc<RoomTracker>,
        config: MimicConfig,
    ) -> Arc<Self> {
        let mimic = Arc::new(Self {
            base: ControllerBase::new(
                Self::NAME,
                interceptor,
                tracker,
                ControllerStatus::new(MimicState::Idle, "Stopped"),
            ),
            config: RwLock::new(config),
            binding: Mutex::new(Binding::default()),
        });
        mimic.arm();
        mimic
    }

    fn arm(self: &Arc<Self>) {
        let interceptor = self.base.interceptor().clone();

        let weak = Arc::downgrade(self);
        self.base
            .keep(interceptor.intercept_message::<SelectAvatarMsg, _>(move |_, click| {
                with(&weak, |m| m.on_avatar_selected(click.id));
            }));

        let weak = Arc::downgrade(self);
        self.base.keep(interceptor.intercept(Out::LOOK_TO, move |ctx| {
            with(&weak, |m| {
                if m.state() == MimicState::Selecting {
                    ctx.block();
                }
            });
        }));

        let weak = Arc::downgrade(self);
        self.base
            .keep(interceptor.intercept_message::<AvatarChatMsg, _>(move |_, chat| {
                with(&weak, |m| m.on_chat(chat));
            }));

        let weak = Arc::downgrade(self);
        self.base.keep(self.base.tracker().subscribe(move |event| {
            with(&weak, |m| m.on_event(event));
        }));
    }

    fn binding(&self) -> MutexGuard<'_, Binding> {
        self.binding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> MimicConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_config(&self, config: MimicConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn set_option(&self, option: MimicOption, enabled: bool) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(option, enabled);
    }

    /// Name of the avatar being mimicked.
    pub fn target_name(&self) -> Option<String> {
        self.binding().target.as_ref().map(|t| t.name.clone())
    }

    /// Wait for the user to click an avatar.
    pub fn start(&self) {
        let mut binding = self.binding();
        if binding.state != MimicState::Idle {
            return;
        }
        binding.state = MimicState::Selecting;
        debug!("Waiting for an avatar to be selected");
        self.base.publish(ControllerStatus::new(
            MimicState::Selecting,
            "Click on a user to mimic...",
        ));
    }

    pub fn stop(&self) {
        let mut binding = self.binding();
        self.deactivate(&mut binding, "Stopped");
    }

    pub fn toggle(&self) {
        if self.state() == MimicState::Idle {
            self.start();
        } else {
            self.stop();
        }
    }

    fn on_avatar_selected(&self, id: Id) {
        let mut binding = self.binding();
        if binding.state != MimicState::Selecting {
            return;
        }

        let tracker = self.base.tracker();
        let user = tracker.user();
        if user.as_ref().is_some_and(|u| u.id == id) {
            debug!(%id, "Ignoring selection of the local user");
            return;
        }
        if !tracker.in_room() {
            debug!(%id, "Selection outside a room");
            return;
        }
        let Some(target) = tracker.user_by_id(id) else {
            self.base.publish(ControllerStatus::new(
                MimicState::Selecting,
                format!("User not found (id={id})"),
            ));
            return;
        };

        binding.original = user.map(|u| OriginalLook {
            figure: u.figure,
            gender: u.gender,
            motto: u.motto,
        });
        binding.target = Some(Target {
            id: target.id,
            index: target.index,
            name: target.name.clone(),
        });
        binding.state = MimicState::Active;

        info!(target = %target.name, id = %target.id, "Mimicking avatar");
        self.base.publish(
            ControllerStatus::new(MimicState::Active, format!("Mimicking: {}", target.name))
                .with_target(target.name.clone(), target.figure.clone()),
        );
        self.copy_look(&self.config(), &target);
    }

    /// Leave any non-idle state, restoring the local user's look if it was changed.
    fn deactivate(&self, binding: &mut Binding, reason: &str) {
        if binding.state == MimicState::Idle {
            return;
        }

        let config = self.config();
        if binding.state == MimicState::Active && self.base.interceptor().is_attached() {
            if let Some(original) = binding.original.take() {
                if config.figure {
                    self.base.send(&UpdateAvatarMsg {
                        gender: original.gender,
                        figure: original.figure,
                    });
                }
                if config.motto {
                    self.base.send(&ChangeMottoMsg {
                        motto: original.motto,
                    });
                }
            }
        }

        *binding = Binding::default();
        info!(reason, "Mimic stopped");
        self.base
            .publish(ControllerStatus::new(MimicState::Idle, reason));
    }

    fn copy_look(&self, config: &MimicConfig, target: &Avatar) {
        if config.figure {
            self.base.send(&UpdateAvatarMsg {
                gender: target.gender(),
                figure: target.figure.clone(),
            });
        }
        if config.motto {
            self.base.send(&ChangeMottoMsg {
                motto: target.motto.clone(),
            });
        }
    }

    fn on_event(&self, event: &TrackerEvent) {
        let mut guard = self.binding();
        let binding = &mut *guard;
        match event {
            TrackerEvent::SessionEnded => self.deactivate(binding, "Disconnected"),
            TrackerEvent::RoomLeft | TrackerEvent::RoomEntered { .. } => {
                self.deactivate(binding, "Room changed")
            }
            TrackerEvent::AvatarRemoved(avatar) => {
                if bound_index(binding) == Some(avatar.index) {
                    self.deactivate(binding, "Target left the room");
                }
            }
            TrackerEvent::AvatarAdded(avatar) => {
                let Some(target) = binding.target.as_mut() else {
                    return;
                };
                if binding.state == MimicState::Active
                    && target.id == avatar.id
                    && avatar.is_user()
                {
                    target.index = avatar.index;
                    debug!(index = avatar.index, "Target re-entered");
                    self.copy_look(&self.config(), avatar);
                }
            }
            TrackerEvent::AvatarUpdated { avatar, change } => {
                if bound_index(binding) == Some(avatar.index) {
                    self.mirror(binding, avatar, *change);
                }
            }
            TrackerEvent::SessionEstablished(_) | TrackerEvent::ProfileUpdated(_) => {}
        }
    }

    fn mirror(&self, binding: &mut Binding, avatar: &Avatar, change: AvatarChange) {
        let config = self.config();
        match change {
            AvatarChange::Appearance => self.copy_look(&config, avatar),
            AvatarChange::Status => {
                if config.follow {
                    let at = avatar.location;
                    self.base.send(&LookToMsg { x: at.x, y: at.y });
                    if avatar.moving_to.is_some() {
                        self.base.send(&MoveAvatarMsg { x: at.x, y: at.y });
                    }
                }
                if config.sit {
                    self.base
                        .send(&ChangePostureMsg::sit(avatar.posture.is_sitting()));
                }
                if config.sign {
                    if let Some(sign) = avatar.sign {
                        self.base.send(&SignMsg { sign });
                    }
                }
            }
            AvatarChange::Action => {
                if config.action {
                    self.base.send(&ExpressionMsg {
                        action: avatar.action,
                    });
                }
            }
            AvatarChange::Dance => {
                if config.dance {
                    self.base.send(&DanceMsg {
                        dance: avatar.dance,
                    });
                }
            }
            AvatarChange::Effect => self.mirror_effect(binding, &config, avatar.effect),
            AvatarChange::Typing => {
                if config.typing {
                    self.base.send(&TypingMsg {
                        typing: avatar.is_typing,
                    });
                }
            }
        }
    }

    fn mirror_effect(&self, binding: &mut Binding, config: &MimicConfig, effect: i32) {
        if let Some(command) = effect_macro(effect) {
            binding.effect_macro = Some(command);
            self.base.send(&ChatMsg::talk(command));
            return;
        }

        let cleared = effect == 0 || effect == NO_EFFECT;
        if cleared {
            // Repeating the command turns the effect off again.
            if let Some(command) = binding.effect_macro.take() {
                self.base.send(&ChatMsg::talk(command));
            }
        }

        if config.effect {
            let effect = if cleared { NO_EFFECT } else { effect };
            self.base.send(&EffectActivatedMsg { effect });
            self.base.send(&EffectSelectedMsg { effect });
        }
    }

    fn on_chat(&self, chat: AvatarChatMsg) {
        let binding = self.binding();
        if binding.state != MimicState::Active {
            return;
        }
        let Some(target) = binding.target.as_ref() else {
            return;
        };
        if target.index != chat.index
            || !self
                .config()
                .is_enabled(MimicOption::for_chat(chat.chat_type))
        {
            return;
        }

        let message = match chat.chat_type {
            ChatType::Whisper => ChatMsg::whisper(&target.name, &chat.message, chat.bubble),
            chat_type => ChatMsg {
                chat_type,
                message: chat.message,
                bubble: chat.bubble,
            },
        };
        self.base.send(&message);
    }
}

fn with(weak: &Weak<Mimic>, f: impl FnOnce(&Mimic)) {
    if let Some(mimic) = weak.upgrade() {
        f(&mimic);
    }
}

fn bound_index(binding: &Binding) -> Option<i32> {
    match binding.state {
        MimicState::Active => binding.target.as_ref().map(|t| t.index),
        _ => None,
    }
}

impl Controller for Mimic {
    type State = MimicState;

    fn name(&self) -> &'static str {
        self.base.name()
    }

    fn state(&self) -> MimicState {
        self.binding().state
    }

    fn status(&self) -> watch::Receiver<ControllerStatus<MimicState>> {
        self.base.watch()
    }

    fn reset(&self) {
        self.stop();
    }
}

impl std::fmt::Debug for Mimic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mimic")
            .field("binding", &*self.binding())
            .field("config", &self.config())
            .finish()
    }
}
