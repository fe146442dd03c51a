//! # Session & Room State Tracker
//!
//! [`RoomTracker`] follows inbound traffic and keeps the local user's
//! profile, the current room and its avatars up to date. Every transition
//! raises one [`TrackerEvent`], delivered after the state it describes has
//! been written and the state lock released, so listeners may read the
//! tracker freely.
//!
//! Events reach synchronous listeners registered with
//! [`RoomTracker::subscribe`] and async consumers of [`RoomTracker::events`].
//!
//! Register the tracker before any controller that reads it: handlers run in
//! registration order, so the tracker has seen each frame by the time later
//! handlers do.

use crate::core::buffer::Id;
use crate::game::avatar::{Avatar, AvatarKind, Posture, UserData};
use crate::game::room::Room;
use crate::protocol::dispatcher::{Interceptor, Session, SessionEvent};
use crate::protocol::messages::{
    AvatarActionMsg, AvatarChangedMsg, AvatarDanceMsg, AvatarEffectMsg, AvatarInfo,
    AvatarRemovedMsg, AvatarStatusMsg, AvatarTypingMsg, AvatarsAddedMsg, RoomEnteredMsg,
    RoomLeftMsg, UserDataMsg,
};
use crate::utils::subscription::Subscription;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, trace};

/// Capacity of the async event channel. Slow consumers see `Lagged`.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Which part of an avatar changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarChange {
    /// Figure, gender or motto.
    Appearance,
    /// Position, posture, movement or sign.
    Status,
    Dance,
    Effect,
    Action,
    Typing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    SessionEstablished(Session),
    SessionEnded,
    ProfileUpdated(UserData),
    RoomEntered { id: Id, model: String },
    RoomLeft,
    AvatarAdded(Avatar),
    AvatarUpdated { avatar: Avatar, change: AvatarChange },
    AvatarRemoved(Avatar),
}

type Listener = Arc<dyn Fn(&TrackerEvent) + Send + Sync + 'static>;

#[derive(Debug, Default)]
struct Tracked {
    session: Option<Session>,
    user: Option<UserData>,
    room: Option<Room>,
}

struct Shared {
    state: RwLock<Tracked>,
    listeners: RwLock<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    events: broadcast::Sender<TrackerEvent>,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, Tracked> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tracked> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `update` under the state lock, then deliver what it produced.
    fn transition<F>(&self, update: F)
    where
        F: FnOnce(&mut Tracked, &mut Vec<TrackerEvent>),
    {
        let mut events = Vec::new();
        {
            let mut state = self.write();
            update(&mut state, &mut events);
        }
        for event in events {
            self.emit(event);
        }
    }

    fn emit(&self, event: TrackerEvent) {
        trace!(?event, "Tracker event");
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(&event);
        }
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn update_avatar<F>(&self, index: i32, change: AvatarChange, apply: F)
    where
        F: FnOnce(&mut Avatar),
    {
        self.transition(|state, events| {
            let Some(avatar) = state.room.as_mut().and_then(|r| r.get_mut(index)) else {
                trace!(index, ?change, "Update for unknown avatar");
                return;
            };
            apply(avatar);
            events.push(TrackerEvent::AvatarUpdated {
                avatar: avatar.clone(),
                change,
            });
        });
    }

    fn on_session(&self, event: &SessionEvent) {
        self.transition(|state, events| {
            *state = Tracked::default();
            match event {
                SessionEvent::Established(session) => {
                    state.session = Some(session.clone());
                    events.push(TrackerEvent::SessionEstablished(session.clone()));
                }
                SessionEvent::Ended => events.push(TrackerEvent::SessionEnded),
            }
        });
    }

    fn on_user_data(&self, msg: UserDataMsg) {
        self.transition(|state, events| {
            state.user = Some(msg.user.clone());
            events.push(TrackerEvent::ProfileUpdated(msg.user));
        });
    }

    fn on_room_entered(&self, msg: RoomEnteredMsg) {
        self.transition(|state, events| {
            state.room = Some(Room::new(msg.room_id, msg.model.clone()));
            debug!(room = %msg.room_id, model = %msg.model, "Entered room");
            events.push(TrackerEvent::RoomEntered {
                id: msg.room_id,
                model: msg.model,
            });
        });
    }

    fn on_room_left(&self) {
        self.transition(|state, events| {
            if let Some(room) = state.room.take() {
                debug!(room = %room.id, "Left room");
                events.push(TrackerEvent::RoomLeft);
            }
        });
    }

    fn on_avatars_added(&self, msg: AvatarsAddedMsg) {
        self.transition(|state, events| {
            let Some(room) = state.room.as_mut() else {
                debug!(count = msg.avatars.len(), "Avatars added outside a room");
                return;
            };
            for info in msg.avatars {
                let avatar = Avatar::from(info);
                if let Some(previous) = room.insert(avatar.clone()) {
                    if previous.id != avatar.id {
                        events.push(TrackerEvent::AvatarRemoved(previous));
                    }
                }
                events.push(TrackerEvent::AvatarAdded(avatar));
            }
        });
    }

    fn on_avatar_removed(&self, msg: AvatarRemovedMsg) {
        self.transition(|state, events| {
            if let Some(avatar) = state.room.as_mut().and_then(|r| r.remove(msg.index)) {
                events.push(TrackerEvent::AvatarRemoved(avatar));
            }
        });
    }

    fn on_avatar_status(&self, msg: AvatarStatusMsg) {
        for update in msg.updates {
            self.update_avatar(update.index, AvatarChange::Status, |avatar| {
                avatar.location = update.location;
                avatar.head_direction = update.head_direction;
                avatar.direction = update.direction;
                avatar.posture = update.posture;
                avatar.moving_to = update.moving_to;
                avatar.sign = update.sign;
            });
        }
    }

    fn on_avatar_changed(&self, msg: AvatarChangedMsg) {
        self.transition(|state, events| {
            let own_id = state.user.as_ref().map(|u| u.id);
            let mut changed_id = None;

            if let Some(avatar) = state.room.as_mut().and_then(|r| r.get_mut(msg.index)) {
                avatar.figure = msg.figure.clone();
                avatar.motto = msg.motto.clone();
                if let AvatarKind::User {
                    gender,
                    achievement_score,
                } = &mut avatar.kind
                {
                    *gender = msg.gender;
                    *achievement_score = msg.achievement_score;
                }
                changed_id = Some(avatar.id);
                events.push(TrackerEvent::AvatarUpdated {
                    avatar: avatar.clone(),
                    change: AvatarChange::Appearance,
                });
            }

            // Index -1 addresses the local user.
            let is_self = msg.index == -1 || (changed_id.is_some() && changed_id == own_id);
            if is_self {
                if let Some(user) = state.user.as_mut() {
                    user.figure = msg.figure;
                    user.gender = msg.gender;
                    user.motto = msg.motto;
                    events.push(TrackerEvent::ProfileUpdated(user.clone()));
                }
            }
        });
    }
}

impl From<AvatarInfo> for Avatar {
    fn from(info: AvatarInfo) -> Self {
        Avatar {
            id: info.id,
            index: info.index,
            name: info.name,
            motto: info.motto,
            figure: info.figure,
            kind: info.kind,
            location: info.location,
            direction: info.direction,
            head_direction: info.direction,
            posture: Posture::Stand,
            moving_to: None,
            sign: None,
            dance: 0,
            effect: 0,
            action: 0,
            is_typing: false,
        }
    }
}

/// Tracks the session, profile and current room from intercepted traffic.
pub struct RoomTracker {
    shared: Arc<Shared>,
    _subscriptions: Vec<Subscription>,
}

impl RoomTracker {
    /// Create a tracker fed by `interceptor`.
    pub fn new(interceptor: &Interceptor) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            state: RwLock::new(Tracked::default()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            events,
        });

        let s = shared.clone();
        let mut subscriptions = vec![interceptor.on_session(move |e| s.on_session(e))];

        macro_rules! track {
            ($msg:ty, $method:ident) => {{
                let s = shared.clone();
                subscriptions.push(interceptor.intercept_message::<$msg, _>(move |_, m| s.$method(m)));
            }};
        }

        track!(UserDataMsg, on_user_data);
        track!(RoomEnteredMsg, on_room_entered);
        track!(AvatarsAddedMsg, on_avatars_added);
        track!(AvatarRemovedMsg, on_avatar_removed);
        track!(AvatarStatusMsg, on_avatar_status);
        track!(AvatarChangedMsg, on_avatar_changed);

        let s = shared.clone();
        subscriptions.push(
            interceptor.intercept_message::<RoomLeftMsg, _>(move |_, _| s.on_room_left()),
        );

        let s = shared.clone();
        subscriptions.push(interceptor.intercept_message::<AvatarActionMsg, _>(move |_, m| {
            s.update_avatar(m.index, AvatarChange::Action, |a| a.action = m.action)
        }));
        let s = shared.clone();
        subscriptions.push(interceptor.intercept_message::<AvatarDanceMsg, _>(move |_, m| {
            s.update_avatar(m.index, AvatarChange::Dance, |a| a.dance = m.dance)
        }));
        let s = shared.clone();
        subscriptions.push(interceptor.intercept_message::<AvatarEffectMsg, _>(move |_, m| {
            s.update_avatar(m.index, AvatarChange::Effect, |a| a.effect = m.effect)
        }));
        let s = shared.clone();
        subscriptions.push(interceptor.intercept_message::<AvatarTypingMsg, _>(move |_, m| {
            s.update_avatar(m.index, AvatarChange::Typing, |a| a.is_typing = m.typing)
        }));

        // Pick up a session that was attached before the tracker existed.
        if let Some(session) = interceptor.session() {
            shared.write().session = Some(session);
        }

        Self {
            shared,
            _subscriptions: subscriptions,
        }
    }

    /// Call `listener` for every event until the returned guard is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&TrackerEvent) + Send + Sync + 'static,
    {
        let id = self.shared.next_listener.fetch_add(1, Ordering::Relaxed);
        self.shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        let weak = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared
                    .listeners
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Stream of events raised from now on.
    pub fn events(&self) -> BroadcastStream<TrackerEvent> {
        BroadcastStream::new(self.shared.events.subscribe())
    }

    pub fn session(&self) -> Option<Session> {
        self.shared.read().session.clone()
    }

    /// The local user's profile.
    pub fn user(&self) -> Option<UserData> {
        self.shared.read().user.clone()
    }

    pub fn in_room(&self) -> bool {
        self.shared.read().room.is_some()
    }

    /// A copy of the current room.
    pub fn room(&self) -> Option<Room> {
        self.shared.read().room.clone()
    }

    /// Run `f` against the current room without copying it.
    pub fn with_room<R>(&self, f: impl FnOnce(&Room) -> R) -> Option<R> {
        self.shared.read().room.as_ref().map(f)
    }

    pub fn avatar_by_index(&self, index: i32) -> Option<Avatar> {
        self.with_room(|r| r.get_by_index(index).cloned()).flatten()
    }

    pub fn avatar_by_id(&self, id: Id) -> Option<Avatar> {
        self.with_room(|r| r.get_by_id(id).cloned()).flatten()
    }

    pub fn user_by_id(&self, id: Id) -> Option<Avatar> {
        self.with_room(|r| r.get_user_by_id(id).cloned()).flatten()
    }

    pub fn avatar_by_name(&self, name: &str) -> Option<Avatar> {
        self.with_room(|r| r.get_by_name(name).cloned()).flatten()
    }
}

impl std::fmt::Debug for RoomTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.read();
        f.debug_struct("RoomTracker")
            .field("session", &state.session)
            .field("room", &state.room.as_ref().map(|r| r.id))
            .field("avatars", &state.room.as_ref().map_or(0, Room::len))
            .finish()
    }
}
