//! # Behavior Controllers
//!
//! A controller reacts to intercepted traffic and tracked state by issuing
//! outbound commands. Each one owns a small state machine, keeps its
//! registrations alive through [`Subscription`] guards and publishes a
//! [`ControllerStatus`] for whatever presents it.
//!
//! Controllers never raise on a failed action. They log it and report a
//! status message instead.

use crate::game::tracker::RoomTracker;
use crate::protocol::dispatcher::Interceptor;
use crate::protocol::message::Message;
use crate::utils::subscription::Subscription;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::warn;

/// What a controller shows to its user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatus<S> {
    pub state: S,
    pub target_name: Option<String>,
    pub target_figure: Option<String>,
    pub message: String,
}

impl<S> ControllerStatus<S> {
    pub fn new(state: S, message: impl Into<String>) -> Self {
        Self {
            state,
            target_name: None,
            target_figure: None,
            message: message.into(),
        }
    }

    pub fn with_target(mut self, name: impl Into<String>, figure: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self.target_figure = Some(figure.into());
        self
    }
}

pub trait Controller: Send + Sync {
    type State: Copy + fmt::Debug + PartialEq + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    fn state(&self) -> Self::State;

    /// Receiver for status changes. Starts with the current status.
    fn status(&self) -> watch::Receiver<ControllerStatus<Self::State>>;

    /// Return to the initial state, undoing any effect on the local user.
    fn reset(&self);
}

/// Plumbing shared by controllers: the pipeline, the tracker, registration
/// guards and the status channel.
pub struct ControllerBase<S> {
    name: &'static str,
    interceptor: Interceptor,
    tracker: Arc<RoomTracker>,
    subscriptions: Mutex<Vec<Subscription>>,
    status: watch::Sender<ControllerStatus<S>>,
}

impl<S> ControllerBase<S>
where
    S: Copy + fmt::Debug + PartialEq + Send + Sync + 'static,
{
    pub fn new(
        name: &'static str,
        interceptor: Interceptor,
        tracker: Arc<RoomTracker>,
        initial: ControllerStatus<S>,
    ) -> Self {
        let (status, _) = watch::channel(initial);
        Self {
            name,
            interceptor,
            tracker,
            subscriptions: Mutex::new(Vec::new()),
            status,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    pub fn tracker(&self) -> &RoomTracker {
        &self.tracker
    }

    /// Keep `subscription` alive for the controller's lifetime.
    pub fn keep(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscription);
    }

    /// Drop every registration this controller holds.
    pub fn release(&self) {
        let released: Vec<_> = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        drop(released);
    }

    /// Send `message`, logging instead of failing. Returns whether it was queued.
    pub fn send<M: Message>(&self, message: &M) -> bool {
        match self.interceptor.send(message) {
            Ok(()) => true,
            Err(e) => {
                warn!(controller = self.name, error = %e, "Failed to send command");
                false
            }
        }
    }

    pub fn publish(&self, status: ControllerStatus<S>) {
        self.status.send_replace(status);
    }

    pub fn current(&self) -> ControllerStatus<S> {
        self.status.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ControllerStatus<S>> {
        self.status.subscribe()
    }
}

impl<S> fmt::Debug for ControllerBase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBase")
            .field("name", &self.name)
            .finish()
    }
}
