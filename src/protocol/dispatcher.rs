//! # Interception Pipeline
//!
//! The [`Interceptor`] sits between the transport and everything that reacts
//! to traffic. The transport feeds it every frame through
//! [`Interceptor::dispatch`]; the interceptor classifies the opcode with the
//! session's dialect, runs the matching handlers in registration order and
//! returns the frame to relay, or `None` if a handler blocked it.
//!
//! Handlers are synchronous and run on the connection's frame loop. They may
//! decode the frame lazily, rewrite its payload, block it, or queue new
//! frames with [`Interceptor::send`]. Frames queued this way are written by
//! the transport and are not dispatched again.
//!
//! ## Example
//! ```rust
//! use room_intercept::protocol::dialect::DialectRegistry;
//! use room_intercept::protocol::dispatcher::Interceptor;
//! use room_intercept::protocol::messages::LookToMsg;
//!
//! let interceptor = Interceptor::new(DialectRegistry::builtin());
//! let _sub = interceptor.intercept_message::<LookToMsg, _>(|ctx, look| {
//!     if look.x < 0 {
//!         ctx.block();
//!     }
//! });
//! ```

use crate::core::buffer::{PacketReader, PacketWriter, Value};
use crate::core::frame::{RawFrame, Relay};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::client::{ClientSet, ClientType};
use crate::protocol::correlator::Correlator;
use crate::protocol::dialect::DialectRegistry;
use crate::protocol::identifier::{Direction, Identifier};
use crate::protocol::message::{self, Message, Packet};
use crate::utils::metrics::Metrics;
use crate::utils::subscription::Subscription;
use crate::utils::timeout::RESPONSE_TIMEOUT;
use bytes::Bytes;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace, warn};

type FrameHandler = Arc<dyn Fn(&mut Intercept<'_>) + Send + Sync + 'static>;
type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync + 'static>;

/// The connection a frame stream belongs to. Fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub client: ClientType,
    pub version: String,
}

impl Session {
    pub fn new(client: ClientType, version: impl Into<String>) -> Self {
        Self {
            client,
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Established(Session),
    Ended,
}

/// A frame being dispatched, as seen by one handler.
pub struct Intercept<'a> {
    client: ClientType,
    direction: Direction,
    identifier: Option<Identifier>,
    frame: &'a mut RawFrame,
    blocked: bool,
    metrics: &'a Metrics,
}

impl<'a> Intercept<'a> {
    pub fn client(&self) -> ClientType {
        self.client
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// `None` when the opcode is not in the session's dialect.
    pub fn identifier(&self) -> Option<Identifier> {
        self.identifier
    }

    pub fn opcode(&self) -> u16 {
        self.frame.opcode
    }

    pub fn payload(&self) -> &Bytes {
        &self.frame.payload
    }

    /// A reader over the current payload.
    pub fn reader(&self) -> PacketReader<'_> {
        let reader = PacketReader::new(self.client, &self.frame.payload);
        match self.identifier {
            Some(identifier) => reader.with_identifier(identifier),
            None => reader,
        }
    }

    /// Decode the current payload as `M`. Earlier rewrites are visible.
    pub fn parse<M: Message>(&self) -> Result<M> {
        let identifier = self
            .identifier
            .ok_or_else(|| ProtocolError::InvalidFrame("frame is not classified".to_string()))?;
        if !M::is_carried_by(identifier) {
            return Err(ProtocolError::InvalidFrame(format!(
                "{identifier} does not carry the requested message"
            )));
        }
        message::decode::<M>(self.client, identifier, &self.frame.payload)
    }

    /// Replace the payload with raw bytes.
    pub fn set_payload(&mut self, payload: impl Into<Bytes>) {
        self.frame.payload = payload.into();
    }

    /// Replace the payload with the encoding of `message`.
    pub fn replace<M: Message>(&mut self, message: &M) -> Result<()> {
        self.frame.payload = message::encode(message, self.client)?;
        Ok(())
    }

    /// Stop the frame from being relayed. Later handlers still see it.
    pub fn block(&mut self) {
        self.blocked = true;
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }
}

#[derive(Debug, Clone)]
enum Route {
    Identifiers(Vec<Identifier>),
    Unclassified(Direction),
}

impl Route {
    fn matches(&self, direction: Direction, identifier: Option<Identifier>) -> bool {
        match (self, identifier) {
            (Route::Identifiers(ids), Some(identifier)) => ids.contains(&identifier),
            (Route::Unclassified(d), None) => *d == direction,
            _ => false,
        }
    }
}

struct HandlerEntry {
    id: u64,
    route: Route,
    clients: ClientSet,
    handler: FrameHandler,
}

struct Attached {
    session: Session,
    relay_tx: mpsc::UnboundedSender<Relay>,
}

struct Inner {
    registry: DialectRegistry,
    attached: RwLock<Option<Attached>>,
    handlers: RwLock<Vec<HandlerEntry>>,
    listeners: RwLock<Vec<(u64, SessionListener)>>,
    next_id: AtomicU64,
    correlator: Correlator,
    metrics: Metrics,
    default_timeout: Duration,
}

/// Shared handle to the interception pipeline. Cloning is cheap.
#[derive(Clone)]
pub struct Interceptor {
    inner: Arc<Inner>,
}

impl Interceptor {
    pub fn new(registry: DialectRegistry) -> Self {
        Self::with_timeout(registry, RESPONSE_TIMEOUT)
    }

    /// Create an interceptor whose correlated waits default to `default_timeout`.
    pub fn with_timeout(registry: DialectRegistry, default_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                attached: RwLock::new(None),
                handlers: RwLock::new(Vec::new()),
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                correlator: Correlator::new(),
                metrics: Metrics::new(),
                default_timeout,
            }),
        }
    }

    pub fn registry(&self) -> &DialectRegistry {
        &self.inner.registry
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    /// The attached session, if any.
    pub fn session(&self) -> Option<Session> {
        self.inner
            .attached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|a| a.session.clone())
    }

    pub fn client(&self) -> Option<ClientType> {
        self.inner
            .attached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|a| a.session.client)
    }

    pub fn is_attached(&self) -> bool {
        self.client().is_some()
    }

    /// Attach a new connection. Returns the queue of frames the transport
    /// must write on behalf of handlers and senders.
    pub fn attach(&self, session: Session) -> mpsc::UnboundedReceiver<Relay> {
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        {
            let mut attached = self
                .inner
                .attached
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if attached.is_some() {
                warn!("Replacing an attached session");
            }
            *attached = Some(Attached {
                session: session.clone(),
                relay_tx,
            });
        }

        self.inner.metrics.session_attached();
        info!(client = %session.client, version = %session.version, "Session established");
        self.notify(&SessionEvent::Established(session));
        relay_rx
    }

    /// Mark the connection closed. Pending correlated waits resolve as timed out.
    pub fn detach(&self) {
        let previous = self
            .inner
            .attached
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_none() {
            return;
        }

        let cancelled = self.inner.correlator.cancel_all();
        info!(cancelled_waits = cancelled, "Session ended");
        self.notify(&SessionEvent::Ended);
    }

    fn notify(&self, event: &SessionEvent) {
        let listeners: Vec<SessionListener> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Observe session attach and detach.
    pub fn on_session<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(lid, _)| *lid != id);
            }
        })
    }

    fn register(&self, route: Route, clients: ClientSet, handler: FrameHandler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(handler = id, ?route, clients = ?clients, "Registering handler");
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(HandlerEntry {
                id,
                route,
                clients,
                handler,
            });

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .handlers
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|entry| entry.id != id);
            }
        })
    }

    /// Run `handler` for every frame classified as `identifier`.
    pub fn intercept<F>(&self, identifier: Identifier, handler: F) -> Subscription
    where
        F: Fn(&mut Intercept<'_>) + Send + Sync + 'static,
    {
        self.intercept_for(identifier, ClientSet::ALL, handler)
    }

    /// Like [`intercept`](Self::intercept), limited to the clients in `clients`.
    pub fn intercept_for<F>(&self, identifier: Identifier, clients: ClientSet, handler: F) -> Subscription
    where
        F: Fn(&mut Intercept<'_>) + Send + Sync + 'static,
    {
        self.register(
            Route::Identifiers(vec![identifier]),
            clients,
            Arc::new(handler),
        )
    }

    /// Run `handler` with a decoded `M` for every frame carrying it.
    ///
    /// Never invoked on clients `M` does not support. Frames that fail to
    /// decode are logged and still relayed.
    pub fn intercept_message<M, F>(&self, handler: F) -> Subscription
    where
        M: Message,
        F: Fn(&mut Intercept<'_>, M) + Send + Sync + 'static,
    {
        let typed = move |ctx: &mut Intercept<'_>| match ctx.parse::<M>() {
            Ok(message) => handler(ctx, message),
            Err(e) => {
                ctx.metrics.decode_failure();
                warn!(
                    identifier = ?ctx.identifier,
                    client = %ctx.client,
                    error = %e,
                    "Failed to decode intercepted frame"
                );
            }
        };
        self.register(
            Route::Identifiers(M::IDENTIFIERS.to_vec()),
            M::SUPPORTED_CLIENTS,
            Arc::new(typed),
        )
    }

    /// Run `handler` for frames in `direction` whose opcode is unknown to the dialect.
    pub fn intercept_unclassified<F>(&self, direction: Direction, handler: F) -> Subscription
    where
        F: Fn(&mut Intercept<'_>) + Send + Sync + 'static,
    {
        self.register(Route::Unclassified(direction), ClientSet::ALL, Arc::new(handler))
    }

    /// Number of registered frame handlers.
    pub fn handler_count(&self) -> usize {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run one frame through the pipeline.
    ///
    /// Returns the frame to relay, with any rewrites applied, or `None` if a
    /// handler blocked it. Without an attached session frames pass through.
    pub fn dispatch(&self, direction: Direction, mut frame: RawFrame) -> Option<RawFrame> {
        let inner = &self.inner;
        inner
            .metrics
            .frame_received(direction, frame.wire_len() as u64);

        let Some(client) = self.client() else {
            inner.metrics.frame_relayed();
            return Some(frame);
        };

        let identifier = inner
            .registry
            .identifier_of(direction, frame.opcode, client);
        if identifier.is_none() {
            inner.metrics.frame_unclassified();
            trace!(%direction, opcode = frame.opcode, "Unclassified frame");
        }

        // Handlers may register or unregister while running.
        let handlers: Vec<FrameHandler> = inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.clients.contains(client) && e.route.matches(direction, identifier))
            .map(|e| e.handler.clone())
            .collect();

        let mut ctx = Intercept {
            client,
            direction,
            identifier,
            frame: &mut frame,
            blocked: false,
            metrics: &inner.metrics,
        };
        for handler in &handlers {
            inner.metrics.handler_invoked();
            handler(&mut ctx);
        }
        let blocked = ctx.blocked;

        if let Some(identifier) = identifier {
            inner
                .correlator
                .fulfill(&Packet::new(client, identifier, frame.payload.clone()));
        }

        if blocked {
            inner.metrics.frame_blocked();
            debug!(%direction, identifier = ?identifier, "Frame blocked");
            None
        } else {
            inner.metrics.frame_relayed();
            Some(frame)
        }
    }

    fn relay_handle(&self) -> Result<(ClientType, mpsc::UnboundedSender<Relay>)> {
        let attached = self
            .inner
            .attached
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match attached.as_ref() {
            Some(a) => Ok((a.session.client, a.relay_tx.clone())),
            None => {
                debug!("{}", constants::ERR_NO_SESSION);
                Err(ProtocolError::ConnectionClosed)
            }
        }
    }

    fn resolve(&self, identifier: Identifier, client: ClientType) -> Result<u16> {
        self.inner
            .registry
            .resolve(identifier, client)
            .ok_or(ProtocolError::NotSupportedByRegistry { identifier, client })
    }

    /// Queue a raw frame. `Outgoing` goes to the server, `Incoming` to the client.
    pub fn send_raw(&self, direction: Direction, frame: RawFrame) -> Result<()> {
        let (_, relay_tx) = self.relay_handle()?;
        relay_tx
            .send(Relay { direction, frame })
            .map_err(|_| ProtocolError::ConnectionClosed)?;
        self.inner.metrics.frame_injected();
        Ok(())
    }

    /// Compose and queue `message` toward the side its identifier names.
    pub fn send<M: Message>(&self, message: &M) -> Result<()> {
        let (client, _) = self.relay_handle()?;
        let identifier = message.identifier();
        let opcode = self.resolve(identifier, client)?;
        let payload = message::encode(message, client)?;
        trace!(%identifier, opcode, "Sending message");
        self.send_raw(identifier.direction, RawFrame::new(opcode, payload))
    }

    /// Compose a frame for `identifier` from loose values.
    pub fn send_values(&self, identifier: Identifier, values: &[Value]) -> Result<()> {
        let (client, _) = self.relay_handle()?;
        let opcode = self.resolve(identifier, client)?;
        let mut writer = PacketWriter::new(client);
        for value in values {
            writer.write_value(value);
        }
        self.send_raw(identifier.direction, RawFrame::new(opcode, writer.into_bytes()))
    }

    /// Send `message` and wait for the next frame classified as `expect`.
    #[instrument(skip(self, message, timeout))]
    pub async fn send_and_await<M: Message>(
        &self,
        message: &M,
        expect: Identifier,
        timeout: Duration,
    ) -> Result<Packet> {
        let (client, _) = self.relay_handle()?;
        self.resolve(expect, client)?;

        let correlator = &self.inner.correlator;
        let (ticket, rx) = correlator.register(expect);
        if let Err(e) = self.send(message) {
            correlator.cancel(&ticket);
            return Err(e);
        }
        self.finish_wait(correlator.wait(ticket, rx, timeout).await)
    }

    /// Send `message` and decode the reply as `R`.
    pub async fn request<M: Message, R: Message>(&self, message: &M, timeout: Duration) -> Result<R> {
        let packet = self
            .send_and_await(message, R::IDENTIFIERS[0], timeout)
            .await?;
        packet.parse::<R>()
    }

    /// Wait for the next `R` without sending anything.
    #[instrument(skip(self))]
    pub async fn receive<R: Message>(&self, timeout: Duration) -> Result<R> {
        let (client, _) = self.relay_handle()?;
        message::ensure_supported::<R>(client)?;
        let expect = R::IDENTIFIERS[0];
        self.resolve(expect, client)?;

        let correlator = &self.inner.correlator;
        let (ticket, rx) = correlator.register(expect);
        let packet = self.finish_wait(correlator.wait(ticket, rx, timeout).await)?;
        packet.parse::<R>()
    }

    fn finish_wait(&self, result: Result<Packet>) -> Result<Packet> {
        match &result {
            Ok(_) => self.inner.metrics.reply_fulfilled(),
            Err(ProtocolError::TimedOut) => {
                self.inner.metrics.reply_timed_out();
                debug!("Correlated wait timed out");
            }
            Err(_) => {}
        }
        result
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("session", &self.session())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::protocol::identifier::{In, Out};
    use crate::protocol::messages::{EffectActivatedMsg, LookToMsg};
    use std::sync::Mutex;

    fn attached(client: ClientType) -> (Interceptor, mpsc::UnboundedReceiver<Relay>) {
        let interceptor = Interceptor::new(DialectRegistry::builtin());
        let rx = interceptor.attach(Session::new(client, "test"));
        (interceptor, rx)
    }

    fn look_frame(interceptor: &Interceptor, x: i32, y: i32) -> RawFrame {
        let client = interceptor.client().unwrap();
        let opcode = interceptor.registry().resolve(Out::LOOK_TO, client).unwrap();
        RawFrame::new(opcode, message::encode(&LookToMsg { x, y }, client).unwrap())
    }

    #[test]
    fn test_without_session_frames_pass_through() {
        let interceptor = Interceptor::new(DialectRegistry::builtin());
        let frame = RawFrame::new(1, vec![1, 2, 3]);
        assert_eq!(interceptor.dispatch(Direction::Incoming, frame.clone()), Some(frame));
    }

    #[test]
    fn test_rewrite_is_visible_to_later_handlers_and_relayed() {
        let (interceptor, _rx) = attached(ClientType::Flash);
        let seen = Arc::new(Mutex::new(None));

        let _a = interceptor.intercept_message::<LookToMsg, _>(|ctx, _| {
            ctx.replace(&LookToMsg { x: 1, y: 1 }).unwrap();
        });
        let s = seen.clone();
        let _b = interceptor.intercept_message::<LookToMsg, _>(move |_, look| {
            *s.lock().unwrap() = Some(look);
        });

        let relayed = interceptor
            .dispatch(Direction::Outgoing, look_frame(&interceptor, 5, 6))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(LookToMsg { x: 1, y: 1 }));
        assert_eq!(relayed, look_frame(&interceptor, 1, 1));
    }

    #[test]
    fn test_handlers_outside_their_client_set_are_never_invoked() {
        let (interceptor, _rx) = attached(ClientType::Shockwave);
        let calls = Arc::new(AtomicU64::new(0));
        let c = calls.clone();
        let _sub = interceptor.intercept_for(Out::LOOK_TO, ClientSet::MODERN, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let relayed = interceptor.dispatch(Direction::Outgoing, look_frame(&interceptor, 1, 2));
        assert!(relayed.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_send_rejects_unsupported_and_unattached() {
        let interceptor = Interceptor::new(DialectRegistry::builtin());
        assert!(matches!(
            interceptor.send(&LookToMsg { x: 0, y: 0 }),
            Err(ProtocolError::ConnectionClosed)
        ));

        let _rx = interceptor.attach(Session::new(ClientType::Shockwave, "r35"));
        assert!(matches!(
            interceptor.send(&EffectActivatedMsg { effect: 1 }),
            Err(ProtocolError::UnsupportedVariant { .. })
        ));
    }

    #[test]
    fn test_send_routes_by_direction() {
        let (interceptor, mut rx) = attached(ClientType::Unity);
        interceptor.send(&LookToMsg { x: 2, y: 3 }).unwrap();
        interceptor
            .send_values(In::DANCE, &[Value::Int(0), Value::Int(2)])
            .unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.direction, Direction::Outgoing);
        assert_eq!(first.frame, look_frame(&interceptor, 2, 3));

        let second = rx.try_recv().unwrap();
        assert_eq!(second.direction, Direction::Incoming);
        assert_eq!(second.frame.payload.len(), 8);
        assert_eq!(interceptor.metrics().snapshot().frames_injected, 2);
    }

    #[test]
    fn test_dropping_subscription_unregisters() {
        let (interceptor, _rx) = attached(ClientType::Flash);
        let sub = interceptor.intercept(Out::LOOK_TO, |ctx| ctx.block());
        assert_eq!(interceptor.handler_count(), 1);
        assert!(interceptor
            .dispatch(Direction::Outgoing, look_frame(&interceptor, 0, 0))
            .is_none());

        drop(sub);
        assert_eq!(interceptor.handler_count(), 0);
        assert!(interceptor
            .dispatch(Direction::Outgoing, look_frame(&interceptor, 0, 0))
            .is_some());
    }

    #[test]
    fn test_session_listeners_see_attach_and_detach() {
        let interceptor = Interceptor::new(DialectRegistry::builtin());
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = events.clone();
        let _sub = interceptor.on_session(move |event| e.lock().unwrap().push(event.clone()));

        let _rx = interceptor.attach(Session::new(ClientType::Flash, "v1"));
        interceptor.detach();
        interceptor.detach();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                SessionEvent::Established(Session::new(ClientType::Flash, "v1")),
                SessionEvent::Ended
            ]
        );
    }
}
