//! # Request/Response Correlation
//!
//! Pairs an outbound request with the next frame carrying an expected
//! identifier. A waiter is registered before the request is sent, so a reply
//! that arrives immediately cannot be missed.
//!
//! Every waiter pending on an identifier when a matching frame is classified
//! is resolved by that frame, in the order the waiters registered. A wait
//! resolves exactly once: either the frame wins and the caller gets the
//! packet, or the deadline wins and the waiter is removed before anything is
//! delivered.

use crate::error::{ProtocolError, Result};
use crate::protocol::identifier::Identifier;
use crate::protocol::message::Packet;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Handle for one registered wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    identifier: Identifier,
    id: u64,
}

impl Ticket {
    pub fn identifier(&self) -> Identifier {
        self.identifier
    }
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Packet>,
}

#[derive(Default)]
pub struct Correlator {
    waiters: Mutex<HashMap<Identifier, VecDeque<Waiter>>>,
    next_id: AtomicU64,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Identifier, VecDeque<Waiter>>> {
        // The map holds no invariants a panicking holder could break.
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register interest in the next frame carrying `identifier`.
    pub fn register(&self, identifier: Identifier) -> (Ticket, oneshot::Receiver<Packet>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock()
            .entry(identifier)
            .or_default()
            .push_back(Waiter { id, tx });
        (Ticket { identifier, id }, rx)
    }

    /// Deliver `packet` to every waiter pending on its identifier.
    ///
    /// Returns the number of waiters that received it.
    pub fn fulfill(&self, packet: &Packet) -> usize {
        let pending = match self.lock().remove(&packet.identifier) {
            Some(pending) => pending,
            None => return 0,
        };

        let mut delivered = 0;
        for waiter in pending {
            if waiter.tx.send(packet.clone()).is_ok() {
                delivered += 1;
            }
        }
        debug!(identifier = %packet.identifier, delivered, "Correlated reply");
        delivered
    }

    /// Remove a waiter that has not been resolved yet.
    ///
    /// Returns `false` when the waiter was already taken by [`fulfill`](Self::fulfill).
    pub fn cancel(&self, ticket: &Ticket) -> bool {
        let mut waiters = self.lock();
        let Some(queue) = waiters.get_mut(&ticket.identifier) else {
            return false;
        };
        let before = queue.len();
        queue.retain(|w| w.id != ticket.id);
        let removed = queue.len() != before;
        if queue.is_empty() {
            waiters.remove(&ticket.identifier);
        }
        removed
    }

    /// Drop every pending waiter. Their callers resolve as timed out.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        drained.iter().map(|(_, queue)| queue.len()).sum()
    }

    /// Number of waiters still pending.
    pub fn pending(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    /// Wait for the reply registered under `ticket`, up to `timeout`.
    pub async fn wait(
        &self,
        ticket: Ticket,
        mut rx: oneshot::Receiver<Packet>,
        timeout: Duration,
    ) -> Result<Packet> {
        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(packet)) => Ok(packet),
            // Sender dropped: the connection closed or the waiter was cancelled.
            Ok(Err(_)) => Err(ProtocolError::TimedOut),
            Err(_) => {
                if self.cancel(&ticket) {
                    return Err(ProtocolError::TimedOut);
                }
                // A frame took the waiter while the deadline fired.
                rx.await.map_err(|_| ProtocolError::TimedOut)
            }
        }
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::protocol::client::ClientType;
    use crate::protocol::identifier::In;
    use bytes::Bytes;

    fn packet(identifier: Identifier, byte: u8) -> Packet {
        Packet::new(ClientType::Flash, identifier, Bytes::from(vec![byte]))
    }

    #[tokio::test]
    async fn test_fulfill_reaches_all_pending_waiters_in_order() {
        let correlator = Correlator::new();
        let (t1, rx1) = correlator.register(In::WARDROBE);
        let (t2, rx2) = correlator.register(In::WARDROBE);
        assert_eq!(correlator.pending(), 2);

        assert_eq!(correlator.fulfill(&packet(In::WARDROBE, 7)), 2);
        assert_eq!(correlator.pending(), 0);

        let p1 = correlator.wait(t1, rx1, Duration::from_millis(50)).await.unwrap();
        let p2 = correlator.wait(t2, rx2, Duration::from_millis(50)).await.unwrap();
        assert_eq!(p1.payload.as_ref(), &[7]);
        assert_eq!(p2.payload.as_ref(), &[7]);
    }

    #[tokio::test]
    async fn test_other_identifiers_do_not_resolve() {
        let correlator = Correlator::new();
        let (ticket, rx) = correlator.register(In::WARDROBE);
        assert_eq!(correlator.fulfill(&packet(In::CHAT, 1)), 0);

        let result = correlator.wait(ticket, rx, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(ProtocolError::TimedOut)));
        assert_eq!(correlator.pending(), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_fulfill_reports_false() {
        let correlator = Correlator::new();
        let (ticket, _rx) = correlator.register(In::WARDROBE);
        correlator.fulfill(&packet(In::WARDROBE, 1));
        assert!(!correlator.cancel(&ticket));
    }

    #[tokio::test]
    async fn test_cancel_all_resolves_as_timed_out() {
        let correlator = Correlator::new();
        let (ticket, rx) = correlator.register(In::USERS);
        assert_eq!(correlator.cancel_all(), 1);
        let result = correlator.wait(ticket, rx, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ProtocolError::TimedOut)));
    }
}
