//! Live-tail fan-out
//!
//! Each subscriber owns its own queue. Publishing never blocks: a full or
//! closed subscriber queue is skipped and counted, and the remaining
//! subscribers still receive the entry.
//!
//! # Example
//!
//! ```
//! use diag_log_store::{Broadcaster, LogEntry, LogKind, LogLevel, SubscriberQueue};
//! use std::sync::Arc;
//!
//! let broadcaster = Broadcaster::new(SubscriberQueue::Unbounded);
//! let subscription = broadcaster.subscribe();
//!
//! broadcaster.publish(&Arc::new(LogEntry::new(LogLevel::Info, LogKind::Http, "GET /")));
//! assert_eq!(subscription.try_recv().unwrap().category(), "GET /");
//!
//! broadcaster.unsubscribe(subscription.id());
//! assert!(subscription.recv().is_none());
//! ```

use super::log_entry::LogEntry;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identifier handed out by [`Broadcaster::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Queue discipline for each subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SubscriberQueue {
    /// No limit; a subscriber that never drains grows without bound
    #[default]
    Unbounded,

    /// At most `capacity` pending entries; overflow is dropped and counted
    /// in [`Subscription::missed`]
    Bounded {
        #[serde(rename = "Capacity")]
        capacity: usize,
    },
}

struct SubscriberSlot {
    sender: Sender<Arc<LogEntry>>,
    missed: Arc<AtomicU64>,
}

/// Fan-out hub for live subscribers
pub struct Broadcaster {
    queue: SubscriberQueue,
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<SubscriptionId, SubscriberSlot>>,
}

impl Broadcaster {
    pub fn new(queue: SubscriberQueue) -> Self {
        Self {
            queue,
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = match self.queue {
            SubscriberQueue::Unbounded => unbounded(),
            SubscriberQueue::Bounded { capacity } => bounded(capacity.max(1)),
        };
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let missed = Arc::new(AtomicU64::new(0));

        self.subscribers.write().insert(
            id,
            SubscriberSlot {
                sender,
                missed: Arc::clone(&missed),
            },
        );

        Subscription {
            id,
            receiver,
            missed,
        }
    }

    /// Close a subscriber's queue. Its reader drains what is pending, then ends.
    ///
    /// Returns `false` if the id was unknown or already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.write().remove(&id).is_some()
    }

    /// Best-effort delivery to every current subscriber.
    ///
    /// Returns the number of subscribers that could not take the entry.
    /// Subscribers whose reader was dropped are pruned.
    pub fn publish(&self, entry: &Arc<LogEntry>) -> usize {
        let mut failures = 0;
        let mut disconnected = Vec::new();

        {
            let subscribers = self.subscribers.read();
            for (id, slot) in subscribers.iter() {
                match slot.sender.try_send(Arc::clone(entry)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        slot.missed.fetch_add(1, Ordering::Relaxed);
                        failures += 1;
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        disconnected.push(*id);
                        failures += 1;
                    }
                }
            }
        }

        if !disconnected.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in disconnected {
                subscribers.remove(&id);
            }
        }

        failures
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn queue(&self) -> SubscriberQueue {
        self.queue
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(SubscriberQueue::default())
    }
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("queue", &self.queue)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Reader half of a live-tail subscription
///
/// Reads end (`None`) once the subscription is unsubscribed and every
/// pending entry has been consumed.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: Receiver<Arc<LogEntry>>,
    missed: Arc<AtomicU64>,
}

impl Subscription {
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Block until an entry arrives or the subscription is closed.
    pub fn recv(&self) -> Option<Arc<LogEntry>> {
        self.receiver.recv().ok()
    }

    /// Wait at most `timeout`. `Ok(None)` means the subscription is closed.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Arc<LogEntry>>, RecvTimeoutError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(entry) => Ok(Some(entry)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn try_recv(&self) -> Option<Arc<LogEntry>> {
        self.receiver.try_recv().ok()
    }

    /// Blocking iterator that ends when the subscription is closed.
    pub fn iter(&self) -> impl Iterator<Item = Arc<LogEntry>> + '_ {
        self.receiver.iter()
    }

    /// Entries pending in this subscriber's queue.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Entries not delivered because this subscriber's bounded queue was full.
    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }
}
