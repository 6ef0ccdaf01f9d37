//! Publish/subscribe fan-out between protocol handlers and plugins.
//!
//! Protocol handlers publish [`Event`]s synchronously and never wait for
//! subscribers. Delivery happens on a worker that runs callbacks on the
//! blocking pool, at most `workers` deliveries at a time. Each callback is
//! invoked inside its own failure boundary: an error or panic is logged with
//! the owning plugin and the declaration site, and the remaining callbacks
//! still run.
//!
//! The subscription table is read copy-on-publish, so subscribing or
//! unsubscribing while a delivery is in flight is safe. A callback removed
//! after an event was published is skipped when that event is delivered.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, Location, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Semaphore, mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::PluginError;
use crate::network::NetworkHandle;
use crate::state::{Channel, User};

/// Names of the events a subscriber can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ConnectionReady,
    ConnectionClosed,
    Rename,
    UserJoined,
    UserLeft,
    Message,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::ConnectionReady,
        EventKind::ConnectionClosed,
        EventKind::Rename,
        EventKind::UserJoined,
        EventKind::UserLeft,
        EventKind::Message,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionReady => "connection_ready",
            Self::ConnectionClosed => "connection_closed",
            Self::Rename => "rename",
            Self::UserJoined => "user_joined",
            Self::UserLeft => "user_left",
            Self::Message => "message",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened on a network.
///
/// User and Channel values are snapshots taken at publish time; the live
/// state belongs to the connection.
#[derive(Debug, Clone)]
pub enum Event {
    /// Registration completed.
    ConnectionReady { network: NetworkHandle },
    /// The transport closed or the connection was disconnected.
    ConnectionClosed { network: NetworkHandle },
    /// A member of `channel` changed nickname. `user` carries the new one.
    Rename {
        network: NetworkHandle,
        channel: Channel,
        user: User,
        old_nickname: String,
    },
    UserJoined {
        network: NetworkHandle,
        channel: Channel,
        user: User,
    },
    UserLeft {
        network: NetworkHandle,
        channel: Channel,
        user: User,
    },
    /// Chat text sent to a channel.
    Message {
        network: NetworkHandle,
        channel: Channel,
        user: User,
        text: String,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ConnectionReady { .. } => EventKind::ConnectionReady,
            Self::ConnectionClosed { .. } => EventKind::ConnectionClosed,
            Self::Rename { .. } => EventKind::Rename,
            Self::UserJoined { .. } => EventKind::UserJoined,
            Self::UserLeft { .. } => EventKind::UserLeft,
            Self::Message { .. } => EventKind::Message,
        }
    }

    pub fn network(&self) -> &NetworkHandle {
        match self {
            Self::ConnectionReady { network }
            | Self::ConnectionClosed { network }
            | Self::Rename { network, .. }
            | Self::UserJoined { network, .. }
            | Self::UserLeft { network, .. }
            | Self::Message { network, .. } => network,
        }
    }

    pub fn channel(&self) -> Option<&Channel> {
        match self {
            Self::Rename { channel, .. }
            | Self::UserJoined { channel, .. }
            | Self::UserLeft { channel, .. }
            | Self::Message { channel, .. } => Some(channel),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Rename { user, .. }
            | Self::UserJoined { user, .. }
            | Self::UserLeft { user, .. }
            | Self::Message { user, .. } => Some(user),
            _ => None,
        }
    }
}

/// Subscriber callback.
pub type Callback = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Identifier returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// One registered callback.
pub struct Subscription {
    id: SubscriptionId,
    owner: Arc<str>,
    location: &'static Location<'static>,
    callback: Callback,
    /// Cleared on unsubscribe. Deliveries already queued check it, so a
    /// removed callback is never invoked again.
    live: AtomicBool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Name of the plugin (or built-in) that registered the callback.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Source location of the declaration.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn retire(&self) {
        self.live.store(false, Ordering::Release);
    }
}

type Table = HashMap<EventKind, Vec<Arc<Subscription>>>;

enum Job {
    Deliver {
        event: Event,
        subscribers: Vec<Arc<Subscription>>,
    },
    Barrier(oneshot::Sender<()>),
}

/// Event fan-out. Clones share the same table and worker.
#[derive(Clone)]
pub struct EventBus {
    table: Arc<RwLock<Table>>,
    jobs: mpsc::UnboundedSender<Job>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Start the delivery worker. Must be called inside a tokio runtime.
    pub fn start(workers: usize) -> Self {
        let workers = workers.max(1);
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, workers));
        Self {
            table: Arc::new(RwLock::new(HashMap::new())),
            jobs,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a callback. Callbacks for the same event run in
    /// registration order.
    pub fn subscribe(
        &self,
        kind: EventKind,
        owner: &str,
        location: &'static Location<'static>,
        callback: Callback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Arc::new(Subscription {
            id,
            owner: Arc::from(owner),
            location,
            callback,
            live: AtomicBool::new(true),
        });
        self.table.write().entry(kind).or_default().push(subscription);
        id
    }

    /// Remove one subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut table = self.table.write();
        let mut removed = false;
        for subs in table.values_mut() {
            subs.retain(|s| {
                if s.id != id {
                    return true;
                }
                s.retire();
                removed = true;
                false
            });
        }
        removed
    }

    /// Remove every subscription registered by `owner`. Returns how many
    /// were removed.
    pub fn unsubscribe_owner(&self, owner: &str) -> usize {
        let mut table = self.table.write();
        let mut removed = 0;
        for subs in table.values_mut() {
            subs.retain(|s| {
                if &*s.owner != owner {
                    return true;
                }
                s.retire();
                removed += 1;
                false
            });
        }
        table.retain(|_, subs| !subs.is_empty());
        removed
    }

    /// Number of callbacks registered for an event.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.table.read().get(&kind).map_or(0, Vec::len)
    }

    /// Number of callbacks registered by `owner` across all events.
    pub fn owner_count(&self, owner: &str) -> usize {
        self.table
            .read()
            .values()
            .flatten()
            .filter(|s| &*s.owner == owner)
            .count()
    }

    /// Hand an event to the worker. Never blocks.
    pub fn publish(&self, event: Event) {
        let kind = event.kind();
        crate::metrics::record_event(kind.as_str());

        let subscribers = match self.table.read().get(&kind) {
            Some(subs) if !subs.is_empty() => subs.clone(),
            _ => {
                debug!(event = %kind, "no subscribers");
                return;
            }
        };

        if self.jobs.send(Job::Deliver { event, subscribers }).is_err() {
            warn!(event = %kind, "event worker has stopped; event dropped");
        }
    }

    /// Wait until every event published before this call has been delivered.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.jobs.send(Job::Barrier(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>, workers: usize) {
    let permits = Arc::new(Semaphore::new(workers));

    while let Some(job) = rx.recv().await {
        match job {
            Job::Deliver { event, subscribers } => {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    deliver(&event, &subscribers);
                });
            }
            Job::Barrier(done) => {
                // Holding every permit means all earlier deliveries finished.
                if let Ok(all) = permits.acquire_many(workers as u32).await {
                    drop(all);
                }
                let _ = done.send(());
            }
        }
    }
}

/// Invoke each subscriber inside its own failure boundary.
fn deliver(event: &Event, subscribers: &[Arc<Subscription>]) {
    let kind = event.kind();
    for sub in subscribers {
        if !sub.is_live() {
            continue;
        }
        let span = crate::telemetry::spans::plugin(&sub.owner, kind.as_str());
        let _enter = span.enter();

        let outcome = catch_unwind(AssertUnwindSafe(|| (sub.callback)(event)));
        let message = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => format!("{e:#}"),
            Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
        };
        let error = PluginError::Runtime {
            plugin: sub.owner.to_string(),
            location: sub.location.to_string(),
            message,
        };

        warn!(
            plugin = %sub.owner,
            event = %kind,
            location = %sub.location,
            error = %error,
            "plugin callback failed"
        );
        crate::metrics::record_plugin_failure(&sub.owner);
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
