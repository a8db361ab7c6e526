//! Realtime update hub.
//!
//! Routes unit change notifications to the clients that joined that unit
//! and nobody else.  Pure routing: no severity, no control decisions.
//!
//! ```text
//!  publish(unit, event)
//!        │
//!        ▼
//!  ┌──────────── HubTable (one lock) ─────────────┐
//!  │ members: unit ──▶ {client, client, ...}       │
//!  │ clients: client ──▶ Outbox + joined units     │
//!  └───────────────────────────────────────────────┘
//!        │ try_send per member (FIFO per client)
//!        ▼
//!  Subscriber::recv() / try_recv()
//! ```
//!
//! Every outbox is a bounded `embassy-sync` channel.  A full outbox drops
//! the delivery with a warning rather than stalling the publisher.

pub mod events;

use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::HubError;

pub use events::{Delivery, UnitEvent, UpdateKind};

/// Per-client outbox depth.
pub const OUTBOX_DEPTH: usize = 32;

// ───────────────────────────────────────────────────────────────
// Identifiers
// ───────────────────────────────────────────────────────────────

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// A hydroponic unit or room, e.g. `HU-01`, `ROOM_BACK`.
    UnitId
);
string_id!(
    /// A connected socket client.
    ClientId
);

// ───────────────────────────────────────────────────────────────
// Outbox
// ───────────────────────────────────────────────────────────────

enum Slot {
    Item(Delivery),
    /// Wakes a parked receiver when the client goes away.
    Closed,
}

struct Outbox {
    channel: Channel<CriticalSectionRawMutex, Slot, OUTBOX_DEPTH>,
    closed: AtomicBool,
}

impl Outbox {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            channel: Channel::new(),
            closed: AtomicBool::new(false),
        })
    }

    fn offer(&self, client: &ClientId, delivery: Delivery) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        match self.channel.try_send(Slot::Item(delivery)) {
            Ok(()) => true,
            Err(_) => {
                warn!("hub: outbox full for client {client}, delivery dropped");
                false
            }
        }
    }

    /// Discard anything pending and wake a parked receiver.
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        while self.channel.try_receive().is_ok() {}
        let _ = self.channel.try_send(Slot::Closed);
    }
}

/// Receiving end handed to a connected client.
///
/// Deliveries arrive in the order they were published.  After the client
/// disconnects (or reconnects with a fresh handle) this one goes quiet.
pub struct Subscriber {
    client_id: ClientId,
    outbox: Arc<Outbox>,
}

impl Subscriber {
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn is_closed(&self) -> bool {
        self.outbox.closed.load(Ordering::Acquire)
    }

    /// Next pending delivery, if any, without waiting.
    pub fn try_recv(&self) -> Option<Delivery> {
        if self.is_closed() {
            return None;
        }
        match self.outbox.channel.try_receive() {
            Ok(Slot::Item(d)) => Some(d),
            Ok(Slot::Closed) | Err(_) => None,
        }
    }

    /// Wait for the next delivery.  Resolves to `None` once the client
    /// has been disconnected.
    pub async fn recv(&self) -> Option<Delivery> {
        if self.is_closed() {
            return None;
        }
        match self.outbox.channel.receive().await {
            Slot::Item(d) if !self.is_closed() => Some(d),
            _ => None,
        }
    }

    /// [`recv`](Self::recv) for callers on a plain thread.
    pub fn recv_blocking(&self) -> Option<Delivery> {
        futures_lite::future::block_on(self.recv())
    }

    /// Everything pending right now.
    pub fn drain(&self) -> Vec<Delivery> {
        core::iter::from_fn(|| self.try_recv()).collect()
    }
}

// ───────────────────────────────────────────────────────────────
// RealtimeHub
// ───────────────────────────────────────────────────────────────

struct ClientEntry {
    outbox: Arc<Outbox>,
    units: BTreeSet<UnitId>,
}

#[derive(Default)]
struct HubTable {
    clients: BTreeMap<ClientId, ClientEntry>,
    members: BTreeMap<UnitId, BTreeSet<ClientId>>,
    shut_down: bool,
}

impl HubTable {
    fn entry(&mut self, client: &ClientId) -> Result<&mut ClientEntry, HubError> {
        if self.shut_down {
            return Err(HubError::ShutDown);
        }
        self.clients
            .get_mut(client)
            .ok_or_else(|| HubError::NotConnected(client.clone()))
    }
}

/// Subscription table plus per-client outboxes.
///
/// Shareable across connection tasks (`Arc<RealtimeHub>`); each operation
/// runs under a single lock, so "add one subscription" and "snapshot the
/// members for a publish" are atomic with respect to each other.
pub struct RealtimeHub {
    table: Mutex<CriticalSectionRawMutex, RefCell<HubTable>>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(RefCell::new(HubTable::default())),
        }
    }

    fn with_table<R>(&self, f: impl FnOnce(&mut HubTable) -> R) -> R {
        self.table.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Register a client and hand back its receiving end.
    ///
    /// Connecting an id that is already connected is a reconnect: the old
    /// handle is closed, joined units are kept and re-acknowledged on the
    /// new handle.
    pub fn connect(&self, client: ClientId) -> Result<Subscriber, HubError> {
        self.with_table(|t| {
            if t.shut_down {
                return Err(HubError::ShutDown);
            }
            let outbox = Outbox::new();
            let restored: Vec<UnitId> = match t.clients.get_mut(&client) {
                Some(entry) => {
                    entry.outbox.close();
                    entry.outbox = Arc::clone(&outbox);
                    info!("hub: client {client} reconnected ({} units restored)", entry.units.len());
                    entry.units.iter().cloned().collect()
                }
                None => {
                    t.clients.insert(
                        client.clone(),
                        ClientEntry {
                            outbox: Arc::clone(&outbox),
                            units: BTreeSet::new(),
                        },
                    );
                    info!("hub: client {client} connected");
                    Vec::new()
                }
            };
            outbox.offer(&client, Delivery::Connected);
            for unit in restored {
                outbox.offer(&client, Delivery::Joined(unit));
            }
            Ok(Subscriber {
                client_id: client,
                outbox,
            })
        })
    }

    /// Subscribe `client` to `unit`.  Joining twice is a no-op; the ack
    /// is sent every time.
    pub fn join(&self, client: &ClientId, unit: &UnitId) -> Result<(), HubError> {
        self.with_table(|t| {
            let entry = t.entry(client)?;
            let added = entry.units.insert(unit.clone());
            entry.outbox.offer(client, Delivery::Joined(unit.clone()));
            if added {
                t.members.entry(unit.clone()).or_default().insert(client.clone());
                debug!("hub: {client} joined {unit}");
            }
            Ok(())
        })
    }

    /// Unsubscribe `client` from `unit`.  Leaving a unit never joined is
    /// a no-op; the ack is sent every time.
    pub fn leave(&self, client: &ClientId, unit: &UnitId) -> Result<(), HubError> {
        self.with_table(|t| {
            let entry = t.entry(client)?;
            let removed = entry.units.remove(unit);
            entry.outbox.offer(client, Delivery::Left(unit.clone()));
            if removed {
                if let Some(set) = t.members.get_mut(unit) {
                    set.remove(client);
                    if set.is_empty() {
                        t.members.remove(unit);
                    }
                }
                debug!("hub: {client} left {unit}");
            }
            Ok(())
        })
    }

    /// Deliver `event` to every client joined to its unit.
    ///
    /// Returns how many outboxes accepted it.  A torn-down hub or a full
    /// outbox is logged and skipped; other subscribers are unaffected.
    pub fn publish(&self, event: UnitEvent) -> usize {
        self.with_table(|t| {
            if t.shut_down {
                warn!(
                    "hub: publish {} for {} after shutdown, dropped",
                    event.kind.event_name(),
                    event.unit_id
                );
                return 0;
            }
            let Some(members) = t.members.get(&event.unit_id) else {
                return 0;
            };
            members
                .iter()
                .filter_map(|id| t.clients.get(id).map(|e| (id, e)))
                .filter(|(id, entry)| entry.outbox.offer(id, Delivery::Update(event.clone())))
                .count()
        })
    }

    /// Forget a client and every subscription it held.
    ///
    /// Returns `true` the first time, `false` for repeats.
    pub fn on_disconnect(&self, client: &ClientId) -> bool {
        self.with_table(|t| {
            let Some(entry) = t.clients.remove(client) else {
                return false;
            };
            entry.outbox.close();
            for unit in &entry.units {
                if let Some(set) = t.members.get_mut(unit) {
                    set.remove(client);
                    if set.is_empty() {
                        t.members.remove(unit);
                    }
                }
            }
            info!("hub: client {client} disconnected ({} subscriptions removed)", entry.units.len());
            true
        })
    }

    /// Tear the hub down.  Every client is closed; later publishes are
    /// dropped and later connects refused.
    pub fn shutdown(&self) {
        self.with_table(|t| {
            let count = t.clients.len();
            for entry in t.clients.values() {
                entry.outbox.close();
            }
            t.clients.clear();
            t.members.clear();
            t.shut_down = true;
            info!("hub: shut down, {count} clients closed");
        });
    }

    pub fn is_shut_down(&self) -> bool {
        self.with_table(|t| t.shut_down)
    }

    /// Clients currently joined to `unit`.
    pub fn subscriber_count(&self, unit: &UnitId) -> usize {
        self.with_table(|t| t.members.get(unit).map_or(0, BTreeSet::len))
    }

    pub fn connection_count(&self) -> usize {
        self.with_table(|t| t.clients.len())
    }

    /// Units `client` is joined to, in order.
    pub fn joined_units(&self, client: &ClientId) -> Vec<UnitId> {
        self.with_table(|t| {
            t.clients
                .get(client)
                .map(|e| e.units.iter().cloned().collect())
                .unwrap_or_default()
        })
    }
}
