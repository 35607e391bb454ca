use crate::core::entry::{ConnectionEntry, ConnectionSnapshot};
use crate::traits::{CloseCode, Identity, ReconnectPolicy};
use std::collections::HashMap;
use tracing::debug;

/// Close reason sent to a socket superseded by a new `open`
pub const REPLACED_REASON: &str = "replaced";

/// What `upsert` displaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replaced {
    /// The old entry still had a socket attached (it has been asked to close)
    pub had_socket: bool,
    /// Retry count carried over to the new entry
    pub retry_count: u32,
}

/// Identity → connection entry map
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<Identity, ConnectionEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry for `identity`, replacing any existing one
    ///
    /// The old entry is closed on purpose with 1000 / "replaced" (timer
    /// canceled, parked binary receiver released) and dropped; its retry
    /// count carries over to the new entry.
    pub fn upsert(
        &mut self,
        identity: impl Into<Identity>,
        protocols: Vec<String>,
        reconnect: Option<ReconnectPolicy>,
    ) -> Option<Replaced> {
        let identity = identity.into();

        let replaced = self.entries.remove(&identity).map(|mut old| {
            let had_socket = old.begin_close(CloseCode::Normal, REPLACED_REASON);
            debug!(
                "Replacing connection '{}' (socket attached: {}, retries: {})",
                identity, had_socket, old.retry_count
            );
            Replaced {
                had_socket,
                retry_count: old.retry_count,
            }
        });

        let mut entry = ConnectionEntry::new(identity.clone(), protocols, reconnect);
        entry.retry_count = replaced.map_or(0, |r| r.retry_count);
        self.entries.insert(identity, entry);

        replaced
    }

    pub fn get(&self, identity: &str) -> Option<&ConnectionEntry> {
        self.entries.get(identity)
    }

    pub fn get_mut(&mut self, identity: &str) -> Option<&mut ConnectionEntry> {
        self.entries.get_mut(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshots(&self) -> Vec<ConnectionSnapshot> {
        let mut snapshots: Vec<ConnectionSnapshot> =
            self.entries.values().map(ConnectionEntry::snapshot).collect();
        snapshots.sort_by(|a, b| a.identity.cmp(&b.identity));
        snapshots
    }

    /// Remove every entry (manager teardown)
    pub fn drain(&mut self) -> Vec<ConnectionEntry> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }
}
