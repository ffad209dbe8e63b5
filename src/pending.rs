//! Correlation table for in-flight upstream queries.
//!
//! UDP gives us no connection to tie an upstream answer back to the
//! client that asked, so forwarded queries are tracked by their 16-bit
//! transaction ID. An entry is consumed exactly once: either by the
//! relay when the answer arrives ([`PendingTable::resolve`]) or by the
//! timeout sweeper ([`PendingTable::expire`]). Both go through the same
//! atomic remove-and-return, so whichever fires second sees nothing and
//! does nothing.

use std::net::SocketAddr;
use std::time::Instant;

use dashmap::DashMap;

/// A forwarded query waiting for its upstream answer.
#[derive(Debug, Clone)]
pub struct PendingQuery {
    /// Client to relay the answer back to.
    pub client: SocketAddr,
    /// Queried domain, for diagnostics.
    pub host: String,
    /// When the query was forwarded.
    pub issued_at: Instant,
}

/// Concurrent map from transaction ID to [`PendingQuery`].
///
/// Written by the listener loop, consumed by the relay loop and the
/// per-query expiry tasks, with no external locking.
pub struct PendingTable {
    entries: DashMap<u16, PendingQuery>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Track a freshly forwarded query.
    ///
    /// A colliding still-pending ID is silently overwritten; with only
    /// 65536 IDs chosen by clients this can drop an earlier mapping, an
    /// accepted trade-off of correlating by bare transaction ID.
    pub fn register(&self, id: u16, client: SocketAddr, host: String) {
        self.entries.insert(
            id,
            PendingQuery {
                client,
                host,
                issued_at: Instant::now(),
            },
        );
    }

    /// Claim the entry for an arriving upstream answer.
    ///
    /// `None` means the answer came too late or for an ID we never
    /// forwarded; the caller drops the datagram.
    pub fn resolve(&self, id: u16) -> Option<PendingQuery> {
        self.entries.remove(&id).map(|(_, query)| query)
    }

    /// Claim the entry from the timeout path.
    ///
    /// `None` means the answer already won the race and nothing is left
    /// to clean up.
    pub fn expire(&self, id: u16) -> Option<PendingQuery> {
        self.entries.remove(&id).map(|(_, query)| query)
    }

    /// Number of queries currently awaiting an answer.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn client(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn resolve_consumes_entry_exactly_once() {
        let table = PendingTable::new();
        table.register(42, client(5000), "example.com.".into());

        let query = table.resolve(42).unwrap();

        assert_eq!(query.client, client(5000));
        assert_eq!(query.host, "example.com.");
        assert!(table.resolve(42).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn expire_is_noop_after_resolve() {
        let table = PendingTable::new();
        table.register(7, client(5000), "example.com.".into());

        assert!(table.resolve(7).is_some());
        assert!(table.expire(7).is_none());
    }

    #[test]
    fn colliding_id_overwrites_earlier_entry() {
        let table = PendingTable::new();
        table.register(1, client(5000), "first.example.com.".into());
        table.register(1, client(6000), "second.example.com.".into());

        assert_eq!(table.len(), 1);
        let query = table.resolve(1).unwrap();
        assert_eq!(query.client, client(6000));
        assert_eq!(query.host, "second.example.com.");
    }

    #[test]
    fn concurrent_resolve_and_expire_have_one_winner() {
        // Race the two consumers over many rounds; every round exactly
        // one side may observe the entry.
        for round in 0..500u16 {
            let table = Arc::new(PendingTable::new());
            table.register(round, client(5000), "example.com.".into());

            let resolver = {
                let table = Arc::clone(&table);
                std::thread::spawn(move || table.resolve(round).is_some())
            };
            let sweeper = {
                let table = Arc::clone(&table);
                std::thread::spawn(move || table.expire(round).is_some())
            };

            let resolved = resolver.join().unwrap();
            let expired = sweeper.join().unwrap();
            assert!(resolved ^ expired, "exactly one consumer must win");
            assert!(table.is_empty());
        }
    }
}
