//! Discovered peer bookkeeping
//!
//! One entry per source address: re-discovery overwrites metadata, not
//! identity. The table is not thread-safe by itself; the engine owns it
//! behind a mutex and is the only writer.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// A device discovered on the local network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub addr: IpAddr,
    pub platform: String,
    pub name: String,
    pub last_seen: Instant,
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) - {}", self.name, self.platform, self.addr)
    }
}

/// Outcome of an upsert, so callers announce a device only on first sight
#[derive(Debug, Clone)]
pub enum PeerUpdate {
    Discovered(Peer),
    Refreshed(Peer),
}

/// Address-keyed table of discovered peers
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: HashMap<IpAddr, Peer>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Insert or overwrite the metadata for `addr` and refresh its liveness.
    pub fn upsert(&mut self, addr: IpAddr, platform: String, name: String) -> PeerUpdate {
        let peer = Peer {
            addr,
            platform,
            name,
            last_seen: Instant::now(),
        };
        match self.peers.insert(addr, peer.clone()) {
            None => PeerUpdate::Discovered(peer),
            Some(_) => PeerUpdate::Refreshed(peer),
        }
    }

    /// Refresh `last_seen` for a known peer. A heartbeat from an address
    /// that never announced itself does not create an entry.
    pub fn touch(&mut self, addr: IpAddr) {
        if let Some(peer) = self.peers.get_mut(&addr) {
            peer.last_seen = Instant::now();
        }
    }

    /// Remove and return every peer unseen for longer than `timeout`.
    pub fn evict_stale(&mut self, now: Instant, timeout: Duration) -> Vec<Peer> {
        let stale: Vec<IpAddr> = self
            .peers
            .iter()
            .filter(|(_, peer)| now.duration_since(peer.last_seen) > timeout)
            .map(|(addr, _)| *addr)
            .collect();

        stale
            .into_iter()
            .filter_map(|addr| self.peers.remove(&addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last_octet: u8) -> IpAddr {
        IpAddr::from([192, 168, 1, last_octet])
    }

    #[test]
    fn test_first_upsert_is_discovered() {
        let mut table = PeerTable::new();
        let update = table.upsert(addr(10), "Linux".to_string(), "hostB".to_string());
        assert!(matches!(update, PeerUpdate::Discovered(_)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_second_upsert_is_refreshed() {
        let mut table = PeerTable::new();
        table.upsert(addr(10), "Linux".to_string(), "hostB".to_string());
        let update = table.upsert(addr(10), "Linux".to_string(), "hostB-renamed".to_string());

        assert!(matches!(update, PeerUpdate::Refreshed(_)));
        assert_eq!(table.len(), 1);
        let peer = table.peers().next().unwrap();
        assert_eq!(peer.name, "hostB-renamed");
    }

    #[test]
    fn test_touch_unknown_address_is_a_noop() {
        let mut table = PeerTable::new();
        table.touch(addr(50));
        assert!(table.is_empty());
    }

    #[test]
    fn test_touch_refreshes_known_peer() {
        let mut table = PeerTable::new();
        table.upsert(addr(10), "Linux".to_string(), "hostB".to_string());
        let before = table.peers().next().unwrap().last_seen;

        table.touch(addr(10));
        let after = table.peers().next().unwrap().last_seen;
        assert!(after >= before);
    }

    #[test]
    fn test_evict_stale_removes_only_expired_peers() {
        let timeout = Duration::from_secs(120);
        let mut table = PeerTable::new();
        table.upsert(addr(10), "Linux".to_string(), "old".to_string());
        table.upsert(addr(11), "Android".to_string(), "fresh".to_string());

        // Both were just seen; advancing "now" past the timeout expires both,
        // so first check that a recent clock keeps them.
        let evicted = table.evict_stale(Instant::now(), timeout);
        assert!(evicted.is_empty());
        assert_eq!(table.len(), 2);

        let future = Instant::now() + timeout + Duration::from_secs(1);
        let mut evicted = table.evict_stale(future, timeout);
        evicted.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(evicted.len(), 2);
        assert_eq!(evicted[0].name, "fresh");
        assert_eq!(evicted[1].name, "old");
        assert!(table.is_empty());
    }

    #[test]
    fn test_evict_retains_recently_touched_peer() {
        let timeout = Duration::from_secs(120);
        let mut table = PeerTable::new();
        table.upsert(addr(10), "Linux".to_string(), "hostB".to_string());

        let within = Instant::now() + Duration::from_secs(60);
        let evicted = table.evict_stale(within, timeout);
        assert!(evicted.is_empty());
        assert_eq!(table.len(), 1);
    }
}
