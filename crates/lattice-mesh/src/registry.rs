//! Live peer table with staleness pruning.
//!
//! Every announcement observed on the discovery channel lands here. Snapshots
//! are always fresh: stale peers are filtered out at read time and physically
//! removed by the periodic prune that runs with the announcer.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use lattice_proto::{Peer, PeerId};

/// Information about an observed peer.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    /// The peer's announced record.
    pub peer: Peer,
    /// Address the last announcement arrived from.
    pub source: IpAddr,
    /// When this peer was first observed.
    pub first_seen: DateTime<Utc>,
    /// When this peer was last observed.
    pub last_seen: DateTime<Utc>,
}

impl PeerInfo {
    /// Creates peer info for a freshly observed peer.
    #[must_use]
    pub fn new(peer: Peer, source: IpAddr) -> Self {
        let now = Utc::now();
        Self {
            peer,
            source,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Updates the last seen timestamp.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    /// Checks if this peer is stale based on the timeout.
    #[must_use]
    pub fn is_stale(&self, timeout: Duration) -> bool {
        Utc::now() - self.last_seen > timeout
    }
}

/// Registry of peers observed on the discovery channel.
///
/// The local node's own announcements are ignored, so a node never lists
/// itself.
#[derive(Debug)]
pub struct PeerRegistry {
    /// ID of the local node, excluded from the table.
    local: PeerId,
    /// How long before a silent peer is considered gone.
    peer_timeout: Duration,
    /// Known peers indexed by peer ID.
    peers: RwLock<HashMap<PeerId, PeerInfo>>,
}

impl PeerRegistry {
    /// Creates an empty registry for the given local node.
    #[must_use]
    pub fn new(local: PeerId, peer_timeout: Duration) -> Self {
        Self {
            local,
            peer_timeout,
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Records an announcement.
    ///
    /// A known peer has its record replaced (announcements are authoritative;
    /// endpoints may change across restarts) and its timestamp refreshed. The
    /// local node's own announcements are dropped.
    pub fn observe(&self, peer: Peer, source: IpAddr) {
        if peer.id == self.local {
            return;
        }

        let mut peers = self.peers.write();
        if let Some(info) = peers.get_mut(&peer.id) {
            info.peer = peer;
            info.source = source;
            info.touch();
        } else {
            info!(
                peer = %peer.name,
                id = %peer.id,
                port = peer.port,
                source = %source,
                "Discovered peer"
            );
            peers.insert(peer.id, PeerInfo::new(peer, source));
        }
    }

    /// Removes a peer from the table.
    pub fn remove(&self, id: PeerId) -> Option<Peer> {
        self.peers.write().remove(&id).map(|info| info.peer)
    }

    /// Returns a fresh snapshot of live peers, sorted by name.
    ///
    /// Stale entries are excluded but not removed; [`Self::prune_stale`]
    /// does the physical removal.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Peer> {
        let peers = self.peers.read();
        let mut live: Vec<Peer> = peers
            .values()
            .filter(|info| !info.is_stale(self.peer_timeout))
            .map(|info| info.peer.clone())
            .collect();
        live.sort_by(|a, b| a.name.cmp(&b.name));
        live
    }

    /// Looks up a live peer together with the address it was observed from.
    #[must_use]
    pub fn lookup(&self, id: PeerId) -> Option<(Peer, IpAddr)> {
        let peers = self.peers.read();
        peers
            .get(&id)
            .filter(|info| !info.is_stale(self.peer_timeout))
            .map(|info| (info.peer.clone(), info.source))
    }

    /// Drops peers that have been silent past the timeout.
    ///
    /// Returns how many entries were removed.
    pub fn prune_stale(&self) -> usize {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|id, info| {
            let keep = !info.is_stale(self.peer_timeout);
            if !keep {
                debug!(peer = %info.peer.name, id = %id, "Pruned stale peer");
            }
            keep
        });
        before - peers.len()
    }

    /// Returns the number of tracked peers, stale entries included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Returns true if no peers are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}
