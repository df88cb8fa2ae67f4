//! Identity and metadata types for mesh peers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a peer in the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(Uuid);

impl PeerId {
    /// Creates a new unique peer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a peer ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A peer service visible in the mesh.
///
/// This is the record exchanged in announcements and returned from peer
/// snapshots. It deliberately carries no network address beyond the invoke
/// port; the address a peer was observed from is transport bookkeeping and
/// stays inside the mesh layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Unique peer identifier.
    pub id: PeerId,
    /// Display name. Unique per deployment by convention only.
    pub name: String,
    /// Port the peer's invoke transport listens on.
    pub port: u16,
    /// Endpoint names this peer accepts requests against.
    pub endpoints: BTreeSet<String>,
}

impl Peer {
    /// Creates a peer record with a fresh ID and no endpoints.
    #[must_use]
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            id: PeerId::new(),
            name: name.into(),
            port,
            endpoints: BTreeSet::new(),
        }
    }

    /// Adds an endpoint name.
    #[must_use]
    pub fn with_endpoint(mut self, name: impl Into<String>) -> Self {
        self.endpoints.insert(name.into());
        self
    }

    /// Checks whether this peer advertises the named endpoint.
    #[must_use]
    pub fn has_endpoint(&self, name: &str) -> bool {
        self.endpoints.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_new_creates_unique_ids() {
        let id1 = PeerId::new();
        let id2 = PeerId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn peer_id_from_uuid_round_trips() {
        let uuid = Uuid::new_v4();
        let id = PeerId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
    }

    #[test]
    fn peer_id_display_is_uuid_form() {
        let uuid = Uuid::new_v4();
        let id = PeerId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn peer_builder_collects_endpoints() {
        let peer = Peer::new("inventory", 9040)
            .with_endpoint("list")
            .with_endpoint("reserve");

        assert_eq!(peer.name, "inventory");
        assert_eq!(peer.port, 9040);
        assert!(peer.has_endpoint("list"));
        assert!(peer.has_endpoint("reserve"));
        assert!(!peer.has_endpoint("missing"));
    }

    #[test]
    fn peer_endpoints_are_ordered() {
        let peer = Peer::new("inventory", 9040)
            .with_endpoint("zeta")
            .with_endpoint("alpha");

        let names: Vec<&String> = peer.endpoints.iter().collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[test]
    fn peer_serialization_round_trips() {
        let peer = Peer::new("billing", 9100).with_endpoint("charge");

        let json = serde_json::to_string(&peer).ok();
        assert!(json.is_some());

        let deserialized: Result<Peer, _> = serde_json::from_str(&json.unwrap_or_default());
        assert_eq!(deserialized.ok(), Some(peer));
    }
}
