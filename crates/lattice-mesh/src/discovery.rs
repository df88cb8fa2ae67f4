//! Peer discovery over UDP announcements.
//!
//! Every node broadcasts an [`MeshMessage::Announce`] datagram on a shared
//! discovery port at a fixed interval (and once at startup), and listens on
//! that port to feed its own registry. Announcements also go to loopback so
//! nodes on the same host find each other regardless of interface routing.
//!
//! The listener socket is opened with address (and, on unix, port) reuse so
//! several nodes on one host can share the discovery port.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use chrono::Duration;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use lattice_proto::{MeshMessage, Peer};

use crate::registry::PeerRegistry;

/// Configuration for mesh discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// UDP port shared by all nodes for announcements.
    pub port: u16,
    /// Interval between presence announcements.
    pub announce_interval: Duration,
    /// How long before a silent peer is dropped from snapshots.
    pub peer_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: 47700,
            announce_interval: Duration::seconds(5),
            peer_timeout: Duration::seconds(30),
        }
    }
}

/// Opens the shared discovery listener socket.
///
/// # Errors
///
/// Returns an error if the socket cannot be created, configured, or bound.
pub(crate) fn bind_listener(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into())?;
    UdpSocket::from_std(socket.into())
}

/// Periodically announces the local peer and prunes stale registry entries.
///
/// The first announcement goes out immediately, which is what lets a freshly
/// started node show up in other consoles within one settle delay.
pub(crate) async fn announce_loop(
    local: Peer,
    config: DiscoveryConfig,
    registry: Arc<PeerRegistry>,
) {
    let socket = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!(error = %e, "Failed to bind announce socket; discovery disabled");
            return;
        }
    };
    if let Err(e) = socket.set_broadcast(true) {
        warn!(error = %e, "Failed to enable broadcast; discovery disabled");
        return;
    }

    let frame = match MeshMessage::announce(local).to_json() {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Failed to encode announcement; discovery disabled");
            return;
        }
    };

    let targets = [
        SocketAddr::from((Ipv4Addr::BROADCAST, config.port)),
        SocketAddr::from((Ipv4Addr::LOCALHOST, config.port)),
    ];

    let period = config
        .announce_interval
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(5));
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        for target in targets {
            if let Err(e) = socket.send_to(frame.as_bytes(), target).await {
                debug!(target = %target, error = %e, "Announce send failed");
            }
        }
        registry.prune_stale();
    }
}

/// Consumes announcements from the discovery socket into the registry.
pub(crate) async fn listen_loop(registry: Arc<PeerRegistry>, socket: UdpSocket) {
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let (len, addr) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "Discovery receive failed");
                continue;
            }
        };

        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            debug!(source = %addr, "Dropping non-UTF-8 datagram");
            continue;
        };

        match MeshMessage::from_json(text) {
            Ok(MeshMessage::Announce { peer, .. }) => {
                registry.observe(peer, normalize_source(addr.ip()));
            }
            Ok(other) => {
                debug!(source = %addr, kind = other.kind(), "Unexpected message on discovery socket");
            }
            Err(e) => {
                debug!(source = %addr, error = %e, "Undecodable announcement");
            }
        }
    }
}

/// Maps the unspecified source address to loopback.
///
/// A datagram can arrive from `0.0.0.0` when the announcer bound without a
/// concrete interface; connecting back to that address would fail.
fn normalize_source(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(v4) if v4.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other,
    }
}
