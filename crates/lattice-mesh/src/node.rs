//! Mesh node lifecycle and the invoke transport server.
//!
//! A [`MeshNode`] owns three background tasks: the WebSocket accept loop
//! serving invoke requests, the discovery announcer, and the discovery
//! listener. [`MeshNode::dispose`] aborts all three; in-flight outbound
//! requests run in their own tasks and are deliberately left to finish on
//! their own (callers decide whether anyone is still listening).

use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use lattice_proto::{MeshMessage, MeshResponse, Peer, PeerId, error_codes};

use crate::client;
use crate::discovery::{self, DiscoveryConfig};
use crate::registry::PeerRegistry;

/// Errors that can occur during node lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Binding the invoke listener failed.
    #[error("failed to bind invoke listener on port {port}: {source}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Opening the discovery socket failed.
    #[error("failed to open discovery socket on port {port}: {source}")]
    Discovery {
        /// Requested discovery port.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Handler invoked for a named endpoint.
///
/// Receives the request payload and returns the response payload, or `None`
/// when there is nothing to return.
pub type EndpointHandler = dyn Fn(Value) -> Option<Value> + Send + Sync;

/// Completion handle for a fire-and-forget request.
///
/// Resolves to the response payload, or `None` when the peer returned
/// nothing or the exchange failed. Dropping the handle abandons the
/// completion without cancelling the request itself.
#[derive(Debug)]
pub struct Pending {
    rx: oneshot::Receiver<Option<Value>>,
}

impl Pending {
    /// Creates a handle together with its completion sender.
    #[must_use]
    pub fn channel() -> (oneshot::Sender<Option<Value>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Creates a handle that is already resolved.
    ///
    /// Useful for fakes in tests and for failure paths that never reach the
    /// transport.
    #[must_use]
    pub fn ready(payload: Option<Value>) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(payload);
        pending
    }
}

impl Future for Pending {
    type Output = Option<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| res.ok().flatten())
    }
}

/// Live-peer and request surface of the mesh.
///
/// The console depends on this trait rather than on [`MeshNode`] so its
/// dispatcher can be exercised against a fake.
pub trait Mesh {
    /// Returns a fresh snapshot of currently known peers.
    fn peers(&self) -> Vec<Peer>;

    /// Sends `payload` to `endpoint` on the given peer.
    ///
    /// Returns immediately; the exchange happens on a background task and
    /// completes the returned handle. Must be called from within a tokio
    /// runtime.
    fn request(&self, peer: PeerId, endpoint: &str, payload: Value) -> Pending;
}

impl<T: Mesh + ?Sized> Mesh for &T {
    fn peers(&self) -> Vec<Peer> {
        (**self).peers()
    }

    fn request(&self, peer: PeerId, endpoint: &str, payload: Value) -> Pending {
        (**self).request(peer, endpoint, payload)
    }
}

/// Builder for a [`MeshNode`].
pub struct MeshNodeBuilder {
    name: String,
    port: u16,
    discovery: DiscoveryConfig,
    handlers: HashMap<String, Arc<EndpointHandler>>,
}

impl MeshNodeBuilder {
    /// Creates a builder for a node with the given name.
    ///
    /// The invoke port defaults to 0 (ephemeral).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: 0,
            discovery: DiscoveryConfig::default(),
            handlers: HashMap::new(),
        }
    }

    /// Sets the invoke transport port. 0 picks an ephemeral port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the discovery configuration.
    #[must_use]
    pub fn discovery(mut self, config: DiscoveryConfig) -> Self {
        self.discovery = config;
        self
    }

    /// Registers an endpoint handler.
    ///
    /// The handler name is advertised in announcements.
    #[must_use]
    pub fn endpoint(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Starts the node: binds the invoke listener and the discovery socket,
    /// then spawns the server, announcer, and listener tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if either socket cannot be bound.
    pub async fn start(self) -> Result<MeshNode, NodeError> {
        let Self {
            name,
            port,
            discovery: config,
            handlers,
        } = self;

        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|source| NodeError::Bind { port, source })?;
        let bound = listener
            .local_addr()
            .map_err(|source| NodeError::Bind { port, source })?
            .port();

        let mut local = Peer::new(name, bound);
        for endpoint in handlers.keys() {
            local.endpoints.insert(endpoint.clone());
        }

        let discovery_socket =
            discovery::bind_listener(config.port).map_err(|source| NodeError::Discovery {
                port: config.port,
                source,
            })?;

        let registry = Arc::new(PeerRegistry::new(local.id, config.peer_timeout));
        let handlers = Arc::new(handlers);

        info!(
            name = %local.name,
            id = %local.id,
            port = bound,
            endpoints = local.endpoints.len(),
            "Mesh node started"
        );

        let tasks = vec![
            tokio::spawn(serve(listener, Arc::clone(&handlers))),
            tokio::spawn(discovery::announce_loop(
                local.clone(),
                config.clone(),
                Arc::clone(&registry),
            )),
            tokio::spawn(discovery::listen_loop(
                Arc::clone(&registry),
                discovery_socket,
            )),
        ];

        Ok(MeshNode {
            local,
            registry,
            tasks,
        })
    }
}

/// A running node in the lattice mesh.
pub struct MeshNode {
    local: Peer,
    registry: Arc<PeerRegistry>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for MeshNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshNode")
            .field("local", &self.local)
            .field("peers", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl MeshNode {
    /// Creates a builder for a node with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> MeshNodeBuilder {
        MeshNodeBuilder::new(name)
    }

    /// Returns the local node's own peer record, with the bound port.
    #[must_use]
    pub fn local(&self) -> &Peer {
        &self.local
    }

    /// Seeds the registry with a peer that is not discoverable by
    /// announcement, e.g. across a routed network segment.
    pub fn add_static_peer(&self, peer: Peer, source: IpAddr) {
        self.registry.observe(peer, source);
    }

    /// Stops the server and discovery tasks.
    ///
    /// Outbound requests already in flight are not cancelled; their
    /// completion tasks finish (or fail) on their own.
    pub fn dispose(self) {
        info!(name = %self.local.name, "Mesh node stopping");
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Mesh for MeshNode {
    fn peers(&self) -> Vec<Peer> {
        self.registry.snapshot()
    }

    fn request(&self, peer: PeerId, endpoint: &str, payload: Value) -> Pending {
        let (tx, pending) = Pending::channel();

        let Some((target, source)) = self.registry.lookup(peer) else {
            warn!(peer = %peer, "Request to unknown peer");
            let _ = tx.send(None);
            return pending;
        };

        let url = format!("ws://{}", SocketAddr::new(source, target.port));
        let endpoint = endpoint.to_string();
        debug!(peer = %target.name, url = %url, endpoint = %endpoint, "Dispatching request");

        tokio::spawn(async move {
            let result = client::invoke(url, endpoint, payload).await;
            if tx.send(result).is_err() {
                debug!("Request completion dropped by caller");
            }
        });

        pending
    }
}

/// Accept loop for the invoke transport.
async fn serve(listener: TcpListener, handlers: Arc<HashMap<String, Arc<EndpointHandler>>>) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                continue;
            }
        };

        let handlers = Arc::clone(&handlers);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, handlers).await {
                debug!(source = %addr, error = %e, "Invoke connection ended with error");
            }
        });
    }
}

/// Serves invoke frames on one accepted connection until it closes.
async fn handle_connection(
    stream: TcpStream,
    handlers: Arc<HashMap<String, Arc<EndpointHandler>>>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let mut ws = tokio_tungstenite::accept_async(stream).await?;

    loop {
        let frame = match ws.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(Message::Ping(data))) => {
                if let Err(e) = ws.send(Message::Pong(data)).await {
                    warn!(error = %e, "Failed to send pong");
                }
                continue;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!(error = %e, "WebSocket error");
                break;
            }
        };

        let response = match MeshMessage::from_json(&frame) {
            Ok(MeshMessage::Invoke { endpoint, payload }) => match handlers.get(&endpoint) {
                Some(handler) => MeshResponse::Result {
                    payload: handler.as_ref()(payload),
                },
                None => MeshResponse::error(
                    error_codes::UNKNOWN_ENDPOINT,
                    format!("no endpoint named {endpoint}"),
                ),
            },
            Ok(other) => MeshResponse::error(
                error_codes::INVALID_REQUEST,
                format!("unexpected {} on invoke channel", other.kind()),
            ),
            Err(e) => {
                MeshResponse::error(error_codes::INVALID_REQUEST, format!("invalid frame: {e}"))
            }
        };

        let json = match response.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to encode response");
                continue;
            }
        };
        if ws.send(Message::Text(json)).await.is_err() {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// Discovery config with a per-test port so parallel tests stay apart.
    fn test_discovery(port: u16) -> DiscoveryConfig {
        DiscoveryConfig {
            port,
            announce_interval: Duration::seconds(60),
            peer_timeout: Duration::seconds(120),
        }
    }

    #[tokio::test]
    async fn builder_advertises_handler_endpoints() {
        let node = MeshNode::builder("inventory")
            .discovery(test_discovery(48811))
            .endpoint("list", |_| None)
            .endpoint("reserve", |payload| Some(payload))
            .start()
            .await
            .ok()
            .unwrap();

        let local = node.local().clone();
        assert!(local.has_endpoint("list"));
        assert!(local.has_endpoint("reserve"));
        assert_ne!(local.port, 0, "ephemeral port must be resolved");

        node.dispose();
    }

    #[tokio::test]
    async fn invoke_round_trip_between_nodes() {
        let server = MeshNode::builder("inventory")
            .discovery(test_discovery(48812))
            .endpoint("echo", Some)
            .start()
            .await
            .ok()
            .unwrap();

        let console = MeshNode::builder("console")
            .discovery(test_discovery(48813))
            .start()
            .await
            .ok()
            .unwrap();
        console.add_static_peer(server.local().clone(), LOOPBACK);

        let pending = console.request(server.local().id, "echo", json!({"n": 1}));
        assert_eq!(pending.await, Some(json!({"n": 1})));

        server.dispose();
        console.dispose();
    }

    #[tokio::test]
    async fn invoke_of_unknown_endpoint_resolves_none() {
        let server = MeshNode::builder("inventory")
            .discovery(test_discovery(48814))
            .endpoint("echo", Some)
            .start()
            .await
            .ok()
            .unwrap();

        let console = MeshNode::builder("console")
            .discovery(test_discovery(48815))
            .start()
            .await
            .ok()
            .unwrap();
        console.add_static_peer(server.local().clone(), LOOPBACK);

        let pending = console.request(server.local().id, "missing", json!({}));
        assert_eq!(pending.await, None);

        server.dispose();
        console.dispose();
    }

    #[tokio::test]
    async fn unknown_endpoint_reports_wire_error_code() {
        let server = MeshNode::builder("inventory")
            .discovery(test_discovery(48820))
            .endpoint("echo", Some)
            .start()
            .await
            .ok()
            .unwrap();

        let url = format!("ws://127.0.0.1:{}", server.local().port);
        let err = client::try_invoke(&url, "missing", json!({})).await;

        match err {
            Err(client::InvokeError::Peer { code, message }) => {
                assert_eq!(code, error_codes::UNKNOWN_ENDPOINT);
                assert!(message.contains("missing"));
            }
            other => panic!("expected peer error, got {other:?}"),
        }

        server.dispose();
    }

    #[tokio::test]
    async fn handler_returning_nothing_resolves_none() {
        let server = MeshNode::builder("inventory")
            .discovery(test_discovery(48816))
            .endpoint("fire", |_| None)
            .start()
            .await
            .ok()
            .unwrap();

        let console = MeshNode::builder("console")
            .discovery(test_discovery(48817))
            .start()
            .await
            .ok()
            .unwrap();
        console.add_static_peer(server.local().clone(), LOOPBACK);

        let pending = console.request(server.local().id, "fire", json!({"go": true}));
        assert_eq!(pending.await, None);

        server.dispose();
        console.dispose();
    }

    #[tokio::test]
    async fn request_to_unknown_peer_resolves_none() {
        let console = MeshNode::builder("console")
            .discovery(test_discovery(48818))
            .start()
            .await
            .ok()
            .unwrap();

        let pending = console.request(PeerId::new(), "anything", json!({}));
        assert_eq!(pending.await, None);

        console.dispose();
    }

    #[tokio::test]
    async fn pending_ready_resolves_immediately() {
        assert_eq!(Pending::ready(Some(json!(7))).await, Some(json!(7)));
        assert_eq!(Pending::ready(None).await, None);
    }

    #[tokio::test]
    async fn node_never_lists_itself() {
        let node = MeshNode::builder("loner")
            .discovery(test_discovery(48819))
            .start()
            .await
            .ok()
            .unwrap();

        node.add_static_peer(node.local().clone(), LOOPBACK);
        assert!(node.peers().is_empty());

        node.dispose();
    }
}
