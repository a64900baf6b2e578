//! The connection cluster: a pool of physical forwarding connections
//!
//! The orchestrator drives a cluster through a narrow contract: `open()`
//! requests one more physical connection, every connection can be told to
//! `destroy()` itself, and the cluster reports `Opened` / `Dead` lifecycle
//! events through a channel consumed by a single supervision loop.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

use local_tunnel_common::constants::{REDIAL_DELAY_MS, SPLICE_BUF_SIZE};
use local_tunnel_common::models::TunnelAssignment;
use local_tunnel_common::utils::generate_connection_id;

use crate::transform::HeaderHostTransformer;

/// Identity of one forwarding connection
pub type ConnectionId = String;

/// Lifecycle events a cluster reports back to its supervisor
#[derive(Debug)]
pub enum ClusterEvent {
    /// A forwarding connection is established and splicing traffic
    Opened(ConnectionHandle),
    /// A connection is gone, either on its own or after `destroy()`
    Dead(ConnectionId),
}

/// Supervisor-side handle to one live connection
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    shutdown: mpsc::UnboundedSender<()>,
}

impl ConnectionHandle {
    pub(crate) fn new(id: ConnectionId, shutdown: mpsc::UnboundedSender<()>) -> Self {
        Self { id, shutdown }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ask the connection to tear itself down. The connection reports its own
    /// `Dead` event once the splice stops; a connection that already ended is
    /// a no-op.
    pub fn destroy(&self) {
        let _ = self.shutdown.send(());
    }
}

/// Command surface of a connection cluster, the seam the orchestrator is
/// written against.
pub trait Cluster: Send + 'static {
    /// Request one more physical forwarding connection. Fire-and-forget; the
    /// outcome arrives as an `Opened` or `Dead` event.
    fn open(&mut self);
}

/// Everything a cluster needs to establish forwarding connections
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub remote_host: String,
    pub remote_port: u16,
    pub name: String,
    pub url: String,
    pub max_conn: u8,
    pub local_host: String,
    pub local_port: u16,
}

impl ClusterConfig {
    pub fn new(
        assignment: &TunnelAssignment,
        local_host: impl Into<String>,
        local_port: u16,
    ) -> Self {
        Self {
            remote_host: assignment.remote_host.clone(),
            remote_port: assignment.remote_port,
            name: assignment.name.clone(),
            url: assignment.url.clone(),
            max_conn: assignment.max_conn,
            local_host: local_host.into(),
            local_port,
        }
    }
}

/// TCP cluster: each connection dials the remote tunnel endpoint and the
/// local service, then splices the two sockets together.
pub struct TcpCluster {
    config: ClusterConfig,
    events: mpsc::Sender<ClusterEvent>,
}

impl TcpCluster {
    pub fn new(config: ClusterConfig) -> (Self, mpsc::Receiver<ClusterEvent>) {
        let (events, events_rx) = mpsc::channel(64);
        (Self { config, events }, events_rx)
    }
}

impl Cluster for TcpCluster {
    fn open(&mut self) {
        let config = self.config.clone();
        let events = self.events.clone();
        tokio::spawn(run_connection(config, events));
    }
}

async fn run_connection(config: ClusterConfig, events: mpsc::Sender<ClusterEvent>) {
    let id = generate_connection_id();

    let remote =
        match TcpStream::connect((config.remote_host.as_str(), config.remote_port)).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(tunnel = %config.name, %id, error = %err, "remote connection failed");
                report_dead_after_delay(id, events).await;
                return;
            }
        };

    let local = match TcpStream::connect((config.local_host.as_str(), config.local_port)).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(tunnel = %config.name, %id, error = %err, "local service connection failed");
            report_dead_after_delay(id, events).await;
            return;
        }
    };

    let (shutdown, mut shutdown_rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(id.clone(), shutdown);
    if events.send(ClusterEvent::Opened(handle)).await.is_err() {
        // Supervisor is gone; nothing left to splice for.
        return;
    }

    debug!(tunnel = %config.name, %id, "connection established");

    let (mut remote_read, mut remote_write) = remote.into_split();
    let (mut local_read, mut local_write) = local.into_split();
    let mut transformer = HeaderHostTransformer::new(config.local_host.clone());

    tokio::select! {
        _ = shutdown_rx.recv() => {
            debug!(%id, "connection destroyed");
        }
        res = splice_inbound(&mut remote_read, &mut local_write, &mut transformer) => {
            if let Err(err) = res {
                debug!(%id, error = %err, "inbound splice ended");
            }
        }
        res = tokio::io::copy(&mut local_read, &mut remote_write) => {
            if let Err(err) = res {
                debug!(%id, error = %err, "outbound splice ended");
            }
        }
    }

    let _ = events.send(ClusterEvent::Dead(id)).await;
}

/// Pump remote -> local, rewriting the Host header in the first chunk
async fn splice_inbound(
    remote: &mut OwnedReadHalf,
    local: &mut OwnedWriteHalf,
    transformer: &mut HeaderHostTransformer,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; SPLICE_BUF_SIZE];
    loop {
        let n = remote.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let chunk = transformer.transform(&buf[..n]);
        local.write_all(&chunk).await?;
    }
}

/// Report a connection that never established. The delay keeps the
/// supervisor's replacement policy from spinning against an endpoint that is
/// down; with it, replacement doubles as a fixed-cadence redial loop.
async fn report_dead_after_delay(id: ConnectionId, events: mpsc::Sender<ClusterEvent>) {
    sleep(Duration::from_millis(REDIAL_DELAY_MS)).await;
    let _ = events.send(ClusterEvent::Dead(id)).await;
}
