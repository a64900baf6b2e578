//! Tunnel lifecycle orchestration
//!
//! `Tunnel` performs the broker handshake, then hands the resulting assignment
//! to a supervision loop that keeps the connection pool at its target size:
//! it seeds `max_conn` connections, opens one replacement per dead connection
//! while the pool is open, and destroys every live connection on close. All
//! pool state is mutated inside that single consuming loop, so no locking is
//! needed.

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use local_tunnel_common::{Result, TunnelAssignment, TunnelError};

use crate::broker;
use crate::cluster::{
    Cluster, ClusterConfig, ClusterEvent, ConnectionHandle, ConnectionId, TcpCluster,
};
use crate::config::TunnelConfig;

/// Notifications emitted by a running tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelEvent {
    /// The first forwarding connection is live; the tunnel is usable.
    /// Emitted exactly once, strictly after the first connection opens.
    Url(String),
    /// The tunnel has shut down
    Closed,
}

/// Pool bookkeeping owned by the supervision loop
#[derive(Debug)]
struct PoolState {
    target: u8,
    live: usize,
    closed: bool,
}

impl PoolState {
    fn new(target: u8) -> Self {
        Self {
            target,
            live: 0,
            closed: false,
        }
    }

    fn connection_opened(&mut self) {
        self.live = self.live.saturating_add(1);
    }

    fn connection_dead(&mut self) {
        self.live = self.live.saturating_sub(1);
    }
}

/// A tunnel between a public endpoint and a local service.
///
/// Created with [`Tunnel::new`], started with [`Tunnel::open`] (once per
/// instance), observed through [`Tunnel::next_event`] and shut down with
/// [`Tunnel::close`]. Dropping the tunnel also shuts the pool down.
pub struct Tunnel {
    config: TunnelConfig,
    url: Option<String>,
    opened: bool,
    close_tx: watch::Sender<bool>,
    close_rx: watch::Receiver<bool>,
    events_tx: Option<mpsc::Sender<TunnelEvent>>,
    events_rx: mpsc::Receiver<TunnelEvent>,
}

impl Tunnel {
    pub fn new(config: TunnelConfig) -> Self {
        let (close_tx, close_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::channel(16);

        Self {
            config,
            url: None,
            opened: false,
            close_tx,
            close_rx,
            events_tx: Some(events_tx),
            events_rx,
        }
    }

    /// Negotiate an assignment with the broker and start the connection pool.
    ///
    /// Blocks until the broker answers, retrying transport failures forever at
    /// a 1 second cadence. A broker rejection is terminal and surfaced as
    /// [`TunnelError::BrokerRejected`]; individual connection failures after
    /// that are never surfaced, only logged. May be called once per instance.
    pub async fn open(&mut self) -> Result<()> {
        if self.opened {
            return Err(TunnelError::AlreadyOpen);
        }
        self.opened = true;

        let assignment = broker::negotiate(&self.config).await?;
        info!(
            name = %assignment.name,
            url = %assignment.url,
            max_conn = assignment.max_conn,
            "tunnel assigned"
        );

        let (cluster, cluster_events) = TcpCluster::new(ClusterConfig::new(
            &assignment,
            self.config.local_host.clone(),
            self.config.local_port,
        ));

        self.url = Some(assignment.url.clone());

        let events_tx = self.events_tx.take().unwrap_or_else(|| {
            // opened flag guards this; keep a fallback channel just in case
            mpsc::channel(1).0
        });

        tokio::spawn(supervise(
            cluster,
            cluster_events,
            self.close_rx.clone(),
            events_tx,
            assignment,
        ));

        Ok(())
    }

    /// Public URL granted by the broker, available once `open` has returned.
    /// The [`TunnelEvent::Url`] notification additionally signals that the
    /// first physical connection is up.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Next notification from the supervision loop. Yields `None` once the
    /// tunnel has shut down and drained.
    pub async fn next_event(&mut self) -> Option<TunnelEvent> {
        self.events_rx.recv().await
    }

    /// Shut the tunnel down: no more replacement connections, every live
    /// connection is destroyed. Idempotent, and safe to call before `open`
    /// completes; connections the pool produces afterwards are destroyed on
    /// arrival.
    pub fn close(&self) {
        let _ = self.close_tx.send(true);
    }
}

/// The pool supervision loop. Consumes cluster lifecycle events one at a time
/// and reacts: admit or destroy opened connections, replace dead ones, tear
/// everything down when the close signal fires or the `Tunnel` is dropped.
async fn supervise<C: Cluster>(
    driver: C,
    mut cluster_events: mpsc::Receiver<ClusterEvent>,
    mut close_rx: watch::Receiver<bool>,
    notifications: mpsc::Sender<TunnelEvent>,
    assignment: TunnelAssignment,
) {
    let mut driver = Some(driver);

    // Seed the pool to its target size, unconditionally.
    if let Some(driver) = driver.as_mut() {
        for _ in 0..assignment.max_conn {
            driver.open();
        }
    }

    let mut pool = PoolState::new(assignment.max_conn);
    let mut live: HashMap<ConnectionId, ConnectionHandle> = HashMap::new();
    let mut url_announced = false;

    // close() may have fired before this task started
    if *close_rx.borrow_and_update() {
        close_pool(&mut pool, &mut live, &mut driver, &notifications).await;
    }

    loop {
        tokio::select! {
            changed = close_rx.changed(), if !pool.closed => {
                // A dropped Tunnel counts as close
                if changed.is_err() || *close_rx.borrow_and_update() {
                    close_pool(&mut pool, &mut live, &mut driver, &notifications).await;
                }
            }
            event = cluster_events.recv() => {
                let Some(event) = event else { break };
                match event {
                    ClusterEvent::Opened(conn) => {
                        pool.connection_opened();
                        debug!(
                            id = %conn.id(),
                            live = pool.live,
                            target = pool.target,
                            "connection open"
                        );

                        if pool.closed {
                            // close() raced the dial; discard it right away
                            conn.destroy();
                        } else {
                            if !url_announced {
                                url_announced = true;
                                let _ = notifications
                                    .send(TunnelEvent::Url(assignment.url.clone()))
                                    .await;
                            }
                            // Registered for destroy-on-close; the entry is
                            // removed again if the connection dies first.
                            live.insert(conn.id().to_string(), conn);
                        }
                    }
                    ClusterEvent::Dead(id) => {
                        pool.connection_dead();
                        debug!(
                            %id,
                            live = pool.live,
                            target = pool.target,
                            "connection dead"
                        );
                        live.remove(&id);

                        if !pool.closed {
                            if let Some(driver) = driver.as_mut() {
                                driver.open();
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn close_pool<C>(
    pool: &mut PoolState,
    live: &mut HashMap<ConnectionId, ConnectionHandle>,
    driver: &mut Option<C>,
    notifications: &mpsc::Sender<TunnelEvent>,
) {
    pool.closed = true;

    for (_, conn) in live.drain() {
        conn.destroy();
    }

    info!("tunnel closed");
    let _ = notifications.send(TunnelEvent::Closed).await;

    // Dropping the driver lets the event channel drain once the last
    // connection is gone, which ends the supervision loop.
    *driver = None;
}
