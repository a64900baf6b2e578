//! Self-healing tunnel client
//!
//! The client negotiates a public endpoint with a tunnel broker, then keeps a
//! pool of TCP forwarding connections between that endpoint and a local
//! service, replacing connections as they die. Inbound traffic has its `Host`
//! header rewritten so forwarded requests address the local service.
//!
//! ```no_run
//! use local_tunnel_client::{Tunnel, TunnelConfig, TunnelEvent};
//!
//! # async fn run() -> local_tunnel_common::Result<()> {
//! let mut tunnel = Tunnel::new(TunnelConfig::new(3000));
//! tunnel.open().await?;
//!
//! while let Some(event) = tunnel.next_event().await {
//!     match event {
//!         TunnelEvent::Url(url) => println!("tunnel live at {url}"),
//!         TunnelEvent::Closed => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod broker;
pub mod cluster;
mod config;
mod transform;
mod tunnel;

pub use config::TunnelConfig;
pub use transform::HeaderHostTransformer;
pub use tunnel::{Tunnel, TunnelEvent};
