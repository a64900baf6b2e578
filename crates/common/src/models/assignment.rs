use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_CONN;
use crate::protocol::BrokerResponse;

/// Everything the broker granted for one tunnel, produced exactly once per
/// successful handshake and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelAssignment {
    /// Host to dial for forwarding connections (the broker's own host)
    pub remote_host: String,

    /// Port the tunnel server accepts forwarding connections on
    pub remote_port: u16,

    /// Assigned tunnel name / subdomain
    pub name: String,

    /// Public URL serving the tunnel
    pub url: String,

    /// Maximum number of concurrent forwarding connections
    pub max_conn: u8,
}

impl TunnelAssignment {
    /// Build an assignment from a successful broker response. The remote host
    /// is the host the handshake request itself resolved to, not part of the
    /// response body.
    pub fn from_response(remote_host: impl Into<String>, response: BrokerResponse) -> Self {
        Self {
            remote_host: remote_host.into(),
            remote_port: response.port,
            name: response.id,
            url: response.url,
            max_conn: response.max_conn_count.unwrap_or(DEFAULT_MAX_CONN),
        }
    }
}
