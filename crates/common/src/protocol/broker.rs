use serde::{Deserialize, Serialize};

/// Successful broker negotiation body (HTTP 200)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerResponse {
    /// Assigned tunnel name / subdomain
    pub id: String,

    /// Remote port the tunnel server accepts forwarding connections on
    pub port: u16,

    /// Public URL serving the tunnel
    pub url: String,

    /// Maximum number of concurrent forwarding connections the server allows.
    /// Older servers omit this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_conn_count: Option<u8>,
}

/// Error body the broker may attach to a non-success status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
}
