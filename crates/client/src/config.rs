use local_tunnel_common::constants::{DEFAULT_BROKER_URL, DEFAULT_LOCAL_HOST};

/// Caller-supplied tunnel options. Immutable once an open attempt begins.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// Broker base address
    pub host: String,

    /// Specific subdomain to request; a fresh one is allocated when absent
    pub subdomain: Option<String>,

    /// Ask the server for relative redirects
    pub relative: bool,

    /// Host the local service listens on
    pub local_host: String,

    /// Port the local service listens on
    pub local_port: u16,
}

impl TunnelConfig {
    /// Options for exposing `localhost:<local_port>` through the default broker
    pub fn new(local_port: u16) -> Self {
        Self {
            host: DEFAULT_BROKER_URL.to_string(),
            subdomain: None,
            relative: false,
            local_host: DEFAULT_LOCAL_HOST.to_string(),
            local_port,
        }
    }

    /// Override the broker base address
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Request a specific subdomain instead of a freshly allocated one
    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Ask the server for relative redirects
    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    /// Override the host the local service listens on
    pub fn with_local_host(mut self, local_host: impl Into<String>) -> Self {
        self.local_host = local_host.into();
        self
    }
}
