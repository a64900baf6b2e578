/// Default broker endpoint when the caller does not override it
pub const DEFAULT_BROKER_URL: &str = "https://localtunnel.me";

/// Default host the local service listens on
pub const DEFAULT_LOCAL_HOST: &str = "localhost";

/// Connection count used when the broker omits `max_conn_count`
pub const DEFAULT_MAX_CONN: u8 = 1;

/// Delay between handshake attempts while the broker is unreachable (1 second,
/// fixed; the handshake deliberately retries forever without backoff)
pub const HANDSHAKE_RETRY_DELAY_MS: u64 = 1000;

/// Delay before reporting a connection dead when dialing failed, so pool
/// replacement does not spin against an unreachable endpoint
pub const REDIAL_DELAY_MS: u64 = 1000;

/// Read buffer size for the per-connection splice loops
pub const SPLICE_BUF_SIZE: usize = 8 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_values() {
        // These are compile-time checks for constant sanity
        // Even though they're optimized out, they document constraints
        const _: () = assert!(DEFAULT_MAX_CONN >= 1, "Pool must seed at least one connection");
        const _: () = assert!(HANDSHAKE_RETRY_DELAY_MS == 1000, "Retry cadence is fixed at 1s");
        const _: () = assert!(SPLICE_BUF_SIZE >= 1024);

        assert!(DEFAULT_BROKER_URL.starts_with("https://"));
        assert_eq!(DEFAULT_LOCAL_HOST, "localhost");
    }
}
