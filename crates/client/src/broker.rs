//! Broker handshake
//!
//! One GET request to the broker yields the tunnel assignment. Transport-level
//! failures are retried forever at a fixed 1 second cadence (the policy is to
//! block until the broker is reachable, not to back off and give up); a non-200
//! answer is terminal and carries the broker's message when one is present.

use tokio::time::{Duration, sleep};
use tracing::{debug, warn};
use url::Url;

use local_tunnel_common::constants::HANDSHAKE_RETRY_DELAY_MS;
use local_tunnel_common::protocol::{BrokerErrorResponse, BrokerResponse};
use local_tunnel_common::{Result, TunnelAssignment, TunnelError};

use crate::config::TunnelConfig;

/// Build the handshake request target: `/{subdomain}` when a specific
/// subdomain is requested, `?new=true` otherwise, plus `relative=true` when
/// relative redirects are wanted.
pub(crate) fn broker_url(config: &TunnelConfig) -> Result<Url> {
    let mut url = Url::parse(&config.host)?;

    if let Some(subdomain) = &config.subdomain {
        url.set_path(&format!("/{subdomain}"));
    } else {
        url.query_pairs_mut().append_pair("new", "true");
    }

    if config.relative {
        url.query_pairs_mut().append_pair("relative", "true");
    }

    Ok(url)
}

/// Negotiate a tunnel assignment with the broker. Runs until the broker
/// answers; only a broker rejection makes it return an error.
pub(crate) async fn negotiate(config: &TunnelConfig) -> Result<TunnelAssignment> {
    let target = broker_url(config)?;
    let remote_host = target
        .host_str()
        .map(str::to_string)
        .ok_or(TunnelError::InvalidUrl(url::ParseError::EmptyHost))?;

    let client = reqwest::Client::new();
    debug!(%target, "requesting tunnel assignment");

    loop {
        let response = match client.get(target.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                let err = TunnelError::BrokerUnreachable(err.to_string());
                warn!(error = %err, "retrying in 1s");
                sleep(Duration::from_millis(HANDSHAKE_RETRY_DELAY_MS)).await;
                continue;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            let message = response
                .json::<BrokerErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| {
                    "tunnel server returned an error, please try again".to_string()
                });
            return Err(TunnelError::BrokerRejected(message));
        }

        let body: BrokerResponse = response
            .json()
            .await
            .map_err(|err| TunnelError::BrokerRejected(format!("invalid broker response: {err}")))?;

        return Ok(TunnelAssignment::from_response(remote_host.clone(), body));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(10);

    fn config(host: &str) -> TunnelConfig {
        TunnelConfig::new(3000).with_host(host)
    }

    #[test]
    fn test_url_with_subdomain_has_path_and_no_new_param() {
        let config = config("https://localtunnel.me").with_subdomain("myapp");

        let url = broker_url(&config).unwrap();
        assert_eq!(url.path(), "/myapp");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_url_without_subdomain_requests_new() {
        let url = broker_url(&config("https://localtunnel.me")).unwrap();

        assert_eq!(url.path(), "/");
        assert_eq!(url.query(), Some("new=true"));
    }

    #[test]
    fn test_url_with_relative_flag() {
        let url = broker_url(&config("https://localtunnel.me").with_relative(true)).unwrap();
        assert_eq!(url.query(), Some("new=true&relative=true"));

        let url = broker_url(
            &config("https://localtunnel.me")
                .with_subdomain("myapp")
                .with_relative(true),
        )
        .unwrap();
        assert_eq!(url.path(), "/myapp");
        assert_eq!(url.query(), Some("relative=true"));
    }

    #[test]
    fn test_url_rejects_invalid_broker_address() {
        assert!(matches!(
            broker_url(&config("not a url")),
            Err(TunnelError::InvalidUrl(_))
        ));
    }

    /// One-shot HTTP broker on loopback; resolves to the captured request head
    async fn canned_broker(status: &'static str, body: &'static str) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request
        });

        (addr, handle)
    }

    #[tokio::test]
    async fn test_negotiate_success_defaults_max_conn() {
        let (addr, server) = canned_broker(
            "200 OK",
            r#"{"id":"abc","port":5000,"url":"https://abc.example.com"}"#,
        )
        .await;

        let config = config(&format!("http://{addr}"));
        let assignment = timeout(WAIT, negotiate(&config)).await.unwrap().unwrap();

        assert_eq!(assignment.remote_host, "127.0.0.1");
        assert_eq!(assignment.remote_port, 5000);
        assert_eq!(assignment.name, "abc");
        assert_eq!(assignment.url, "https://abc.example.com");
        assert_eq!(assignment.max_conn, 1);

        let request = server.await.unwrap();
        assert!(
            request.starts_with("GET /?new=true HTTP/1.1\r\n"),
            "got: {request}"
        );
    }

    #[tokio::test]
    async fn test_negotiate_rejected_uses_broker_message() {
        let (addr, _server) = canned_broker(
            "503 Service Unavailable",
            r#"{"message":"server is busy"}"#,
        )
        .await;

        let err = timeout(WAIT, negotiate(&config(&format!("http://{addr}"))))
            .await
            .unwrap()
            .unwrap_err();

        match err {
            TunnelError::BrokerRejected(message) => assert_eq!(message, "server is busy"),
            other => panic!("expected BrokerRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_negotiate_rejected_without_message_is_generic() {
        let (addr, _server) = canned_broker("404 Not Found", "{}").await;

        let err = timeout(WAIT, negotiate(&config(&format!("http://{addr}"))))
            .await
            .unwrap()
            .unwrap_err();

        match err {
            TunnelError::BrokerRejected(message) => {
                assert_eq!(message, "tunnel server returned an error, please try again")
            }
            other => panic!("expected BrokerRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_negotiate_retries_transport_failures() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // First connection is dropped without a response (transport failure);
        // the second gets a proper answer.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);

            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let body = r#"{"id":"abc","port":5000,"url":"https://abc.example.com"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let assignment = timeout(WAIT, negotiate(&config(&format!("http://{addr}"))))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(assignment.name, "abc");
        server.await.unwrap();
    }
}
