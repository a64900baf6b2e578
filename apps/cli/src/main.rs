use anyhow::Result;
use clap::Parser;
use local_tunnel_client::{Tunnel, TunnelConfig, TunnelEvent};
use local_tunnel_common::validate_subdomain;
use tracing::info;

/// CLI arguments for the tunnel client
#[derive(Parser, Debug)]
#[command(name = "ltc")]
#[command(about = "Expose a local service through a public tunnel", long_about = None)]
#[command(version)]
struct Args {
    /// Local port to expose
    #[arg(short, long)]
    port: u16,

    /// Host the local service listens on
    #[arg(long, default_value = "localhost")]
    local_host: String,

    /// Request a specific subdomain
    #[arg(short, long)]
    subdomain: Option<String>,

    /// Tunnel broker base URL
    #[arg(long, env = "LTC_HOST", default_value = "https://localtunnel.me")]
    host: String,

    /// Ask the server for relative redirects
    #[arg(long)]
    relative: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> TunnelConfig {
        let mut config = TunnelConfig::new(self.port)
            .with_host(self.host)
            .with_local_host(self.local_host)
            .with_relative(self.relative);

        if let Some(subdomain) = self.subdomain {
            config = config.with_subdomain(subdomain);
        }

        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if let Some(subdomain) = &args.subdomain {
        validate_subdomain(subdomain)?;
    }

    info!("Local Tunnel Client v{}", env!("CARGO_PKG_VERSION"));
    info!("Local service: {}:{}", args.local_host, args.port);
    info!("Broker: {}", args.host);

    let mut tunnel = Tunnel::new(args.into_config());
    tunnel.open().await?;

    if let Some(url) = tunnel.url() {
        info!("Assigned URL: {url}");
    }

    loop {
        tokio::select! {
            event = tunnel.next_event() => match event {
                Some(TunnelEvent::Url(url)) => info!("Tunnel is live at {url}"),
                Some(TunnelEvent::Closed) | None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down gracefully...");
                tunnel.close();
            }
        }
    }

    Ok(())
}
