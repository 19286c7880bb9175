use clap::Parser;
use nat64dns_domain::CliOverrides;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "nat64dns")]
#[command(version)]
#[command(about = "DNS64 resolver with a synthetic-name zone for NAT64 deployments")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address, repeatable (e.g. [::]:53)
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    bind: Vec<String>,

    /// File holding the NAT64 prefix
    #[arg(long, value_name = "PATH")]
    prefix_file: Option<PathBuf>,

    /// Directory the prefix file must resolve inside
    #[arg(long, value_name = "DIR")]
    allowed_root: Option<PathBuf>,

    /// Upstream resolver, repeatable (e.g. 127.0.0.53:53)
    #[arg(short = 'u', long = "upstream", value_name = "ADDR")]
    upstream: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        bind_addresses: cli.bind,
        upstream_servers: cli.upstream,
        prefix_file_path: cli.prefix_file,
        allowed_root: cli.allowed_root,
        log_level: cli.log_level,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config)?;

    info!("Starting nat64dns v{}", env!("CARGO_PKG_VERSION"));

    let services = di::DnsServices::new(&config)?;
    services.prime_prefix().await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    if let Err(e) = server::start_dns_servers(&config, &services, shutdown).await {
        error!(error = %e, "DNS server error");
        return Err(e);
    }

    let stats = services.pool.stats();
    info!(
        sockets_created = stats.total_created,
        reuse_rate = stats.reuse_rate(),
        saturated = stats.total_saturated,
        prefix_refreshes = services.prefixes.refresh_count(),
        "Server shutdown complete"
    );
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal(shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
                _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C, shutting down");
        }
    }
    shutdown.cancel();
}

#[cfg(not(unix))]
async fn wait_for_signal(shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl-C, shutting down");
    }
    shutdown.cancel();
}
