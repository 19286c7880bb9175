use crate::di::DnsServices;
use anyhow::Context;
use nat64dns_domain::Config;
use nat64dns_infrastructure::dns::UdpDnsServer;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Binds every configured address, then serves until `shutdown` fires.
/// A bind failure on any address aborts startup before anything is served.
pub async fn start_dns_servers(
    config: &Config,
    services: &DnsServices,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut servers = Vec::with_capacity(config.server.bind_addresses.len());
    for bind_addr in &config.server.bind_addresses {
        let socket_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", bind_addr))?;
        let socket = create_udp_socket(socket_addr)
            .with_context(|| format!("Failed to bind {}", socket_addr))?;

        servers.push(UdpDnsServer::new(
            Arc::new(socket),
            Arc::clone(&services.dispatcher),
            Arc::clone(&services.limiter),
            config.server.admission,
        ));
    }

    info!(listeners = servers.len(), "DNS server ready");

    let mut join_set: JoinSet<()> = JoinSet::new();
    for server in servers {
        join_set.spawn(server.run(shutdown.clone()));
    }

    while join_set.join_next().await.is_some() {}
    Ok(())
}

fn create_udp_socket(socket_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let domain = if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}
