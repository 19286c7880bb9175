#![allow(dead_code)]
use nat64dns_infrastructure::dns::raw_query::question_end;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

#[derive(Debug, Clone)]
pub enum MockBehavior {
    Answer { addresses: Vec<Ipv4Addr>, ttl: u32 },
    NxDomain,
    Refused,
    /// Never responds.
    Silent,
    /// Sends a response with a mismatched ID before the real one.
    WrongIdFirst { addresses: Vec<Ipv4Addr>, ttl: u32 },
    Delayed { delay: Duration, addresses: Vec<Ipv4Addr> },
}

/// Upstream resolver stand-in bound to an ephemeral loopback port.
pub struct MockDnsServer {
    addr: SocketAddr,
    queries: Arc<AtomicUsize>,
    seen_ids: Arc<Mutex<Vec<u16>>>,
    outstanding: Arc<AtomicUsize>,
    peak_outstanding: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    pub async fn start(behavior: MockBehavior) -> Result<Self, std::io::Error> {
        let socket = Arc::new(UdpSocket::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?);
        let addr = socket.local_addr()?;

        let queries = Arc::new(AtomicUsize::new(0));
        let seen_ids = Arc::new(Mutex::new(Vec::new()));
        let outstanding = Arc::new(AtomicUsize::new(0));
        let peak_outstanding = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let server = Self {
            addr,
            queries: Arc::clone(&queries),
            seen_ids: Arc::clone(&seen_ids),
            outstanding: Arc::clone(&outstanding),
            peak_outstanding: Arc::clone(&peak_outstanding),
            shutdown_tx: Some(shutdown_tx),
        };

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = socket.recv_from(&mut buf) => {
                        let Ok((len, peer)) = result else { continue };
                        let query = buf[..len].to_vec();
                        if query.len() < 12 {
                            continue;
                        }
                        queries.fetch_add(1, Ordering::SeqCst);
                        seen_ids
                            .lock()
                            .unwrap()
                            .push(u16::from_be_bytes([query[0], query[1]]));

                        let now = outstanding.fetch_add(1, Ordering::SeqCst) + 1;
                        peak_outstanding.fetch_max(now, Ordering::SeqCst);

                        let socket = Arc::clone(&socket);
                        let outstanding = Arc::clone(&outstanding);
                        let behavior = behavior.clone();
                        tokio::spawn(async move {
                            Self::respond(&socket, peer, &query, &behavior).await;
                            outstanding.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                }
            }
        });

        Ok(server)
    }

    async fn respond(socket: &UdpSocket, peer: SocketAddr, query: &[u8], behavior: &MockBehavior) {
        match behavior {
            MockBehavior::Answer { addresses, ttl } => {
                let response = build_response(query, 0, addresses, *ttl);
                let _ = socket.send_to(&response, peer).await;
            }
            MockBehavior::NxDomain => {
                let _ = socket.send_to(&build_response(query, 3, &[], 0), peer).await;
            }
            MockBehavior::Refused => {
                let _ = socket.send_to(&build_response(query, 5, &[], 0), peer).await;
            }
            MockBehavior::Silent => {}
            MockBehavior::WrongIdFirst { addresses, ttl } => {
                let mut wrong = build_response(query, 0, &[Ipv4Addr::new(10, 9, 9, 9)], *ttl);
                wrong[0] ^= 0xFF;
                let _ = socket.send_to(&wrong, peer).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
                let response = build_response(query, 0, addresses, *ttl);
                let _ = socket.send_to(&response, peer).await;
            }
            MockBehavior::Delayed { delay, addresses } => {
                tokio::time::sleep(*delay).await;
                let response = build_response(query, 0, addresses, 300);
                let _ = socket.send_to(&response, peer).await;
            }
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn seen_ids(&self) -> Vec<u16> {
        self.seen_ids.lock().unwrap().clone()
    }

    pub fn peak_outstanding(&self) -> usize {
        self.peak_outstanding.load(Ordering::SeqCst)
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Response echoing the query's ID and question with one A record per
/// address, each pointing back at the question name.
fn build_response(query: &[u8], rcode: u8, addresses: &[Ipv4Addr], ttl: u32) -> Vec<u8> {
    let end = question_end(query).unwrap_or(query.len());
    let mut response = Vec::with_capacity(512);

    response.extend_from_slice(&query[0..2]);
    response.push(0x80 | (query[2] & 0x01));
    response.push(0x80 | rcode);
    response.extend_from_slice(&[0x00, 0x01]);
    response.extend_from_slice(&(addresses.len() as u16).to_be_bytes());
    response.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    response.extend_from_slice(&query[12..end]);

    for address in addresses {
        response.extend_from_slice(&[0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01]);
        response.extend_from_slice(&ttl.to_be_bytes());
        response.extend_from_slice(&[0x00, 0x04]);
        response.extend_from_slice(&address.octets());
    }

    response
}
