//! The two UDP receive loops and the per-query timeout sweeper.
//!
//! The listener loop owns the client-facing socket: it decodes each
//! query, answers blocked domains itself and forwards the rest on a
//! single connected upstream socket, recording the client in the
//! pending table. The relay loop owns the upstream socket and routes
//! answers back by transaction ID. Each forwarded query also gets one
//! sweeper task that expires its table entry after the configured
//! timeout; whichever of answer and sweeper comes second finds the
//! entry gone and does nothing.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::dns::{HEADER_LEN, Question, forge_block_response};
use crate::proxy::ProxyState;
use crate::stats::bump;

use super::MAX_DNS_PACKET_SIZE;

/// The pair of sockets the proxy serves DNS on.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    upstream: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the client-facing socket on `addr` and connect an ephemeral
    /// socket to the upstream resolver (one long-lived association).
    pub async fn bind(addr: SocketAddr, upstream_addr: SocketAddr) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        let upstream = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        upstream.connect(upstream_addr).await?;

        Ok(Self { socket, upstream })
    }

    /// Address the client-facing socket actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawn the listener and relay loops.
    ///
    /// They run until the process exits; socket errors are logged and
    /// the loops keep going.
    pub fn start(self, state: Arc<ProxyState>) {
        tokio::spawn(listen_loop(
            Arc::clone(&self.socket),
            Arc::clone(&self.upstream),
            Arc::clone(&state),
        ));
        tokio::spawn(relay_loop(self.socket, self.upstream, state));
    }
}

/// Receive client queries: forge answers for blocked domains, forward
/// the rest upstream.
async fn listen_loop(socket: Arc<UdpSocket>, upstream: Arc<UdpSocket>, state: Arc<ProxyState>) {
    let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "client socket recv error");
                continue;
            }
        };
        bump(&state.stats.questions);
        let query = &buf[..len];

        let question = match Question::parse(query) {
            Ok(q) => q,
            Err(e) => {
                debug!(%src, error = %e, "dropping unparseable query");
                bump(&state.stats.parse_errors);
                continue;
            }
        };

        let depth = if state.filter.blocking_enabled() {
            state.filter.match_depth(&question.host)
        } else {
            None
        };

        if let Some(depth) = depth {
            // Blocked queries are answered right here and never enter
            // the pending table. The decision is counted even if the
            // response cannot be delivered; send errors have their own
            // counter.
            bump(&state.stats.blocked);
            debug!(host = %question.host, depth, "blocked");
            let response = forge_block_response(query, &question, &state.template);
            if let Err(e) = socket.send_to(&response, src).await {
                warn!(host = %question.host, error = %e, "blocked-response send failed");
                bump(&state.stats.send_failures);
            }
            continue;
        }

        state
            .pending
            .register(question.id, src, question.host.clone());
        if let Err(e) = upstream.send(query).await {
            warn!(host = %question.host, error = %e, "upstream forward failed");
            bump(&state.stats.send_failures);
            state.pending.resolve(question.id);
            continue;
        }
        debug!(id = question.id, host = %question.host, "forwarded upstream");

        tokio::spawn(expire_after(Arc::clone(&state), question.id));
    }
}

/// Receive upstream answers and relay them to whoever asked.
async fn relay_loop(socket: Arc<UdpSocket>, upstream: Arc<UdpSocket>, state: Arc<ProxyState>) {
    let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

    loop {
        let len = match upstream.recv(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "upstream socket recv error");
                continue;
            }
        };
        if len < HEADER_LEN {
            continue;
        }

        let id = u16::from_be_bytes([buf[0], buf[1]]);
        match state.pending.resolve(id) {
            Some(query) => match socket.send_to(&buf[..len], query.client).await {
                Ok(_) => {
                    bump(&state.stats.relayed);
                    debug!(
                        id,
                        host = %query.host,
                        elapsed = ?query.issued_at.elapsed(),
                        "relayed answer"
                    );
                }
                Err(e) => {
                    warn!(id, host = %query.host, error = %e, "answer relay failed");
                    bump(&state.stats.send_failures);
                }
            },
            // Late or unsolicited answer; nobody is waiting for it.
            None => {
                debug!(id, "dropping answer with no pending query");
                bump(&state.stats.dropped_answers);
            }
        }
    }
}

/// One-shot sweeper for a forwarded query.
async fn expire_after(state: Arc<ProxyState>, id: u16) {
    tokio::time::sleep(state.query_timeout).await;
    if let Some(query) = state.pending.expire(id) {
        bump(&state.stats.timed_out);
        warn!(id, host = %query.host, "upstream answer timed out");
    }
}
