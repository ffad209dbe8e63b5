//! Proxy orchestration.
//!
//! Builds the shared state, binds both servers and runs until a stop
//! signal arrives. In-flight queries are simply abandoned at shutdown,
//! which clients experience exactly like an upstream timeout.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::control;
use crate::dns::AnswerTemplate;
use crate::filter::{self, Filter, SourceError};
use crate::pending::PendingTable;
use crate::stats::Stats;
use crate::transport::udp::UdpTransport;

/// Everything the process needs to start serving.
pub struct ProxyConfig {
    /// IPv4 address both servers bind on; doubles as the forged-answer
    /// address, so blocked lookups land on our own HTTP port.
    pub bind_ip: Ipv4Addr,
    /// UDP port of the DNS listener.
    pub dns_port: u16,
    /// TCP port of the pixel/control HTTP server.
    pub http_port: u16,
    /// Real upstream resolver.
    pub upstream: SocketAddr,
    /// How long a forwarded query may wait for its upstream answer.
    pub query_timeout: Duration,
    /// Blocklist source: file path or http(s) URL.
    pub blocklist: String,
    /// Shared secret for the /debug control endpoints.
    pub admin_key: String,
}

/// State shared by the listener, relay, sweeper tasks and the control
/// plane.
pub struct ProxyState {
    pub filter: Filter,
    pub pending: PendingTable,
    pub stats: Stats,
    pub template: AnswerTemplate,
    pub query_timeout: Duration,
    pub blocklist: String,
    pub admin_key: String,
}

impl ProxyState {
    /// Re-run ingestion and swap the rules in.
    ///
    /// On failure the previously installed rules stay live.
    pub async fn reload_rules(&self) -> Result<usize, SourceError> {
        let rules = filter::load_rules(&self.blocklist).await?;
        Ok(self.filter.install(rules))
    }
}

/// Run the proxy until a stop signal arrives.
///
/// The initial blocklist load and both socket binds are fatal; every
/// failure after startup is logged and counted instead.
pub async fn run(config: ProxyConfig) -> anyhow::Result<()> {
    let rules = filter::load_rules(&config.blocklist)
        .await
        .context("initial blocklist load failed")?;
    info!(rules = rules.len(), source = %config.blocklist, "blocklist loaded");

    let state = Arc::new(ProxyState {
        filter: Filter::new(rules),
        pending: PendingTable::new(),
        stats: Stats::new(),
        template: AnswerTemplate::new(config.bind_ip),
        query_timeout: config.query_timeout,
        blocklist: config.blocklist,
        admin_key: config.admin_key,
    });

    let dns_addr = SocketAddr::from((config.bind_ip, config.dns_port));
    let udp = UdpTransport::bind(dns_addr, config.upstream)
        .await
        .with_context(|| format!("cannot bind DNS listener on {dns_addr}"))?;
    info!(%dns_addr, upstream = %config.upstream, "dns proxy listening");
    udp.start(Arc::clone(&state));

    let http_addr = SocketAddr::from((config.bind_ip, config.http_port));
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("cannot bind HTTP server on {http_addr}"))?;
    info!(%http_addr, "control server listening");
    tokio::spawn(control::serve(listener, Arc::clone(&state)));

    wait_for_signals(&state).await?;
    info!("signal received, stopping");
    Ok(())
}

/// Block until SIGINT/SIGTERM; SIGUSR1 reloads the blocklist in place.
#[cfg(unix)]
async fn wait_for_signals(state: &ProxyState) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut user1 = signal(SignalKind::user_defined1())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = terminate.recv() => return Ok(()),
            _ = user1.recv() => match state.reload_rules().await {
                Ok(count) => info!(rules = count, "rules reloaded on SIGUSR1"),
                Err(e) => warn!(error = %e, "rules reload failed, keeping previous set"),
            },
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_state: &ProxyState) -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
