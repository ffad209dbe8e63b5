use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sinkhole::proxy::{self, ProxyConfig};

#[derive(Parser)]
#[command(name = "sinkhole")]
#[command(about = "DNS-level ad and tracker blocking proxy", long_about = None)]
struct Args {
    /// Real upstream DNS resolver (host:port)
    #[arg(short, long, default_value = "8.8.8.8:53")]
    upstream: SocketAddr,

    /// IPv4 address to bind on; blocked domains resolve to this address
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: Ipv4Addr,

    /// UDP port of the DNS listener
    #[arg(long, default_value_t = 53)]
    dns_port: u16,

    /// TCP port of the pixel/control HTTP server
    #[arg(long, default_value_t = 80)]
    http_port: u16,

    /// Upstream query timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    /// Blocklist source: file path or http(s) URL, one domain per line
    #[arg(short = 'l', long)]
    blocklist: String,

    /// Shared secret protecting the /debug control endpoints
    #[arg(short, long)]
    key: String,

    /// Log every query decision
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "sinkhole=debug"
    } else {
        "sinkhole=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    proxy::run(ProxyConfig {
        bind_ip: args.bind,
        dns_port: args.dns_port,
        http_port: args.http_port,
        upstream: args.upstream,
        query_timeout: Duration::from_secs(args.timeout),
        blocklist: args.blocklist,
        admin_key: args.key,
    })
    .await
}
