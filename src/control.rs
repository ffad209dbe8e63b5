//! HTTP control plane and tracking-pixel responder.
//!
//! Blocked domains resolve to the proxy itself, so stray HTTP requests
//! from ad slots land here and are absorbed with a 1x1 transparent GIF.
//! The `/debug` routes expose counters and the two admin actions
//! (blocklist reload, blocking toggle), gated by a shared key.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::proxy::ProxyState;
use crate::stats::{StatsSnapshot, bump};

/// A 1x1 transparent GIF, byte for byte.
const PIXEL: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff,
    0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// Serve the control plane on an already-bound listener.
pub async fn serve(listener: TcpListener, state: Arc<ProxyState>) {
    if let Err(e) = axum::serve(listener, router(state)).await {
        error!(error = %e, "control server failed");
    }
}

fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/debug/vars", get(vars))
        .route("/debug/reload", get(reload))
        .route("/debug/toggle", get(toggle))
        .fallback(pixel)
        .with_state(state)
}

/// Counters body for `/debug/vars`.
#[derive(Serialize)]
struct Vars {
    #[serde(flatten)]
    stats: StatsSnapshot,
    rules: usize,
    pending: usize,
    blocking: bool,
}

#[derive(Deserialize)]
struct AuthQuery {
    key: Option<String>,
}

/// Check the shared key; unauthorized requests are logged and the
/// action is skipped, but the caller is still redirected to the stats
/// page rather than rejected.
fn authorized(state: &ProxyState, key: Option<&str>, action: &str) -> bool {
    if key == Some(state.admin_key.as_str()) {
        return true;
    }
    warn!(action, "unauthorized control request");
    false
}

async fn vars(State(state): State<Arc<ProxyState>>) -> Json<Vars> {
    Json(Vars {
        stats: state.stats.snapshot(),
        rules: state.filter.rule_count(),
        pending: state.pending.len(),
        blocking: state.filter.blocking_enabled(),
    })
}

async fn reload(
    State(state): State<Arc<ProxyState>>,
    Query(auth): Query<AuthQuery>,
) -> Redirect {
    if authorized(&state, auth.key.as_deref(), "reload") {
        match state.reload_rules().await {
            Ok(count) => info!(rules = count, "rules reloaded"),
            Err(e) => warn!(error = %e, "rules reload failed, keeping previous set"),
        }
    }
    Redirect::to("/debug/vars")
}

async fn toggle(
    State(state): State<Arc<ProxyState>>,
    Query(auth): Query<AuthQuery>,
) -> Redirect {
    if authorized(&state, auth.key.as_deref(), "toggle") {
        let blocking = state.filter.toggle_blocking();
        info!(blocking, "blocking toggled");
    }
    Redirect::to("/debug/vars")
}

/// Every other URL gets the pixel.
async fn pixel(State(state): State<Arc<ProxyState>>) -> impl IntoResponse {
    bump(&state.stats.pixels_served);
    ([(header::CONTENT_TYPE, "image/gif")], PIXEL)
}
