//! Counters exposed on the control plane.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cumulative event counters, shared by the DNS loops and the HTTP
/// server. All increments are relaxed; nothing orders on these.
#[derive(Default)]
pub struct Stats {
    /// Datagrams received on the client-facing socket.
    pub questions: AtomicU64,
    /// Queries answered with a forged response.
    pub blocked: AtomicU64,
    /// Upstream answers relayed back to a client.
    pub relayed: AtomicU64,
    /// Forwarded queries that never got an upstream answer in time.
    pub timed_out: AtomicU64,
    /// Malformed or unsupported queries dropped without a response.
    pub parse_errors: AtomicU64,
    /// Socket write failures on forge, forward or relay.
    pub send_failures: AtomicU64,
    /// Upstream answers with no waiting client (late or unknown ID).
    pub dropped_answers: AtomicU64,
    /// Tracking pixels served over HTTP.
    pub pixels_served: AtomicU64,
}

/// Point-in-time copy of [`Stats`], shaped for the JSON endpoint.
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub questions: u64,
    pub blocked: u64,
    pub relayed: u64,
    pub timed_out: u64,
    pub parse_errors: u64,
    pub send_failures: u64,
    pub dropped_answers: u64,
    pub pixels_served: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            questions: self.questions.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            relayed: self.relayed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            dropped_answers: self.dropped_answers.load(Ordering::Relaxed),
            pixels_served: self.pixels_served.load(Ordering::Relaxed),
        }
    }
}

/// Relaxed add-one, the only way these counters move.
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_bumps() {
        let stats = Stats::new();

        bump(&stats.questions);
        bump(&stats.questions);
        bump(&stats.blocked);

        let snap = stats.snapshot();
        assert_eq!(snap.questions, 2);
        assert_eq!(snap.blocked, 1);
        assert_eq!(snap.relayed, 0);
    }
}
