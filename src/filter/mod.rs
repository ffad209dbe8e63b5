//! DNS query filtering.
//!
//! [`Filter`] pairs the current [`Blocklist`] with the process-wide
//! blocking toggle. The rules are replaced wholesale on reload via
//! `ArcSwap`, so every query decision sees either the complete old set
//! or the complete new one, never a half-built set.

mod blocklist;
pub mod source;

use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;

pub use blocklist::Blocklist;
pub use source::{SourceError, load_rules};

/// Shared blocking state consulted on every query.
pub struct Filter {
    rules: ArcSwap<Blocklist>,
    blocking: AtomicBool,
}

impl Filter {
    /// Start with the given rules and blocking enabled.
    pub fn new(rules: Blocklist) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            blocking: AtomicBool::new(true),
        }
    }

    /// Suffix-match `host` against the current rules.
    ///
    /// Returns the match depth when blocked (see [`Blocklist::matches`]).
    /// Callers decide separately whether blocking is enabled at all.
    pub fn match_depth(&self, host: &str) -> Option<usize> {
        self.rules.load().matches(host)
    }

    /// Swap in a freshly built rule set, returning its size.
    ///
    /// Readers holding the previous set keep using it until their next
    /// lookup.
    pub fn install(&self, rules: Blocklist) -> usize {
        let count = rules.len();
        self.rules.store(std::sync::Arc::new(rules));
        count
    }

    /// Number of rules currently installed.
    pub fn rule_count(&self) -> usize {
        self.rules.load().len()
    }

    /// Whether blocked domains are currently answered with forged
    /// responses (as opposed to being relayed like everything else).
    pub fn blocking_enabled(&self) -> bool {
        self.blocking.load(Ordering::Relaxed)
    }

    /// Flip the blocking toggle, returning the new value.
    pub fn toggle_blocking(&self) -> bool {
        !self.blocking.fetch_xor(true, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_starts_enabled_and_toggles() {
        let filter = Filter::new(Blocklist::empty());

        assert!(filter.blocking_enabled());
        assert!(!filter.toggle_blocking());
        assert!(!filter.blocking_enabled());
        assert!(filter.toggle_blocking());
        assert!(filter.blocking_enabled());
    }

    #[test]
    fn install_replaces_rules_wholesale() {
        let filter = Filter::new(Blocklist::from_domains(["old.example.com"]));

        let count = filter.install(Blocklist::from_domains(["ads.example.com", "tracker.net"]));

        assert_eq!(count, 2);
        assert_eq!(filter.rule_count(), 2);
        assert_eq!(filter.match_depth("old.example.com."), None);
        assert_eq!(filter.match_depth("ads.example.com."), Some(1));
    }

    #[test]
    fn match_depth_reports_suffix_walk() {
        let filter = Filter::new(Blocklist::from_domains(["example.com"]));

        assert_eq!(filter.match_depth("ads.example.com."), Some(2));
        assert_eq!(filter.match_depth("mail.google.com."), None);
    }
}
