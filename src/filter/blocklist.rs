//! Block set and hierarchical domain matching.

use std::fmt;

use rustc_hash::FxHashSet;

/// An immutable set of blocked domains.
///
/// Entries are stored lowercase with a trailing dot, matching the form
/// [`crate::dns::Question::parse`] produces, so membership is plain
/// string equality. A loaded set is never mutated; reloads build a
/// fresh one and swap it in wholesale.
pub struct Blocklist {
    domains: FxHashSet<String>,
}

impl Blocklist {
    /// Build an empty set (used until the first load, and in tests).
    pub fn empty() -> Self {
        Self {
            domains: FxHashSet::default(),
        }
    }

    /// Parse one domain per line, skipping blanks and `#` comments.
    ///
    /// A trailing dot is appended where missing so list files may use
    /// either form.
    pub fn parse(text: &str) -> Self {
        let domains = text
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    return None;
                }
                let mut domain = line.to_lowercase();
                if !domain.ends_with('.') {
                    domain.push('.');
                }
                Some(domain)
            })
            .collect();

        Self { domains }
    }

    /// Build a set directly from owned entries (tests).
    #[cfg(test)]
    pub fn from_domains<I: IntoIterator<Item = &'static str>>(domains: I) -> Self {
        Self::parse(&domains.into_iter().collect::<Vec<_>>().join("\n"))
    }

    /// Hierarchical suffix lookup.
    ///
    /// Tests the host itself, then strips the leftmost label and retries.
    /// A candidate with fewer than two real labels is never tested at
    /// all, so a bare TLD (`"com."`) is not blockable even when the set
    /// contains it verbatim, and one list entry cannot blacklist a whole
    /// TLD.
    ///
    /// Returns the match depth (1 = verbatim hit) for diagnostics.
    pub fn matches(&self, host: &str) -> Option<usize> {
        let mut candidate = host;
        let mut depth = 1;

        loop {
            // Trailing dot included, "b.c." has two dots left.
            if candidate.bytes().filter(|&b| b == b'.').count() < 2 {
                return None;
            }
            if self.domains.contains(candidate) {
                return Some(depth);
            }
            let dot = candidate.find('.')?;
            candidate = &candidate[dot + 1..];
            depth += 1;
        }
    }

    /// Number of entries in the set.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

// Rule sets run to tens of thousands of entries; show the size, not
// the contents.
impl fmt::Debug for Blocklist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blocklist")
            .field("domains", &self.domains.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blanks_and_comments() {
        let list = Blocklist::parse("# header\n\nads.example.com\ntracker.net.\n");

        assert_eq!(list.len(), 2);
        assert_eq!(list.matches("ads.example.com."), Some(1));
        assert_eq!(list.matches("tracker.net."), Some(1));
    }

    #[test]
    fn parse_lowercases_entries() {
        let list = Blocklist::parse("Ads.Example.COM\n");

        assert_eq!(list.matches("ads.example.com."), Some(1));
    }

    #[test]
    fn verbatim_match_is_depth_one() {
        let list = Blocklist::from_domains(["example.com"]);

        assert_eq!(list.matches("example.com."), Some(1));
    }

    #[test]
    fn subdomain_matches_with_strip_count() {
        let list = Blocklist::from_domains(["example.com"]);

        assert_eq!(list.matches("ads.example.com."), Some(2));
        assert_eq!(list.matches("a.b.ads.example.com."), Some(4));
    }

    #[test]
    fn tld_entry_never_matches() {
        let list = Blocklist::from_domains(["com"]);

        assert_eq!(list.matches("evil.com."), None);
        // Even a verbatim bare-TLD host falls below the label floor and
        // is never looked up.
        assert_eq!(list.matches("com."), None);
        assert_eq!(list.matches("localhost."), None);
    }

    #[test]
    fn two_label_candidates_are_still_tested() {
        let list = Blocklist::from_domains(["example.com"]);

        assert_eq!(list.matches("example.com."), Some(1));
        assert_eq!(list.matches("deep.ads.example.com."), Some(3));
    }

    #[test]
    fn suffix_needs_whole_labels() {
        let list = Blocklist::from_domains(["vil.com"]);

        assert_eq!(list.matches("evil.com."), None);
    }

    #[test]
    fn miss_returns_none() {
        let list = Blocklist::from_domains(["ads.example.com"]);

        assert_eq!(list.matches("mail.google.com."), None);
        assert_eq!(list.matches(""), None);
    }

    #[test]
    fn debug_shows_size_not_contents() {
        let list = Blocklist::from_domains(["ads.example.com"]);

        assert_eq!(format!("{list:?}"), "Blocklist { domains: 1 }");
    }
}
