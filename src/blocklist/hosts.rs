//! Hosts file zone extraction.
//!
//! Parses the `/etc/hosts` format used by deny-lists such as Steven Black's
//! hosts file and yields the zones that should be refused.

use super::allow::AllowPatternSet;
use super::zone::Zone;

/// IP address that marks a denied entry.
pub const DENY_IP: &str = "0.0.0.0";

/// Per-source extraction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Zones emitted.
    pub accepted: usize,
    /// Entries whose zone token failed validation.
    pub rejected: usize,
    /// Valid zones suppressed by the allow-list.
    pub allowed: usize,
}

/// Lazy zone extractor over the lines of one hosts-format deny-list.
///
/// # Extraction Rules
///
/// - Empty lines and lines starting with `#` are ignored
/// - Only `0.0.0.0 <zone>` lines are considered; other addresses, lines with
///   a single field and self-mapped `0.0.0.0 0.0.0.0` entries are skipped
///   silently
/// - Fields after the zone are not inspected
/// - Zones with characters outside `[-_.A-Za-z0-9]` are logged and skipped
/// - Zones matched by the allow-list are skipped
///
/// The extractor is a single pass over its lines: each call to `next`
/// consumes lines until it can yield a zone or the input runs out.
///
/// # Example
///
/// ```
/// use unbound_blocklist::blocklist::{AllowPatternSet, ZoneExtractor};
///
/// let allow = AllowPatternSet::new([r"^ads\."]).unwrap();
/// let content = "0.0.0.0 ads.example.com\n0.0.0.0 tracker.example.com\n";
/// let zones: Vec<_> = ZoneExtractor::new(content.lines(), "hosts", &allow)
///     .map(|z| z.to_string())
///     .collect();
/// assert_eq!(zones, vec!["tracker.example.com"]);
/// ```
pub struct ZoneExtractor<'a, L> {
    lines: L,
    source: &'a str,
    allow: &'a AllowPatternSet,
    stats: ExtractStats,
}

impl<'a, L> ZoneExtractor<'a, L> {
    /// Create an extractor. `source` names the deny-list in log messages.
    pub fn new(lines: L, source: &'a str, allow: &'a AllowPatternSet) -> Self {
        Self {
            lines,
            source,
            allow,
            stats: ExtractStats::default(),
        }
    }

    /// Counters for the lines consumed so far.
    #[must_use]
    pub const fn stats(&self) -> ExtractStats {
        self.stats
    }
}

impl<'l, L: Iterator<Item = &'l str>> Iterator for ZoneExtractor<'_, L> {
    type Item = Zone;

    fn next(&mut self) -> Option<Zone> {
        for line in self.lines.by_ref() {
            let Some(token) = deny_target(line) else {
                continue;
            };

            let Ok(zone) = Zone::parse(token) else {
                tracing::warn!(zone = %token, url = %self.source, "skipping bad zone");
                self.stats.rejected += 1;
                continue;
            };

            if self.allow.matches(zone.as_str()) {
                self.stats.allowed += 1;
                continue;
            }

            self.stats.accepted += 1;
            return Some(zone);
        }
        None
    }
}

/// Returns the zone token of a `0.0.0.0 <zone>` line.
fn deny_target(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut fields = trimmed.split_whitespace();
    let ip = fields.next()?;
    let zone = fields.next()?;
    if ip != DENY_IP || zone == DENY_IP {
        return None;
    }
    Some(zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Log sink shared between the subscriber and the assertions.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn warnings(&self) -> Vec<String> {
            let raw = self.0.lock().unwrap();
            String::from_utf8_lossy(&raw)
                .lines()
                .filter(|line| line.contains("WARN"))
                .map(str::to_owned)
                .collect()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn extract(content: &str, allow: &AllowPatternSet) -> (Vec<String>, ExtractStats) {
        let mut extractor = ZoneExtractor::new(content.lines(), "test", allow);
        let zones = extractor.by_ref().map(|zone| zone.to_string()).collect();
        (zones, extractor.stats())
    }

    fn extract_all(content: &str) -> (Vec<String>, ExtractStats) {
        extract(content, &AllowPatternSet::default())
    }

    #[test]
    fn test_simple_hosts() {
        let (zones, stats) = extract_all("0.0.0.0 ads.example.com");
        assert_eq!(zones, vec!["ads.example.com"]);
        assert_eq!(stats.accepted, 1);
    }

    #[test]
    fn test_only_first_zone_is_used() {
        let (zones, _) = extract_all("0.0.0.0 ads.example.com tracker.example.com");
        assert_eq!(zones, vec!["ads.example.com"]);
    }

    #[test]
    fn test_trailing_comment_ignored() {
        let (zones, _) = extract_all("0.0.0.0 ads.example.com # inline comment");
        assert_eq!(zones, vec!["ads.example.com"]);
    }

    #[test]
    fn test_comments() {
        let (zones, _) = extract_all("# Comment\n0.0.0.0 ads.example.com\n   # Another comment");
        assert_eq!(zones, vec!["ads.example.com"]);
    }

    #[test]
    fn test_non_deny_shapes_skipped_silently() {
        let content = r"
127.0.0.1 localhost
127.0.0.1 ads.example.com
0.0.0.0
0.0.0.0 0.0.0.0
not-a-valid-line
192.168.1.1 router.lan
";
        let (zones, stats) = extract_all(content);
        assert!(zones.is_empty());
        assert_eq!(stats, ExtractStats::default());
    }

    #[test]
    fn test_bad_zone_rejected_once_per_line() {
        let content = "0.0.0.0 bad/zone!\n0.0.0.0 good.example.com\n0.0.0.0 also*bad.com\n";
        let (zones, stats) = extract_all(content);
        assert_eq!(zones, vec!["good.example.com"]);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.accepted, 1);
    }

    #[test]
    fn test_bad_zone_logs_one_warning_naming_zone_and_source() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let allow = AllowPatternSet::default();
        let content = "0.0.0.0 bad/zone!\n0.0.0.0 good.example.com\n0.0.0.0 also*bad.com\n";
        let zones: Vec<_> = tracing::subscriber::with_default(subscriber, || {
            ZoneExtractor::new(content.lines(), "https://lists.example/hosts", &allow)
                .map(|zone| zone.to_string())
                .collect()
        });

        assert_eq!(zones, vec!["good.example.com"]);
        let warnings = logs.warnings();
        assert_eq!(warnings.len(), 2, "{warnings:?}");
        assert!(warnings[0].contains("bad/zone!"), "{}", warnings[0]);
        assert!(warnings[0].contains("https://lists.example/hosts"), "{}", warnings[0]);
        assert!(warnings[1].contains("also*bad.com"), "{}", warnings[1]);
        assert!(warnings.iter().all(|w| !w.contains("good.example.com")));
    }

    #[test]
    fn test_allowed_zones_excluded() {
        let allow = AllowPatternSet::new([r"^ads\.", "cdn"]).unwrap();
        let content = "0.0.0.0 ads.example.com\n0.0.0.0 tracker.example.com\n0.0.0.0 img.cdn.net\n";
        let (zones, stats) = extract(content, &allow);
        assert_eq!(zones, vec!["tracker.example.com"]);
        assert_eq!(stats.allowed, 2);
        assert_eq!(stats.accepted, 1);
    }

    #[test]
    fn test_allow_patterns_not_applied_to_bad_zones() {
        let allow = AllowPatternSet::new(["bad"]).unwrap();
        let (zones, stats) = extract("0.0.0.0 bad/zone!", &allow);
        assert!(zones.is_empty());
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.allowed, 0);
    }

    #[test]
    fn test_mixed_sample() {
        let allow = AllowPatternSet::new([r"^ads\."]).unwrap();
        let content = "0.0.0.0 ads.example.com\n0.0.0.0 tracker.example.com extra-comment\n0.0.0.0 0.0.0.0\nnot-a-valid-line\n";
        let (zones, stats) = extract(content, &allow);
        assert_eq!(zones, vec!["tracker.example.com"]);
        assert_eq!(
            stats,
            ExtractStats {
                accepted: 1,
                rejected: 0,
                allowed: 1
            }
        );
    }

    #[test]
    fn test_source_order_preserved_without_dedup() {
        let content = "0.0.0.0 b.com\n0.0.0.0 a.com\n0.0.0.0 b.com\n";
        let (zones, _) = extract_all(content);
        assert_eq!(zones, vec!["b.com", "a.com", "b.com"]);
    }

    #[test]
    fn test_whitespace_variations() {
        let (zones, _) = extract_all("  0.0.0.0 \t  ads.example.com   \n0.0.0.0\ttracker.example.com\t");
        assert_eq!(zones, vec!["ads.example.com", "tracker.example.com"]);
    }

    #[test]
    fn test_windows_line_endings() {
        let (zones, _) = extract_all("0.0.0.0 ads.example.com\r\n0.0.0.0 tracker.example.com\r\n");
        assert_eq!(zones, vec!["ads.example.com", "tracker.example.com"]);
    }

    #[test]
    fn test_empty_input() {
        let (zones, stats) = extract_all("");
        assert!(zones.is_empty());
        assert_eq!(stats, ExtractStats::default());
    }

    #[test]
    fn test_steven_black_sample() {
        let content = r"
# Title: StevenBlack/hosts
# ==========================================

127.0.0.1 localhost
127.0.0.1 localhost.localdomain
255.255.255.255 broadcasthost
::1 localhost ip6-localhost ip6-loopback
fe80::1%lo0 localhost
0.0.0.0 0.0.0.0

# Start of blocklist
0.0.0.0 1-1ads.com
0.0.0.0 101com.com
0.0.0.0 101order.com
0.0.0.0 123found.com
";
        let (zones, _) = extract_all(content);
        assert_eq!(
            zones,
            vec!["1-1ads.com", "101com.com", "101order.com", "123found.com"]
        );
    }

    #[test]
    fn test_is_lazy() {
        let content = "0.0.0.0 first.com\n0.0.0.0 second.com\n";
        let allow = AllowPatternSet::default();
        let mut extractor = ZoneExtractor::new(content.lines(), "test", &allow);

        let first = extractor.next().unwrap();
        assert_eq!(first.as_str(), "first.com");
        assert_eq!(extractor.stats().accepted, 1);

        assert_eq!(extractor.next().unwrap().as_str(), "second.com");
        assert!(extractor.next().is_none());
        assert!(extractor.next().is_none());
    }

    #[test]
    fn test_deny_target() {
        assert_eq!(deny_target("0.0.0.0 example.com"), Some("example.com"));
        assert_eq!(deny_target("0.0.0.0 example.com extra"), Some("example.com"));
        assert_eq!(deny_target("0.0.0.0 0.0.0.0"), None);
        assert_eq!(deny_target("127.0.0.1 example.com"), None);
        assert_eq!(deny_target("0.0.0.0"), None);
        assert_eq!(deny_target("#0.0.0.0 example.com"), None);
        assert_eq!(deny_target(""), None);
    }
}
