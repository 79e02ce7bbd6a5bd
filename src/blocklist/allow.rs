//! Allow-list patterns.
//!
//! The allow-list is a plain text document with one regular expression per
//! line. Zones matched by any pattern are never written to the blocklist.

use std::io::BufRead;

use regex::Regex;

/// Error type for allow-list parsing.
#[derive(Debug, thiserror::Error)]
pub enum AllowListError {
    /// I/O error during reading.
    #[error("I/O error reading allow-list: {0}")]
    Io(#[from] std::io::Error),

    /// A line is not a valid regular expression.
    #[error("failed to compile pattern {pattern:?} on line {line}: {source}")]
    Compile {
        /// Line number (1-indexed).
        line: usize,
        /// The offending pattern text.
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// An ordered set of compiled allow patterns.
///
/// Patterns use search semantics: a pattern matches a zone if it matches
/// anywhere within it. Anchor with `^` and `$` for a full match.
///
/// # Example
///
/// ```
/// use unbound_blocklist::blocklist::AllowPatternSet;
///
/// let allow = AllowPatternSet::new([r"^ads\.", r"\.example\.org$"]).unwrap();
/// assert!(allow.matches("ads.example.com"));
/// assert!(allow.matches("www.example.org"));
/// assert!(!allow.matches("tracker.example.com"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AllowPatternSet {
    patterns: Vec<Regex>,
}

impl AllowPatternSet {
    /// Compile a set from pattern strings, in order.
    pub fn new<I, S>(patterns: I) -> Result<Self, AllowListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for (index, pattern) in patterns.into_iter().enumerate() {
            set.push(index + 1, pattern.as_ref())?;
        }
        Ok(set)
    }

    /// Parse an allow-list document.
    ///
    /// Lines are trimmed; empty lines and lines starting with `#` are skipped.
    /// Every other line must compile, otherwise the whole document is rejected.
    pub fn parse(reader: &mut dyn BufRead) -> Result<Self, AllowListError> {
        let mut set = Self::default();
        let mut line = String::new();
        let mut line_no = 0;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            set.push(line_no, trimmed)?;
        }

        Ok(set)
    }

    fn push(&mut self, line: usize, pattern: &str) -> Result<(), AllowListError> {
        let regex = Regex::new(pattern).map_err(|source| AllowListError::Compile {
            line,
            pattern: pattern.to_string(),
            source,
        })?;
        self.patterns.push(regex);
        Ok(())
    }

    /// Returns true if any pattern matches anywhere within `zone`.
    #[must_use]
    pub fn matches(&self, zone: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(zone))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
