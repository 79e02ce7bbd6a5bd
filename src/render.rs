//! Unbound configuration rendering.
//!
//! Output layout:
//!
//! ```text
//! # Written on Mon, 02 Jan 2006 15:04:05 +0000
//!
//! # https://example.org/hosts
//! local-zone: "ads.example.com" refuse
//! local-zone: "tracker.example.com" refuse
//! ```

use std::fmt::Display;
use std::io::{self, Write};

use chrono::{DateTime, TimeZone};

use crate::blocklist::Zone;

/// RFC 1123 style timestamp with a numeric offset.
const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Streams `local-zone` directives into a writer.
///
/// The renderer keeps no document in memory: every call writes straight to
/// the underlying writer, in call order. Zones are neither sorted nor
/// deduplicated.
pub struct ConfigRenderer<W> {
    out: W,
    directives: usize,
}

impl<W: Write> ConfigRenderer<W> {
    pub const fn new(out: W) -> Self {
        Self { out, directives: 0 }
    }

    /// Write the generation header.
    pub fn header<Tz>(&mut self, written_at: &DateTime<Tz>) -> io::Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        writeln!(self.out, "# Written on {}", written_at.format(TIMESTAMP_FORMAT))
    }

    /// Start the block of a deny-list source.
    pub fn begin_source(&mut self, url: &str) -> io::Result<()> {
        writeln!(self.out, "\n# {url}")
    }

    /// Write one directive refusing queries for `zone`.
    pub fn directive(&mut self, zone: &Zone) -> io::Result<()> {
        writeln!(self.out, "local-zone: \"{zone}\" refuse")?;
        self.directives += 1;
        Ok(())
    }

    /// Number of directives written so far.
    #[must_use]
    pub const fn directives(&self) -> usize {
        self.directives
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
