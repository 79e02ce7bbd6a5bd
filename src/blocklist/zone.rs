//! Validated zone names.

use std::fmt;
use std::str::FromStr;

/// Error returned for a token that is not a usable zone name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid zone name {0:?}")]
pub struct BadZoneSyntax(pub String);

/// A DNS zone name targeted for blocking.
///
/// Only tokens made of ASCII letters, digits, `-`, `_` and `.` are accepted.
/// Anything else would need escaping inside the quoted `local-zone` directive
/// and is more likely a corrupted line than a real hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Zone(String);

impl Zone {
    /// Validate and wrap a zone token.
    pub fn parse(token: &str) -> Result<Self, BadZoneSyntax> {
        if !token.is_empty() && token.bytes().all(is_zone_byte) {
            Ok(Self(token.to_string()))
        } else {
            Err(BadZoneSyntax(token.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn is_zone_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}

impl FromStr for Zone {
    type Err = BadZoneSyntax;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Zone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
