//! Blocklist sources.
//!
//! This module turns remote documents into the zones that end up in the
//! generated configuration.
//!
//! # Sources
//!
//! - **Allow-list**: one regular expression per line, see [`AllowPatternSet`]
//! - **Deny-lists**: hosts files mapping zones to `0.0.0.0`, see [`ZoneExtractor`]
//!
//! Both are fetched with [`RemoteLoader`].
//!
//! # Example
//!
//! ```
//! use unbound_blocklist::blocklist::{AllowPatternSet, ZoneExtractor};
//!
//! let allow = AllowPatternSet::parse(&mut "# keep ads\n^ads\\.\n".as_bytes()).unwrap();
//! let hosts = "0.0.0.0 ads.example.com\n0.0.0.0 tracker.example.com\n0.0.0.0 bad/zone!\n";
//! let mut zones = ZoneExtractor::new(hosts.lines(), "example-hosts", &allow);
//! let accepted: Vec<_> = zones.by_ref().map(|z| z.to_string()).collect();
//! assert_eq!(accepted, vec!["tracker.example.com"]);
//! assert_eq!(zones.stats().rejected, 1);
//! ```

mod allow;
mod hosts;
pub mod remote;
mod zone;

pub use allow::{AllowListError, AllowPatternSet};
pub use hosts::{DENY_IP, ExtractStats, ZoneExtractor};
pub use remote::{FetchError, RemoteLoader};
pub use zone::{BadZoneSyntax, Zone};
