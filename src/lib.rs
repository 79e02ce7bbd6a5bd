//! unbound-blocklist - Regenerates an Unbound blocklist from remote lists.
//!
//! Each run fetches an allow-list of regular expressions and a series of
//! hosts-format deny-lists, writes one `local-zone: "<zone>" refuse` directive
//! per denied zone that no allow pattern matches, atomically installs the
//! result and reloads Unbound.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`]: Configuration loading and validation
//! - [`blocklist`]: Fetching, allow patterns and zone extraction
//! - [`render`]: Unbound directive output
//! - [`writer`]: Staged file with atomic promotion
//! - [`service`]: Syntax check and reload through a command runner
//! - [`lock`]: Run-level lock file
//! - [`pipeline`]: Run orchestration
//! - [`error`]: Error types
//!
//! # Testing
//!
//! Network access is isolated in [`blocklist::RemoteLoader`] and process
//! execution behind the [`service::CommandRunner`] trait, so a whole run can
//! be driven against a local HTTP server with a recording runner:
//!
//! ```rust
//! use unbound_blocklist::blocklist::{AllowPatternSet, ZoneExtractor};
//! use unbound_blocklist::render::ConfigRenderer;
//!
//! let allow = AllowPatternSet::new([r"^ads\."]).unwrap();
//! let mut renderer = ConfigRenderer::new(Vec::new());
//! renderer.begin_source("https://example.org/hosts").unwrap();
//! for zone in ZoneExtractor::new("0.0.0.0 tracker.example.com".lines(), "hosts", &allow) {
//!     renderer.directive(&zone).unwrap();
//! }
//! let out = String::from_utf8(renderer.into_inner()).unwrap();
//! assert!(out.contains("local-zone: \"tracker.example.com\" refuse"));
//! ```

pub mod blocklist;
pub mod config;
pub mod error;
pub mod lock;
pub mod pipeline;
pub mod render;
pub mod service;
pub mod writer;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunReport};
