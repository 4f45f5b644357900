//! Groupwall - per-client DNS query filtering.
//!
//! Groupwall is a resolver pipeline stage that blocks DNS queries based on
//! the requesting client. Clients are mapped to named groups, each group
//! owns a set of blacklists and whitelists, and blocked queries get a
//! synthesized answer instead of being forwarded upstream.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`]: Configuration loading and validation
//! - [`blocklist`]: List parsing, loading and per-group stores
//! - [`dns`]: Group resolution, block decisions and the resolver pipeline
//! - [`server`]: UDP front end feeding the pipeline
//! - [`metrics`]: Prometheus exporter setup
//! - [`error`]: Error types
//!
//! # Testing
//!
//! Pipeline stages are trait objects, so the blocking stage can be tested
//! in front of any stand-in successor:
//!
//! ```rust
//! use groupwall::blocklist::{ListGroupStore, ListSnapshot, SharedLists};
//! use groupwall::config::WhitelistOnlyMode;
//! use groupwall::dns::Blocker;
//!
//! let lists = SharedLists::new(ListSnapshot {
//!     blacklists: ListGroupStore::new([("ads", ["tracker.example.com"])]),
//!     whitelists: ListGroupStore::default(),
//! });
//! let blocker = Blocker::new(lists, Vec::<String>::new(), WhitelistOnlyMode::Passthrough);
//!
//! let groups = vec!["ads".to_string()];
//! assert!(blocker.is_blocked(&groups, "tracker.example.com.").is_some());
//! assert!(blocker.is_blocked(&groups, "example.com.").is_none());
//! ```

pub mod blocklist;
pub mod config;
pub mod dns;
pub mod error;
pub mod metrics;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
