//! Domain lists: parsing, loading and the per-group stores.
//!
//! Every configured group owns a set of list sources. Sources are loaded
//! by a [`SourceLoader`], parsed with [`ListParser`] and merged by union
//! into one [`ListGroup`] per group name. The resulting
//! [`ListGroupStore`]s are published as a single [`ListSnapshot`] through
//! [`SharedLists`], which is what the blocking stage reads.
//!
//! # Example
//!
//! ```
//! use groupwall::blocklist::ListParser;
//! use std::io::BufReader;
//!
//! let content = "# Comment\nexample.com\n0.0.0.0 ads.example.com";
//! let domains = ListParser.parse(&mut BufReader::new(content.as_bytes())).unwrap();
//! assert_eq!(domains, vec!["example.com", "ads.example.com"]);
//! ```

pub mod loader;
pub mod manager;
mod parser;
pub mod store;

pub use loader::{DefaultSourceLoader, FileLoader, LoadError, RemoteLoader, SourceLoader};
pub use manager::ListManager;
pub use parser::ListParser;
pub use store::{ListGroup, ListGroupStore, ListSnapshot, SharedLists, normalize_domain};

/// Error type for list parsing operations.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// I/O error during reading.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
