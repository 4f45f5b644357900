//! List source parser.
//!
//! Accepts plain domain lists as well as hosts-file style lines, which is
//! what most public blocklists are published as.

use std::io::BufRead;

use super::ParseError;

/// Names that show up in hosts files but are never meant to be filtered.
const SYSTEM_NAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "local",
    "broadcasthost",
    "ip6-localhost",
    "ip6-loopback",
];

/// Parser for list sources.
///
/// # Format
///
/// - One domain per line
/// - Lines starting with `#` are comments
/// - Blank lines are ignored, whitespace is trimmed
/// - Hosts-style lines (`0.0.0.0 ads.example.com tracker.example.com`)
///   yield every name after the address
///
/// Entries are returned as written; normalization happens when a
/// [`ListGroup`](super::ListGroup) is built.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListParser;

impl ListParser {
    /// Parse list content and return its domain entries.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if reading fails.
    pub fn parse(&self, reader: &mut dyn BufRead) -> Result<Vec<String>, ParseError> {
        let mut domains = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let Some(first) = fields.next() else {
                continue;
            };

            if first.parse::<std::net::IpAddr>().is_ok() {
                domains.extend(
                    fields
                        .take_while(|field| !field.starts_with('#'))
                        .filter(|name| !is_system_name(name))
                        .map(str::to_string),
                );
            } else {
                domains.push(first.to_string());
            }
        }

        Ok(domains)
    }
}

fn is_system_name(name: &str) -> bool {
    SYSTEM_NAMES
        .iter()
        .any(|system| system.eq_ignore_ascii_case(name))
}
