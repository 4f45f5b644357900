//! Client to group resolution.

use std::collections::HashMap;
use std::net::IpAddr;

/// Client identifier whose groups apply when nothing else matches.
pub const DEFAULT_CLIENT: &str = "default";

/// Maps client identifiers (names, IP literals, `default`) to group names.
#[derive(Debug, Clone, Default)]
pub struct ClientGroups {
    table: HashMap<String, Vec<String>>,
}

impl ClientGroups {
    pub fn new(table: HashMap<String, Vec<String>>) -> Self {
        Self { table }
    }

    /// Ordered, deduplicated groups applying to a client.
    ///
    /// Groups of every matching client name are collected in request
    /// order. Only when no name matches is the client IP looked up, and
    /// only when that misses too are the `default` groups used. An
    /// unmatched client without a `default` entry gets no groups.
    #[must_use]
    pub fn groups_for(&self, client_names: &[String], client_ip: IpAddr) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        let mut matched = false;

        for name in client_names {
            if let Some(hit) = self.table.get(name) {
                matched = true;
                for group in hit {
                    if !groups.contains(group) {
                        groups.push(group.clone());
                    }
                }
            }
        }

        if matched {
            return groups;
        }

        self.table
            .get(&client_ip.to_string())
            .or_else(|| self.table.get(DEFAULT_CLIENT))
            .map(|hit| dedup(hit))
            .unwrap_or_default()
    }

    /// Sorted `(client identifier, groups)` pairs, for reporting.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, &[String])> {
        let mut entries: Vec<(&str, &[String])> = self
            .table
            .iter()
            .map(|(client, groups)| (client.as_str(), groups.as_slice()))
            .collect();
        entries.sort_unstable_by_key(|(client, _)| *client);
        entries
    }

    /// Every group name referenced by any client, sorted and deduplicated.
    #[must_use]
    pub fn referenced_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.table.values().flatten().map(String::as_str).collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }
}

fn dedup(groups: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(groups.len());
    for group in groups {
        if !out.contains(group) {
            out.push(group.clone());
        }
    }
    out
}
