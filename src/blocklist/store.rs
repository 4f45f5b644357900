//! Compiled per-group domain sets.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

/// Normalize a domain for membership tests: trimmed, lowercase, without
/// the trailing root dot.
#[must_use]
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_lowercase()
}

/// A named group of domains merged from one or more list sources.
#[derive(Debug, Clone, Default)]
pub struct ListGroup {
    name: String,
    domains: HashSet<String>,
}

impl ListGroup {
    /// Build a group from raw list entries.
    pub fn new<I, S>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut group = Self {
            name: name.into(),
            domains: HashSet::new(),
        };
        group.extend(entries);
        group
    }

    fn extend<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.domains.extend(
            entries
                .into_iter()
                .map(|entry| normalize_domain(entry.as_ref()))
                .filter(|entry| !entry.is_empty()),
        );
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact membership test. `domain` must already be normalized with
    /// [`normalize_domain`].
    #[inline]
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// All groups of one list kind (blacklists or whitelists), keyed by name.
///
/// Read-only once built. Refreshing lists means building a new store.
#[derive(Debug, Clone, Default)]
pub struct ListGroupStore {
    groups: HashMap<String, ListGroup>,
}

impl ListGroupStore {
    /// Build a store from `(group name, entries)` pairs. Pairs sharing a
    /// group name are merged by union.
    pub fn new<I, G, E, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = (G, E)>,
        G: Into<String>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::default();
        for (name, entries) in groups {
            let name = name.into();
            store
                .groups
                .entry(name.clone())
                .or_insert_with(|| ListGroup::new(name, std::iter::empty::<&str>()))
                .extend(entries);
        }
        store
    }

    /// Returns `true` if `group` exists and lists the normalized `domain`.
    #[inline]
    #[must_use]
    pub fn contains(&self, group: &str, domain: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|list| list.contains(domain))
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ListGroup> {
        self.groups.get(name)
    }

    /// Group names in sorted order.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of groups in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of unique entries per group, summed over all groups.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.groups.values().map(ListGroup::len).sum()
    }
}

/// Blacklists and whitelists published together.
#[derive(Debug, Clone, Default)]
pub struct ListSnapshot {
    pub blacklists: ListGroupStore,
    pub whitelists: ListGroupStore,
}

/// Shared handle to the current [`ListSnapshot`].
///
/// Readers take an `Arc` to the snapshot and keep using it for the whole
/// decision; a refresh swaps in a fully built snapshot, so a reader sees
/// either the old lists or the new ones, never a mix.
#[derive(Debug, Clone, Default)]
pub struct SharedLists {
    inner: Arc<RwLock<Arc<ListSnapshot>>>,
}

impl SharedLists {
    #[must_use]
    pub fn new(snapshot: ListSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The snapshot currently published.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ListSnapshot> {
        Arc::clone(&self.inner.read())
    }

    /// Publish a new snapshot, replacing the previous one as a whole.
    pub fn replace(&self, snapshot: ListSnapshot) {
        *self.inner.write() = Arc::new(snapshot);
    }
}
