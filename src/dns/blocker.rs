//! Block decision over a client's applicable groups.
//!
//! A domain is blocked when one of the client's groups blacklists it and
//! none of the client's groups whitelists it. Whitelists only count for
//! groups the client actually belongs to.

use std::collections::HashSet;
use std::sync::Arc;

use crate::blocklist::{ListSnapshot, SharedLists, normalize_domain};
use crate::config::WhitelistOnlyMode;

/// Outcome of a positive block decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    /// First applicable group (in client group order) that blocks the domain.
    pub group: String,
}

/// Block decision engine.
#[derive(Debug, Clone)]
pub struct Blocker {
    lists: SharedLists,
    whitelist_only: HashSet<String>,
    whitelist_only_mode: WhitelistOnlyMode,
}

impl Blocker {
    /// Create a blocker reading from `lists`. Groups named in
    /// `whitelist_only` never take part in the blacklist scan.
    pub fn new<I, S>(lists: SharedLists, whitelist_only: I, mode: WhitelistOnlyMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lists,
            whitelist_only: whitelist_only.into_iter().map(Into::into).collect(),
            whitelist_only_mode: mode,
        }
    }

    /// Decide whether `domain` is blocked for a client whose applicable
    /// groups are `groups`.
    ///
    /// In [`WhitelistOnlyMode::AllowListedOnly`] a client whose groups are
    /// all whitelist-only is blocked from every domain none of them lists.
    /// A client mixing such groups with blacklisted ones is only subject to
    /// its blacklists.
    ///
    /// The published lists are read once, so one decision never mixes two
    /// snapshots.
    #[must_use]
    pub fn is_blocked(&self, groups: &[String], domain: &str) -> Option<BlockMatch> {
        if groups.is_empty() {
            return None;
        }

        let domain = normalize_domain(domain);
        let lists = self.lists.snapshot();

        if groups
            .iter()
            .any(|group| lists.whitelists.contains(group, &domain))
        {
            return None;
        }

        let strict = self.whitelist_only_mode == WhitelistOnlyMode::AllowListedOnly
            && groups
                .iter()
                .all(|group| self.whitelist_only.contains(group.as_str()));
        if strict {
            // Every applicable group is whitelist-only and none lists the domain.
            return Some(BlockMatch {
                group: groups[0].clone(),
            });
        }

        groups
            .iter()
            .filter(|group| !self.whitelist_only.contains(group.as_str()))
            .find(|group| lists.blacklists.contains(group, &domain))
            .map(|group| BlockMatch {
                group: group.clone(),
            })
    }

    /// Lists currently in effect.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ListSnapshot> {
        self.lists.snapshot()
    }

    /// Groups excluded from the blacklist scan, sorted.
    #[must_use]
    pub fn whitelist_only_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.whitelist_only.iter().map(String::as_str).collect();
        groups.sort_unstable();
        groups
    }
}
