//! List manager: loads every group's sources and publishes the stores.
//!
//! The manager owns the [`SharedLists`] handle read by the blocking stage.
//! Loading never mutates the published stores in place: a full
//! [`ListSnapshot`] is built first and then swapped in.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::loader::{DefaultSourceLoader, LoadError, SourceLoader};
use super::store::{ListGroupStore, ListSnapshot, SharedLists};
use crate::config::BlockingConfig;

/// Entry counts of a published snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStats {
    /// Unique blacklist entries per group.
    pub blacklists: BTreeMap<String, usize>,
    /// Unique whitelist entries per group.
    pub whitelists: BTreeMap<String, usize>,
    /// Sources that failed to load during the last refresh.
    pub failed_sources: usize,
}

/// Loads blacklist and whitelist sources for all configured groups.
///
/// # Example
///
/// ```no_run
/// use groupwall::blocklist::ListManager;
/// use groupwall::config::Config;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::load("config.toml")?;
/// let manager = ListManager::new(&config.blocking)?;
/// manager.refresh().await;
///
/// // Handle shared with the blocking stage
/// let lists = manager.lists();
/// # Ok(())
/// # }
/// ```
pub struct ListManager {
    lists: SharedLists,
    black_sources: BTreeMap<String, Vec<String>>,
    white_sources: BTreeMap<String, Vec<String>>,
    loader: Arc<dyn SourceLoader>,
}

/// Which kind of list a group source belongs to, for logging.
#[derive(Debug, Clone, Copy)]
enum ListKind {
    Black,
    White,
}

impl ListManager {
    /// Create a manager using the [`DefaultSourceLoader`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &BlockingConfig) -> Result<Self, LoadError> {
        let loader = DefaultSourceLoader::new()?;
        Ok(Self::with_loader(config, Arc::new(loader)))
    }

    /// Create a manager with a custom source loader.
    pub fn with_loader(config: &BlockingConfig, loader: Arc<dyn SourceLoader>) -> Self {
        Self {
            lists: SharedLists::default(),
            black_sources: config.black_lists.clone().into_iter().collect(),
            white_sources: config.white_lists.clone().into_iter().collect(),
            loader,
        }
    }

    /// Handle to the published lists, shared with the blocking stage.
    #[must_use]
    pub fn lists(&self) -> SharedLists {
        self.lists.clone()
    }

    /// Load every source and publish a new snapshot.
    ///
    /// Sources that fail to load are logged and skipped; their group is
    /// still published with whatever the other sources provided.
    pub async fn refresh(&self) -> ListStats {
        let (blacklists, black_failed) = self.load_groups(&self.black_sources, ListKind::Black).await;
        let (whitelists, white_failed) = self.load_groups(&self.white_sources, ListKind::White).await;

        let stats = ListStats {
            blacklists: group_sizes(&blacklists),
            whitelists: group_sizes(&whitelists),
            failed_sources: black_failed + white_failed,
        };

        tracing::info!(
            blacklist_groups = blacklists.len(),
            blacklist_entries = blacklists.total_entries(),
            whitelist_groups = whitelists.len(),
            whitelist_entries = whitelists.total_entries(),
            failed_sources = stats.failed_sources,
            "published domain lists"
        );

        self.lists.replace(ListSnapshot {
            blacklists,
            whitelists,
        });

        stats
    }

    async fn load_groups(
        &self,
        groups: &BTreeMap<String, Vec<String>>,
        kind: ListKind,
    ) -> (ListGroupStore, usize) {
        let mut loaded = Vec::with_capacity(groups.len());
        let mut failed = 0;

        for (group, sources) in groups {
            let mut entries = Vec::new();
            for source in sources {
                match self.loader.load(source).await {
                    Ok(domains) => {
                        tracing::debug!(
                            group = ?group,
                            kind = ?kind,
                            source = %source,
                            count = domains.len(),
                            "loaded list source"
                        );
                        entries.extend(domains);
                    }
                    Err(err) => {
                        failed += 1;
                        tracing::error!(
                            group = ?group,
                            kind = ?kind,
                            source = %source,
                            error = ?err,
                            "failed to load list source"
                        );
                    }
                }
            }
            loaded.push((group.clone(), entries));
        }

        (ListGroupStore::new(loaded), failed)
    }
}

fn group_sizes(store: &ListGroupStore) -> BTreeMap<String, usize> {
    store
        .group_names()
        .into_iter()
        .map(|name| {
            let size = store.group(name).map_or(0, |group| group.len());
            (name.to_string(), size)
        })
        .collect()
}
