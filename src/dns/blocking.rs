//! Blocking pipeline stage.
//!
//! Resolves the client's groups, asks the [`Blocker`] for a decision and
//! either answers with a synthesized response or hands the request to the
//! next stage untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::Query;
use tracing::Instrument;

use super::blocker::Blocker;
use super::groups::ClientGroups;
use super::resolver::{ChainedResolver, Request, Resolver, Response};
use super::response::BlockType;
use crate::blocklist::SharedLists;
use crate::config::BlockingConfig;
use crate::error::{Error, Result};

/// Configuration line reported by an inert blocking stage.
pub const DEACTIVATED: &str = "deactivated";

/// Group names with a whitelist but no blacklist, sorted.
#[must_use]
pub fn determine_whitelist_only_groups(config: &BlockingConfig) -> Vec<String> {
    let groups: BTreeSet<&String> = config
        .white_lists
        .keys()
        .filter(|group| !config.black_lists.contains_key(*group))
        .collect();
    groups.into_iter().cloned().collect()
}

/// Pipeline stage blocking queries per client group.
pub struct BlockingResolver {
    block_type: BlockType,
    block_ttl: u32,
    client_groups: ClientGroups,
    blocker: Blocker,
    /// No lists configured: every request is delegated.
    inert: bool,
    next: Option<Arc<dyn Resolver>>,
}

impl BlockingResolver {
    /// Build the stage from `config`, reading list contents from `lists`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown block type or an
    /// invalid block TTL. The caller must not start serving in that case.
    pub fn new(config: &BlockingConfig, lists: SharedLists) -> Result<Self> {
        let block_type = config.validate()?;
        let client_groups = ClientGroups::new(config.client_groups_block.clone());

        for group in client_groups.referenced_groups() {
            if !config.black_lists.contains_key(group) && !config.white_lists.contains_key(group) {
                tracing::warn!(group = ?group, "client group has no blacklist or whitelist");
            }
        }

        let whitelist_only = determine_whitelist_only_groups(config);
        let inert = config.has_no_lists();
        if inert {
            tracing::info!("no lists configured, blocking is deactivated");
        }

        Ok(Self {
            block_type,
            block_ttl: config.block_ttl_seconds,
            client_groups,
            blocker: Blocker::new(lists, whitelist_only, config.whitelist_only_mode),
            inert,
            next: None,
        })
    }

    #[must_use]
    pub const fn block_type(&self) -> BlockType {
        self.block_type
    }

    #[must_use]
    pub const fn is_inert(&self) -> bool {
        self.inert
    }

    async fn delegate(&self, request: &Request) -> Result<Response> {
        let next = self.next.as_ref().ok_or(Error::NoNextResolver)?;
        next.resolve(request)
            .instrument(request.span.clone())
            .await
    }
}

#[async_trait]
impl Resolver for BlockingResolver {
    async fn resolve(&self, request: &Request) -> Result<Response> {
        if self.inert {
            return self.delegate(request).await;
        }

        let groups = self
            .client_groups
            .groups_for(&request.client_names, request.client_ip);

        let mut blocked: Vec<&Query> = Vec::new();
        let mut matched = None;
        for question in request.message.queries() {
            let domain = question.name().to_utf8();
            if let Some(hit) = self.blocker.is_blocked(&groups, &domain) {
                request.span.in_scope(|| {
                    tracing::debug!(
                        domain = %domain,
                        group = ?hit.group,
                        client_ip = %request.client_ip,
                        "blocked query"
                    );
                });
                blocked.push(question);
                if matched.is_none() {
                    matched = Some(hit);
                }
            }
        }

        let Some(hit) = matched else {
            return self.delegate(request).await;
        };

        metrics::counter!("groupwall_queries_blocked_total", "group" => hit.group.clone())
            .increment(1);

        let message = self
            .block_type
            .blocked_response_for(&request.message, self.block_ttl, |question| {
                blocked.contains(&question)
            });
        Ok(Response::blocked(message, &hit.group))
    }

    fn configuration(&self) -> Vec<String> {
        if self.inert {
            return vec![DEACTIVATED.to_string()];
        }

        let mut lines = vec!["client groups:".to_string()];
        for (client, groups) in self.client_groups.entries() {
            lines.push(format!("  {client} = {}", groups.join(", ")));
        }

        lines.push(format!("block type = {}", self.block_type));
        lines.push(format!("block ttl = {}s", self.block_ttl));

        let lists = self.blocker.snapshot();
        lines.push("blacklists:".to_string());
        for name in lists.blacklists.group_names() {
            let size = lists.blacklists.group(name).map_or(0, |group| group.len());
            lines.push(format!("  {name} = {size} entries"));
        }
        lines.push("whitelists:".to_string());
        for name in lists.whitelists.group_names() {
            let size = lists.whitelists.group(name).map_or(0, |group| group.len());
            lines.push(format!("  {name} = {size} entries"));
        }

        let whitelist_only = self.blocker.whitelist_only_groups();
        if !whitelist_only.is_empty() {
            lines.push(format!("whitelist-only groups = {}", whitelist_only.join(", ")));
        }

        lines
    }
}

impl ChainedResolver for BlockingResolver {
    fn next(&mut self, next: Arc<dyn Resolver>) {
        self.next = Some(next);
    }
}
