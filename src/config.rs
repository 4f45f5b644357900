//! Configuration loading and validation.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::Deserialize;

use crate::dns::BlockType;
use crate::dns::response::DEFAULT_BLOCK_TTL;
use crate::error::{ConfigError, Result, ValidationError};

/// Main configuration for the groupwall DNS filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Address the UDP front-end binds to.
    #[serde(
        default = "default_listen",
        deserialize_with = "deserialize_socket_addr"
    )]
    pub listen: SocketAddr,

    /// Upstream DNS resolver address (e.g., "1.1.1.1:53").
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub upstream_resolver: SocketAddr,

    /// Group-based blocking settings.
    #[serde(default)]
    pub blocking: BlockingConfig,

    /// Static client names, keyed by client IP address.
    ///
    /// The names are offered to the blocking stage as the candidate
    /// identifiers of the client, in the configured order.
    #[serde(default)]
    pub client_names: HashMap<IpAddr, Vec<String>>,

    /// Prometheus metrics exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Blocking settings: list groups, client to group mapping and block policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockingConfig {
    /// Blacklist sources per group name. A source is a file path or an
    /// `http(s)://` URL.
    #[serde(default)]
    pub black_lists: HashMap<String, Vec<String>>,

    /// Whitelist sources per group name.
    #[serde(default)]
    pub white_lists: HashMap<String, Vec<String>>,

    /// Groups applied per client identifier (host name, IP literal or `default`).
    #[serde(default)]
    pub client_groups_block: HashMap<String, Vec<String>>,

    /// `ZeroIP`, `NxDomain` or an IP address. Empty means `ZeroIP`.
    #[serde(default)]
    pub block_type: String,

    /// TTL of synthesized answers.
    #[serde(default = "default_block_ttl")]
    pub block_ttl_seconds: u32,

    /// How groups with a whitelist but no blacklist are treated.
    #[serde(default)]
    pub whitelist_only_mode: WhitelistOnlyMode,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            black_lists: HashMap::new(),
            white_lists: HashMap::new(),
            client_groups_block: HashMap::new(),
            block_type: String::new(),
            block_ttl_seconds: default_block_ttl(),
            whitelist_only_mode: WhitelistOnlyMode::default(),
        }
    }
}

/// Behaviour of a group that only has a whitelist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistOnlyMode {
    /// The group never blocks; its whitelist only overrides other groups.
    #[default]
    Passthrough,
    /// The group blocks every domain that is not on its whitelist.
    AllowListedOnly,
}

/// Prometheus metrics exporter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(
        default = "default_metrics_listen",
        deserialize_with = "deserialize_socket_addr"
    )]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

const fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 53)
}

const fn default_metrics_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9090)
}

const fn default_block_ttl() -> u32 {
    DEFAULT_BLOCK_TTL
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> std::result::Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.blocking.validate()?;
        Ok(config)
    }
}

impl BlockingConfig {
    /// Validate the blocking settings and return the parsed block type.
    pub fn validate(&self) -> std::result::Result<BlockType, ValidationError> {
        if self.block_ttl_seconds == 0 {
            return Err(ValidationError::ZeroBlockTtl);
        }

        for (group, sources) in self.black_lists.iter().chain(&self.white_lists) {
            if group.trim().is_empty() {
                return Err(ValidationError::EmptyGroupName);
            }
            if sources.iter().any(|source| source.trim().is_empty()) {
                return Err(ValidationError::EmptySource {
                    group: group.clone(),
                });
            }
        }

        if self.client_groups_block.keys().any(|id| id.trim().is_empty()) {
            return Err(ValidationError::EmptyClientId);
        }

        self.block_type.parse()
    }

    /// Returns `true` when neither blacklists nor whitelists are configured.
    #[must_use]
    pub fn has_no_lists(&self) -> bool {
        self.black_lists.is_empty() && self.white_lists.is_empty()
    }
}
