//! Resource snapshots returned by a [`Provider`](super::Provider).
//!
//! These are transient views of cloud configuration: fetched fresh for every
//! control evaluation, inspected, then dropped. Only the fields some control
//! actually reads are carried over from the SDK shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One page of a paginated list call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token (marker, position, next token) for the next page.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// The SECURITY alternate contact of an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlternateContact {
    pub name: Option<String>,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestApi {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestStage {
    pub stage_name: String,
    pub client_certificate_id: Option<String>,
    #[serde(default)]
    pub tracing_enabled: bool,
    #[serde(default)]
    pub cache_cluster_enabled: bool,
    pub cache_cluster_size: Option<String>,
    pub web_acl_arn: Option<String>,
    /// Keyed by `{resource_path}/{http_method}`; `*/*` holds the stage-wide defaults.
    #[serde(default)]
    pub method_settings: BTreeMap<String, MethodSetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodSetting {
    pub logging_level: Option<String>,
    #[serde(default)]
    pub caching_enabled: bool,
    #[serde(default)]
    pub cache_data_encrypted: bool,
}

/// A regional WAFv2 web ACL with the API Gateway stages it protects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebAcl {
    pub name: String,
    pub arn: String,
    #[serde(default)]
    pub resource_arns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiV2 {
    pub api_id: String,
    pub name: String,
    /// `HTTP` or `WEBSOCKET`.
    pub protocol_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiV2Stage {
    pub stage_name: String,
    pub access_log_destination: Option<String>,
    /// Default route logging level (`OFF`, `ERROR`, `INFO`); WebSocket only.
    pub default_logging_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiV2Route {
    pub route_key: String,
    pub authorization_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub id: String,
    pub arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: String,
    pub arn: String,
    pub default_root_object: Option<String>,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub origins: Vec<Origin>,
    #[serde(default)]
    pub origin_groups: Vec<OriginGroup>,
    #[serde(default)]
    pub default_cache_behavior: CacheBehavior,
    #[serde(default)]
    pub cache_behaviors: Vec<CacheBehavior>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enabled: bool,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub id: String,
    pub domain_name: String,
    pub origin_access_control_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginGroup {
    pub id: String,
    /// Origin ids, primary first.
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheBehavior {
    /// `None` for the default cache behavior.
    pub path_pattern: Option<String>,
    /// `allow-all`, `https-only` or `redirect-to-https`.
    pub viewer_protocol_policy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub fn fully_blocked() -> Self {
        Self {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: true,
            restrict_public_buckets: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocDbCluster {
    pub identifier: String,
    #[serde(default)]
    pub storage_encrypted: bool,
    pub backup_retention_period: Option<i32>,
    #[serde(default)]
    pub deletion_protection: bool,
    #[serde(default)]
    pub enabled_log_exports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocDbSnapshot {
    pub identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAttribute {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EbsSnapshot {
    pub snapshot_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub ingress: Vec<IngressRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngressRule {
    /// `tcp`, `udp`, `icmp`, or `-1` for all traffic.
    pub protocol: String,
    pub from_port: Option<i32>,
    pub to_port: Option<i32>,
    #[serde(default)]
    pub ipv4_ranges: Vec<String>,
    #[serde(default)]
    pub ipv6_ranges: Vec<String>,
}

impl IngressRule {
    /// Whether this rule admits traffic to `port`. Rules without a port range
    /// (protocol `-1`) cover every port.
    pub fn covers_port(&self, port: i32) -> bool {
        if self.protocol == "-1" {
            return true;
        }
        match (self.from_port, self.to_port) {
            (Some(from), Some(to)) => from <= port && port <= to,
            _ => false,
        }
    }

    /// The world-open CIDRs this rule lists.
    pub fn open_ranges(&self) -> Vec<&str> {
        self.ipv4_ranges
            .iter()
            .filter(|c| c.as_str() == "0.0.0.0/0")
            .chain(self.ipv6_ranges.iter().filter(|c| c.as_str() == "::/0"))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub arn: String,
    /// `bridge`, `host`, `awsvpc` or `none`.
    pub network_mode: Option<String>,
    #[serde(default)]
    pub containers: Vec<ContainerDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    pub privileged: Option<bool>,
    pub user: Option<String>,
}
