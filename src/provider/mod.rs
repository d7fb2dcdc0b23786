pub mod aws;
pub mod model;

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;

pub use model::*;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// A failed provider API call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation}: {message}")]
pub struct ProviderError {
    /// API operation name, e.g. `cloudfront:ListDistributions`.
    pub operation: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Read-only access to the cloud APIs the control catalog inspects.
///
/// Top-level list calls are paginated and take the continuation token of the
/// previous page; drive them with [`collect_pages`]. Describe calls return
/// the full sub-resource set for one parent.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Region the regional clients are bound to.
    fn region(&self) -> &str;

    // Account
    async fn security_contact(&self) -> ProviderResult<Option<AlternateContact>>;

    // API Gateway (REST)
    async fn rest_apis(&self, token: Option<String>) -> ProviderResult<Page<RestApi>>;
    async fn rest_api_stages(&self, api_id: &str) -> ProviderResult<Vec<RestStage>>;
    async fn regional_web_acls(&self) -> ProviderResult<Vec<WebAcl>>;

    // API Gateway v2
    async fn v2_apis(&self, token: Option<String>) -> ProviderResult<Page<ApiV2>>;
    async fn v2_api_stages(&self, api_id: &str) -> ProviderResult<Vec<ApiV2Stage>>;
    async fn v2_api_routes(&self, api_id: &str) -> ProviderResult<Vec<ApiV2Route>>;

    // CloudFront
    async fn distributions(&self, token: Option<String>)
        -> ProviderResult<Page<DistributionSummary>>;
    async fn distribution(&self, id: &str) -> ProviderResult<Distribution>;
    async fn distribution_tags(&self, arn: &str) -> ProviderResult<Vec<Tag>>;

    // S3
    async fn buckets(&self, token: Option<String>) -> ProviderResult<Page<Bucket>>;
    /// `None` when the bucket has no public access block configuration at all.
    async fn public_access_block(&self, bucket: &str)
        -> ProviderResult<Option<PublicAccessBlock>>;
    async fn bucket_exists(&self, bucket: &str) -> ProviderResult<bool>;

    // DocumentDB
    async fn docdb_clusters(&self, token: Option<String>) -> ProviderResult<Page<DocDbCluster>>;
    async fn docdb_manual_snapshots(
        &self,
        token: Option<String>,
    ) -> ProviderResult<Page<DocDbSnapshot>>;
    async fn docdb_snapshot_attributes(
        &self,
        snapshot_id: &str,
    ) -> ProviderResult<Vec<SnapshotAttribute>>;

    // EC2
    async fn owned_ebs_snapshots(&self, token: Option<String>) -> ProviderResult<Page<EbsSnapshot>>;
    /// Permission groups on the snapshot's `createVolumePermission` attribute.
    async fn create_volume_permission_groups(&self, snapshot_id: &str)
        -> ProviderResult<Vec<String>>;
    async fn security_groups(&self, token: Option<String>) -> ProviderResult<Page<SecurityGroup>>;

    // ECS
    async fn active_task_definitions(&self, token: Option<String>) -> ProviderResult<Page<String>>;
    async fn task_definition(&self, arn: &str) -> ProviderResult<TaskDefinition>;
}

/// Drain a paginated list call, feeding each page's continuation token into
/// the next request. The first error aborts the listing.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> ProviderResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = ProviderResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = fetch(token.take()).await?;
        items.extend(page.items);
        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }

    Ok(items)
}
