//! In-memory [`Provider`] for exercising controls without an AWS account.
//!
//! Fill the public fields with snapshots, optionally shrink `page_size` to
//! force pagination, and inject failures per operation (or per operation and
//! resource) with [`FixtureProvider::fail`] and [`FixtureProvider::fail_for`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use crate::provider::*;

#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    pub region: String,
    /// Items per page for list calls; 0 returns everything in one page.
    pub page_size: usize,
    /// `operation` or `operation/resource` → error message.
    pub failures: BTreeMap<String, String>,

    pub security_contact: Option<AlternateContact>,

    pub rest_apis: Vec<RestApi>,
    pub rest_stages: HashMap<String, Vec<RestStage>>,
    pub web_acls: Vec<WebAcl>,
    pub v2_apis: Vec<ApiV2>,
    pub v2_stages: HashMap<String, Vec<ApiV2Stage>>,
    pub v2_routes: HashMap<String, Vec<ApiV2Route>>,

    pub distributions: Vec<Distribution>,
    /// Keyed by distribution ARN.
    pub distribution_tags: HashMap<String, Vec<Tag>>,

    /// Listed buckets; `bucket_exists` answers from this list too.
    pub buckets: Vec<Bucket>,
    /// Buckets absent from this map have no access block configuration.
    pub public_access_blocks: HashMap<String, PublicAccessBlock>,

    pub docdb_clusters: Vec<DocDbCluster>,
    pub docdb_snapshots: Vec<DocDbSnapshot>,
    pub docdb_snapshot_attributes: HashMap<String, Vec<SnapshotAttribute>>,

    pub ebs_snapshots: Vec<EbsSnapshot>,
    pub volume_permissions: HashMap<String, Vec<String>>,
    pub security_groups: Vec<SecurityGroup>,

    pub task_definitions: Vec<TaskDefinition>,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self {
            region: "ap-northeast-2".into(),
            ..Default::default()
        }
    }

    /// Make every call to `operation` fail.
    pub fn fail(mut self, operation: &str) -> Self {
        self.failures
            .insert(operation.to_string(), "injected failure".into());
        self
    }

    /// Make `operation` fail only for `resource`.
    pub fn fail_for(mut self, operation: &str, resource: &str) -> Self {
        self.failures
            .insert(format!("{operation}/{resource}"), "injected failure".into());
        self
    }

    pub fn paged(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    fn guard(&self, operation: &str, resource: Option<&str>) -> ProviderResult<()> {
        let scoped = resource.and_then(|r| self.failures.get(&format!("{operation}/{r}")));
        match scoped.or_else(|| self.failures.get(operation)) {
            Some(message) => Err(ProviderError::new(operation, message.clone())),
            None => Ok(()),
        }
    }

    /// Tokens are the stringified start offset of the page.
    fn page<T: Clone>(&self, items: &[T], token: Option<String>) -> ProviderResult<Page<T>> {
        let start = match token {
            Some(t) => t
                .parse::<usize>()
                .map_err(|_| ProviderError::new("fixture:Page", format!("bad token {t}")))?,
            None => 0,
        };
        if self.page_size == 0 {
            return Ok(Page::last(items.get(start..).unwrap_or_default().to_vec()));
        }
        let end = (start + self.page_size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default().to_vec();
        Ok(Page {
            items: slice,
            next_token: (end < items.len()).then(|| end.to_string()),
        })
    }

    fn keyed<T: Clone>(map: &HashMap<String, Vec<T>>, key: &str) -> Vec<T> {
        map.get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Provider for FixtureProvider {
    fn region(&self) -> &str {
        &self.region
    }

    async fn security_contact(&self) -> ProviderResult<Option<AlternateContact>> {
        self.guard("account:GetAlternateContact", None)?;
        Ok(self.security_contact.clone())
    }

    async fn rest_apis(&self, token: Option<String>) -> ProviderResult<Page<RestApi>> {
        self.guard("apigateway:GetRestApis", None)?;
        self.page(&self.rest_apis, token)
    }

    async fn rest_api_stages(&self, api_id: &str) -> ProviderResult<Vec<RestStage>> {
        self.guard("apigateway:GetStages", Some(api_id))?;
        Ok(Self::keyed(&self.rest_stages, api_id))
    }

    async fn regional_web_acls(&self) -> ProviderResult<Vec<WebAcl>> {
        self.guard("wafv2:ListWebACLs", None)?;
        Ok(self.web_acls.clone())
    }

    async fn v2_apis(&self, token: Option<String>) -> ProviderResult<Page<ApiV2>> {
        self.guard("apigatewayv2:GetApis", None)?;
        self.page(&self.v2_apis, token)
    }

    async fn v2_api_stages(&self, api_id: &str) -> ProviderResult<Vec<ApiV2Stage>> {
        self.guard("apigatewayv2:GetStages", Some(api_id))?;
        Ok(Self::keyed(&self.v2_stages, api_id))
    }

    async fn v2_api_routes(&self, api_id: &str) -> ProviderResult<Vec<ApiV2Route>> {
        self.guard("apigatewayv2:GetRoutes", Some(api_id))?;
        Ok(Self::keyed(&self.v2_routes, api_id))
    }

    async fn distributions(
        &self,
        token: Option<String>,
    ) -> ProviderResult<Page<DistributionSummary>> {
        self.guard("cloudfront:ListDistributions", None)?;
        let summaries: Vec<_> = self
            .distributions
            .iter()
            .map(|d| DistributionSummary {
                id: d.id.clone(),
                arn: d.arn.clone(),
            })
            .collect();
        self.page(&summaries, token)
    }

    async fn distribution(&self, id: &str) -> ProviderResult<Distribution> {
        self.guard("cloudfront:GetDistribution", Some(id))?;
        self.distributions
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| ProviderError::new("cloudfront:GetDistribution", "NoSuchDistribution"))
    }

    async fn distribution_tags(&self, arn: &str) -> ProviderResult<Vec<Tag>> {
        self.guard("cloudfront:ListTagsForResource", Some(arn))?;
        Ok(Self::keyed(&self.distribution_tags, arn))
    }

    async fn buckets(&self, token: Option<String>) -> ProviderResult<Page<Bucket>> {
        self.guard("s3:ListBuckets", None)?;
        self.page(&self.buckets, token)
    }

    async fn public_access_block(
        &self,
        bucket: &str,
    ) -> ProviderResult<Option<PublicAccessBlock>> {
        self.guard("s3:GetPublicAccessBlock", Some(bucket))?;
        Ok(self.public_access_blocks.get(bucket).cloned())
    }

    async fn bucket_exists(&self, bucket: &str) -> ProviderResult<bool> {
        self.guard("s3:HeadBucket", Some(bucket))?;
        Ok(self.buckets.iter().any(|b| b.name == bucket))
    }

    async fn docdb_clusters(&self, token: Option<String>) -> ProviderResult<Page<DocDbCluster>> {
        self.guard("docdb:DescribeDBClusters", None)?;
        self.page(&self.docdb_clusters, token)
    }

    async fn docdb_manual_snapshots(
        &self,
        token: Option<String>,
    ) -> ProviderResult<Page<DocDbSnapshot>> {
        self.guard("docdb:DescribeDBClusterSnapshots", None)?;
        self.page(&self.docdb_snapshots, token)
    }

    async fn docdb_snapshot_attributes(
        &self,
        snapshot_id: &str,
    ) -> ProviderResult<Vec<SnapshotAttribute>> {
        self.guard(
            "docdb:DescribeDBClusterSnapshotAttributes",
            Some(snapshot_id),
        )?;
        Ok(Self::keyed(&self.docdb_snapshot_attributes, snapshot_id))
    }

    async fn owned_ebs_snapshots(
        &self,
        token: Option<String>,
    ) -> ProviderResult<Page<EbsSnapshot>> {
        self.guard("ec2:DescribeSnapshots", None)?;
        self.page(&self.ebs_snapshots, token)
    }

    async fn create_volume_permission_groups(
        &self,
        snapshot_id: &str,
    ) -> ProviderResult<Vec<String>> {
        self.guard("ec2:DescribeSnapshotAttribute", Some(snapshot_id))?;
        Ok(Self::keyed(&self.volume_permissions, snapshot_id))
    }

    async fn security_groups(&self, token: Option<String>) -> ProviderResult<Page<SecurityGroup>> {
        self.guard("ec2:DescribeSecurityGroups", None)?;
        self.page(&self.security_groups, token)
    }

    async fn active_task_definitions(
        &self,
        token: Option<String>,
    ) -> ProviderResult<Page<String>> {
        self.guard("ecs:ListTaskDefinitions", None)?;
        let arns: Vec<String> = self
            .task_definitions
            .iter()
            .map(|t| t.arn.clone())
            .collect();
        self.page(&arns, token)
    }

    async fn task_definition(&self, arn: &str) -> ProviderResult<TaskDefinition> {
        self.guard("ecs:DescribeTaskDefinition", Some(arn))?;
        self.task_definitions
            .iter()
            .find(|t| t.arn == arn)
            .cloned()
            .ok_or_else(|| ProviderError::new("ecs:DescribeTaskDefinition", "ClientException"))
    }
}
