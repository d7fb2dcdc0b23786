//! [`Provider`] backed by the AWS SDK.
//!
//! One SDK client per service, built once from a shared [`SdkConfig`] and
//! reused for every control the process runs. All calls are read-only.

mod account;
mod apigateway;
mod cloudfront;
mod docdb;
mod ec2;
mod ecs;
mod s3;
pub(crate) mod shape;

use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;

use crate::config::AwsConfig;
use crate::error::{AuditError, Result};
use crate::provider::*;

/// CloudFront is a global service whose API lives in us-east-1.
pub const CLOUDFRONT_REGION: &str = "us-east-1";

/// Region and credential resolution settings shared by every control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub region: String,
    pub profile: Option<String>,
    pub operation_timeout: Duration,
    pub connect_timeout: Duration,
}

impl From<&AwsConfig> for ClientConfig {
    fn from(aws: &AwsConfig) -> Self {
        Self {
            region: aws.region.clone(),
            profile: aws.profile.clone(),
            operation_timeout: Duration::from_secs(aws.timeout_secs),
            connect_timeout: Duration::from_secs(aws.connect_timeout_secs),
        }
    }
}

impl ClientConfig {
    /// Resolve the SDK configuration and confirm credentials are available.
    ///
    /// Credential resolution happens here rather than lazily on the first
    /// API call so that a missing or broken credential chain is reported as
    /// a client-initialization failure instead of NA on every control.
    pub async fn load(&self) -> Result<SdkConfig> {
        if self.region.trim().is_empty() {
            return Err(AuditError::Client("region is empty".into()));
        }

        let timeouts = TimeoutConfig::builder()
            .operation_timeout(self.operation_timeout)
            .connect_timeout(self.connect_timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .timeout_config(timeouts);
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        let sdk = loader.load().await;

        let credentials = sdk
            .credentials_provider()
            .ok_or_else(|| AuditError::Client("no credentials provider configured".into()))?;
        credentials
            .provide_credentials()
            .await
            .map_err(|e| AuditError::Client(format!("unable to resolve credentials: {e}")))?;

        tracing::debug!(region = %self.region, profile = ?self.profile, "AWS configuration loaded");
        Ok(sdk)
    }
}

pub struct AwsProvider {
    region: String,
    account: aws_sdk_account::Client,
    apigateway: aws_sdk_apigateway::Client,
    apigatewayv2: aws_sdk_apigatewayv2::Client,
    cloudfront: aws_sdk_cloudfront::Client,
    docdb: aws_sdk_docdb::Client,
    ec2: aws_sdk_ec2::Client,
    ecs: aws_sdk_ecs::Client,
    s3: aws_sdk_s3::Client,
    wafv2: aws_sdk_wafv2::Client,
}

impl AwsProvider {
    /// Load configuration and build every service client.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let sdk = config.load().await?;
        Ok(Self::from_sdk_config(&sdk, &config.region))
    }

    pub fn from_sdk_config(sdk: &SdkConfig, region: &str) -> Self {
        let cloudfront_conf = aws_sdk_cloudfront::config::Builder::from(sdk)
            .region(Region::new(CLOUDFRONT_REGION))
            .build();

        Self {
            region: region.to_string(),
            account: aws_sdk_account::Client::new(sdk),
            apigateway: aws_sdk_apigateway::Client::new(sdk),
            apigatewayv2: aws_sdk_apigatewayv2::Client::new(sdk),
            cloudfront: aws_sdk_cloudfront::Client::from_conf(cloudfront_conf),
            docdb: aws_sdk_docdb::Client::new(sdk),
            ec2: aws_sdk_ec2::Client::new(sdk),
            ecs: aws_sdk_ecs::Client::new(sdk),
            s3: aws_sdk_s3::Client::new(sdk),
            wafv2: aws_sdk_wafv2::Client::new(sdk),
        }
    }
}

#[async_trait]
impl Provider for AwsProvider {
    fn region(&self) -> &str {
        &self.region
    }

    async fn security_contact(&self) -> ProviderResult<Option<AlternateContact>> {
        account::security_contact(&self.account).await
    }

    async fn rest_apis(&self, token: Option<String>) -> ProviderResult<Page<RestApi>> {
        apigateway::rest_apis(&self.apigateway, token).await
    }

    async fn rest_api_stages(&self, api_id: &str) -> ProviderResult<Vec<RestStage>> {
        apigateway::rest_api_stages(&self.apigateway, api_id).await
    }

    async fn regional_web_acls(&self) -> ProviderResult<Vec<WebAcl>> {
        apigateway::regional_web_acls(&self.wafv2).await
    }

    async fn v2_apis(&self, token: Option<String>) -> ProviderResult<Page<ApiV2>> {
        apigateway::v2_apis(&self.apigatewayv2, token).await
    }

    async fn v2_api_stages(&self, api_id: &str) -> ProviderResult<Vec<ApiV2Stage>> {
        apigateway::v2_api_stages(&self.apigatewayv2, api_id).await
    }

    async fn v2_api_routes(&self, api_id: &str) -> ProviderResult<Vec<ApiV2Route>> {
        apigateway::v2_api_routes(&self.apigatewayv2, api_id).await
    }

    async fn distributions(
        &self,
        token: Option<String>,
    ) -> ProviderResult<Page<DistributionSummary>> {
        cloudfront::distributions(&self.cloudfront, token).await
    }

    async fn distribution(&self, id: &str) -> ProviderResult<Distribution> {
        cloudfront::distribution(&self.cloudfront, id).await
    }

    async fn distribution_tags(&self, arn: &str) -> ProviderResult<Vec<Tag>> {
        cloudfront::distribution_tags(&self.cloudfront, arn).await
    }

    async fn buckets(&self, token: Option<String>) -> ProviderResult<Page<Bucket>> {
        s3::buckets(&self.s3, token).await
    }

    async fn public_access_block(
        &self,
        bucket: &str,
    ) -> ProviderResult<Option<PublicAccessBlock>> {
        s3::public_access_block(&self.s3, bucket).await
    }

    async fn bucket_exists(&self, bucket: &str) -> ProviderResult<bool> {
        s3::bucket_exists(&self.s3, bucket).await
    }

    async fn docdb_clusters(&self, token: Option<String>) -> ProviderResult<Page<DocDbCluster>> {
        docdb::clusters(&self.docdb, token).await
    }

    async fn docdb_manual_snapshots(
        &self,
        token: Option<String>,
    ) -> ProviderResult<Page<DocDbSnapshot>> {
        docdb::manual_snapshots(&self.docdb, token).await
    }

    async fn docdb_snapshot_attributes(
        &self,
        snapshot_id: &str,
    ) -> ProviderResult<Vec<SnapshotAttribute>> {
        docdb::snapshot_attributes(&self.docdb, snapshot_id).await
    }

    async fn owned_ebs_snapshots(
        &self,
        token: Option<String>,
    ) -> ProviderResult<Page<EbsSnapshot>> {
        ec2::owned_snapshots(&self.ec2, token).await
    }

    async fn create_volume_permission_groups(
        &self,
        snapshot_id: &str,
    ) -> ProviderResult<Vec<String>> {
        ec2::create_volume_permission_groups(&self.ec2, snapshot_id).await
    }

    async fn security_groups(&self, token: Option<String>) -> ProviderResult<Page<SecurityGroup>> {
        ec2::security_groups(&self.ec2, token).await
    }

    async fn active_task_definitions(
        &self,
        token: Option<String>,
    ) -> ProviderResult<Page<String>> {
        ecs::active_task_definitions(&self.ecs, token).await
    }

    async fn task_definition(&self, arn: &str) -> ProviderResult<TaskDefinition> {
        ecs::task_definition(&self.ecs, arn).await
    }
}
