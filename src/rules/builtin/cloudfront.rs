use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::provider::{collect_pages, Distribution, DistributionSummary, Provider, ProviderResult};
use crate::rules::{
    sweep, Annotate, Control, ControlMetadata, Judged, Scope, Service, Severity, Trail, Verdict,
};

const DISTRIBUTIONS: &str = "CloudFront distributions";

/// REST endpoint of an S3 bucket: `bucket.s3.amazonaws.com`,
/// `bucket.s3.us-east-1.amazonaws.com`, `bucket.s3.dualstack.…`.
/// Website endpoints (`s3-website-…`) do not match.
static S3_REST_ORIGIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<bucket>.+?)\.s3(?:\.[a-z0-9-]+)*\.amazonaws\.com(?:\.cn)?$").unwrap()
});

/// Bucket name behind an S3 REST origin domain.
pub(crate) fn s3_origin_bucket(domain: &str) -> Option<&str> {
    S3_REST_ORIGIN
        .captures(domain)
        .and_then(|c| c.name("bucket"))
        .map(|m| m.as_str())
}

fn metadata(
    id: &'static str,
    command: &'static str,
    title: &'static str,
    severity: Severity,
) -> ControlMetadata {
    ControlMetadata {
        id,
        command,
        title,
        service: Service::CloudFront,
        severity,
    }
}

async fn list_distributions(provider: &dyn Provider) -> ProviderResult<Vec<DistributionSummary>> {
    collect_pages(|token| provider.distributions(token)).await
}

/// Fetch the full configuration; a failure is recorded and the distribution skipped.
async fn describe(
    provider: &dyn Provider,
    summary: &DistributionSummary,
    judged: &mut Judged,
) -> Option<Distribution> {
    let id = &summary.id;
    judged.check(0, format!("Checking distribution: {id}"));
    match provider.distribution(id).await {
        Ok(distribution) => Some(distribution),
        Err(err) => {
            judged.error(
                1,
                format!("Failed to get distribution config for {id}: {err}"),
            );
            None
        }
    }
}

/// CloudFront.1: Default Root Object
///
/// A distribution without a default root object serves the origin's root
/// listing to anyone requesting `/`.
pub struct DefaultRootObjectConfigured;

#[async_trait]
impl Control for DefaultRootObjectConfigured {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "CloudFront.1",
            "cloudfront-default-root-object-configured",
            "CloudFront distributions should have a default root object configured",
            Severity::High,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            DISTRIBUTIONS,
            "All CloudFront distributions have a default root object configured",
            "One or more CloudFront distributions do not have a default root object configured",
        );
        let listing = list_distributions(provider).await;

        sweep(trail, listing, &scope, move |summary| async move {
            let mut judged = Judged::new();
            let Some(dist) = describe(provider, &summary, &mut judged).await else {
                return judged;
            };
            let id = &dist.id;
            match &dist.default_root_object {
                Some(object) => judged.pass(
                    1,
                    format!("Default root object '{object}' configured for distribution {id}"),
                ),
                None => judged.fail(
                    1,
                    format!("Default root object not configured for distribution {id}"),
                ),
            }
            judged
        })
        .await
    }
}

/// CloudFront.3: Encryption In Transit
///
/// Every cache behavior, the default one included, must redirect or restrict
/// viewers to HTTPS. A behavior whose policy is unknown is not judged.
pub struct ViewerPolicyHttps;

const ALLOW_ALL: &str = "allow-all";

#[async_trait]
impl Control for ViewerPolicyHttps {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "CloudFront.3",
            "cloudfront-viewer-policy-https",
            "CloudFront distributions should require encryption in transit",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            DISTRIBUTIONS,
            "All CloudFront distributions require HTTPS for viewers",
            "One or more CloudFront distributions allow unencrypted viewer traffic",
        );
        let listing = list_distributions(provider).await;

        sweep(trail, listing, &scope, move |summary| async move {
            let mut judged = Judged::new();
            let Some(dist) = describe(provider, &summary, &mut judged).await else {
                return judged;
            };

            let behaviors = std::iter::once(&dist.default_cache_behavior)
                .chain(&dist.cache_behaviors);
            for behavior in behaviors {
                let label = match &behavior.path_pattern {
                    Some(pattern) => format!("Cache behavior {pattern}"),
                    None => "Default cache behavior".to_string(),
                };
                let policy = &behavior.viewer_protocol_policy;
                if policy.is_empty() {
                    judged.error(1, format!("{label} has no viewer protocol policy"));
                } else if policy == ALLOW_ALL {
                    judged.fail(
                        1,
                        format!("{label} allows HTTP (viewer protocol policy: {policy})"),
                    );
                } else {
                    judged.pass(
                        1,
                        format!("{label} requires HTTPS (viewer protocol policy: {policy})"),
                    );
                }
            }
            judged
        })
        .await
    }
}

/// CloudFront.4: Origin Failover
///
/// Passes when at least one origin group has two or more members. Each group
/// is reported for information.
pub struct OriginFailoverEnabled;

#[async_trait]
impl Control for OriginFailoverEnabled {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "CloudFront.4",
            "cloudfront-origin-failover-enabled",
            "CloudFront distributions should have origin failover configured",
            Severity::Low,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            DISTRIBUTIONS,
            "All CloudFront distributions have origin failover configured",
            "One or more CloudFront distributions do not have origin failover configured",
        );
        let listing = list_distributions(provider).await;

        sweep(trail, listing, &scope, move |summary| async move {
            let mut judged = Judged::new();
            let Some(dist) = describe(provider, &summary, &mut judged).await else {
                return judged;
            };
            let id = &dist.id;

            if dist.origin_groups.is_empty() {
                judged.fail(
                    1,
                    format!("No origin groups configured for distribution {id}"),
                );
                return judged;
            }

            for group in &dist.origin_groups {
                let (group_id, members) = (&group.id, group.members.len());
                if members >= 2 {
                    judged.info(
                        1,
                        format!(
                            "Origin group {group_id} has failover configured with {members} origins"
                        ),
                    );
                } else {
                    judged.info(
                        1,
                        format!(
                            "Origin group {group_id} does not have enough origins for failover \
                             (found {members}, need at least 2)"
                        ),
                    );
                }
            }

            if dist.origin_groups.iter().any(|g| g.members.len() >= 2) {
                judged.pass(
                    1,
                    format!("Distribution {id} has valid failover configuration"),
                );
            } else {
                judged.fail(
                    1,
                    format!("Distribution {id} has no valid failover configuration"),
                );
            }
            judged
        })
        .await
    }
}

/// CloudFront.5: Access Logging
pub struct AccessLogsEnabled;

#[async_trait]
impl Control for AccessLogsEnabled {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "CloudFront.5",
            "cloudfront-accesslogs-enabled",
            "CloudFront distributions should have logging enabled",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            DISTRIBUTIONS,
            "All CloudFront distributions have access logging enabled",
            "One or more CloudFront distributions do not have access logging enabled",
        );
        let listing = list_distributions(provider).await;

        sweep(trail, listing, &scope, move |summary| async move {
            let mut judged = Judged::new();
            let Some(dist) = describe(provider, &summary, &mut judged).await else {
                return judged;
            };
            let id = &dist.id;

            let logging = dist
                .logging
                .as_ref()
                .filter(|l| l.enabled && l.bucket.as_deref().is_some_and(|b| !b.is_empty()));
            match logging {
                Some(logging) => {
                    judged.pass(1, format!("Access logging enabled for distribution {id}"));
                    if let Some(bucket) = &logging.bucket {
                        judged.info(2, format!("Logging destination bucket: {bucket}"));
                    }
                    if let Some(prefix) = &logging.prefix {
                        judged.info(2, format!("Log file prefix: {prefix}"));
                    }
                }
                None => {
                    judged.fail(
                        1,
                        format!("Access logging not enabled for distribution {id}"),
                    );
                }
            }
            judged
        })
        .await
    }
}

/// CloudFront.12: Non-existent S3 Origins
///
/// Each S3 REST origin is checked with a bucket lookup. Custom origins are
/// noted and left out; a failed lookup skips that origin.
pub struct S3OriginNonExistentBucket;

#[async_trait]
impl Control for S3OriginNonExistentBucket {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "CloudFront.12",
            "cloudfront-s3-origin-non-existent-bucket",
            "CloudFront distributions should not point to non-existent S3 origins",
            Severity::High,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            DISTRIBUTIONS,
            "All CloudFront distributions point to existing S3 buckets",
            "One or more CloudFront distributions point to non-existent S3 buckets",
        );
        let listing = list_distributions(provider).await;

        sweep(trail, listing, &scope, move |summary| async move {
            let mut judged = Judged::new();
            let Some(dist) = describe(provider, &summary, &mut judged).await else {
                return judged;
            };

            for origin in &dist.origins {
                let Some(bucket) = s3_origin_bucket(&origin.domain_name) else {
                    let origin_id = &origin.id;
                    judged.info(
                        1,
                        format!("Origin {origin_id} is not an S3 bucket origin, skipping"),
                    );
                    continue;
                };

                judged.check(1, format!("Checking S3 bucket origin: {bucket}"));
                match provider.bucket_exists(bucket).await {
                    Ok(true) => judged.pass(2, format!("S3 bucket {bucket} exists")),
                    Ok(false) => judged.fail(2, format!("S3 bucket {bucket} does not exist")),
                    Err(err) => {
                        judged.error(2, format!("Failed to check S3 bucket {bucket}: {err}"))
                    }
                }
            }
            judged
        })
        .await
    }
}

/// CloudFront.13: Origin Access Control
///
/// Distributions without S3 origins are out of scope; if none has one the
/// sweep concludes NA.
pub struct S3OriginAccessControlEnabled;

#[async_trait]
impl Control for S3OriginAccessControlEnabled {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "CloudFront.13",
            "cloudfront-s3-origin-access-control-enabled",
            "CloudFront distributions should use origin access control",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            DISTRIBUTIONS,
            "All CloudFront distributions with S3 origins have origin access control enabled",
            "One or more CloudFront distributions with S3 origins do not have origin access \
             control enabled",
        );
        let listing = list_distributions(provider).await;

        sweep(trail, listing, &scope, move |summary| async move {
            let mut judged = Judged::new();
            let Some(dist) = describe(provider, &summary, &mut judged).await else {
                return judged;
            };

            let s3_origins = dist
                .origins
                .iter()
                .filter(|o| s3_origin_bucket(&o.domain_name).is_some());
            for origin in s3_origins {
                let origin_id = &origin.id;
                judged.check(1, format!("Checking S3 origin: {origin_id}"));
                match &origin.origin_access_control_id {
                    Some(oac) => judged.pass(
                        2,
                        format!(
                            "Origin access control configured (ID: {oac}) for origin {origin_id}"
                        ),
                    ),
                    None => judged.fail(
                        2,
                        format!("Origin access control not configured for origin {origin_id}"),
                    ),
                }
            }
            judged
        })
        .await
    }
}

/// CloudFront.14: Tagging
pub struct TaggedDistribution;

/// Prefix of tags AWS applies itself; they do not count as tagging.
const SYSTEM_TAG_PREFIX: &str = "aws:";

#[async_trait]
impl Control for TaggedDistribution {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "CloudFront.14",
            "tagged-cloudfront-distribution",
            "CloudFront distributions should be tagged",
            Severity::Low,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            DISTRIBUTIONS,
            "All CloudFront distributions are tagged",
            "One or more CloudFront distributions are not tagged",
        );
        let listing = list_distributions(provider).await;

        sweep(trail, listing, &scope, move |summary| async move {
            let mut judged = Judged::new();
            let id = &summary.id;
            judged.check(0, format!("Checking distribution: {id}"));

            let tags = match provider.distribution_tags(&summary.arn).await {
                Ok(tags) => tags,
                Err(err) => {
                    judged.error(
                        1,
                        format!("Failed to get tags for distribution {id}: {err}"),
                    );
                    return judged;
                }
            };

            let user_tags: Vec<_> = tags
                .iter()
                .filter(|t| !t.key.starts_with(SYSTEM_TAG_PREFIX))
                .collect();
            if user_tags.is_empty() {
                judged.fail(1, format!("Distribution {id} has no tags"));
            } else {
                let count = user_tags.len();
                judged.pass(1, format!("Distribution {id} has {count} tag(s)"));
                for tag in user_tags {
                    let value = tag.value.as_deref().unwrap_or("");
                    judged.info(2, format!("{} = {value}", tag.key));
                }
            }
            judged
        })
        .await
    }
}
