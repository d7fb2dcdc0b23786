use async_trait::async_trait;

use crate::provider::{collect_pages, Provider, PublicAccessBlock};
use crate::rules::{
    sweep, Annotate, Control, ControlMetadata, Judged, Scope, Service, Severity, Trail, Verdict,
};

/// S3.1: Block Public Access
///
/// Every bucket must turn on all four public access block settings. A bucket
/// with no configuration at all fails.
pub struct AccountLevelPublicAccessBlocks;

fn settings(block: &PublicAccessBlock) -> [(&'static str, bool); 4] {
    [
        ("Block new public ACLs", block.block_public_acls),
        ("Block public access via any ACLs", block.ignore_public_acls),
        ("Block new public bucket policies", block.block_public_policy),
        (
            "Block public and cross-account access via any bucket policy",
            block.restrict_public_buckets,
        ),
    ]
}

#[async_trait]
impl Control for AccountLevelPublicAccessBlocks {
    fn metadata(&self) -> ControlMetadata {
        ControlMetadata {
            id: "S3.1",
            command: "s3-account-level-public-access-blocks-periodic",
            title: "S3 general purpose buckets should have block public access settings enabled",
            service: Service::S3,
            severity: Severity::Medium,
        }
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            "S3 buckets",
            "All S3 buckets have appropriate public access block settings",
            "One or more S3 buckets do not have appropriate public access block settings",
        );
        let listing = collect_pages(|token| provider.buckets(token)).await;

        sweep(trail, listing, &scope, move |bucket| async move {
            let mut judged = Judged::new();
            let name = bucket.name;
            judged.check(0, format!("Checking bucket: {name}"));

            let block = match provider.public_access_block(&name).await {
                Ok(Some(block)) => block,
                Ok(None) => {
                    judged.fail(
                        1,
                        format!("Public access block not configured for bucket {name}"),
                    );
                    return judged;
                }
                Err(err) => {
                    judged.error(
                        1,
                        format!("Failed to get public access block for bucket {name}: {err}"),
                    );
                    return judged;
                }
            };

            judged.check(1, "Public Access Block Configuration:");
            for (label, enabled) in settings(&block) {
                if enabled {
                    judged.pass(2, format!("{label}: {enabled}"));
                } else {
                    judged.fail(2, format!("{label}: {enabled}"));
                }
            }
            judged
        })
        .await
    }
}
