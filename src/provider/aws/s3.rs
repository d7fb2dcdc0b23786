use aws_sdk_s3::error::ProvideErrorMetadata;

use super::shape::{failed, flag, listed, next_token, text};
use crate::provider::{Bucket, Page, ProviderResult, PublicAccessBlock};

/// Error code S3 returns for a bucket that never had a block configured.
const NO_PUBLIC_ACCESS_BLOCK: &str = "NoSuchPublicAccessBlockConfiguration";

pub(super) async fn buckets(
    client: &aws_sdk_s3::Client,
    token: Option<String>,
) -> ProviderResult<Page<Bucket>> {
    let output = client
        .list_buckets()
        .set_continuation_token(token)
        .send()
        .await
        .map_err(failed("s3:ListBuckets"))?;

    let items = listed(output.buckets())
        .iter()
        .map(|b| Bucket {
            name: text(b.name()),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.continuation_token()),
    })
}

pub(super) async fn public_access_block(
    client: &aws_sdk_s3::Client,
    bucket: &str,
) -> ProviderResult<Option<PublicAccessBlock>> {
    let output = match client.get_public_access_block().bucket(bucket).send().await {
        Ok(output) => output,
        Err(err) if err.code() == Some(NO_PUBLIC_ACCESS_BLOCK) => return Ok(None),
        Err(err) => return Err(failed("s3:GetPublicAccessBlock")(err)),
    };

    Ok(output
        .public_access_block_configuration()
        .map(|c| PublicAccessBlock {
            block_public_acls: flag(c.block_public_acls()).unwrap_or(false),
            ignore_public_acls: flag(c.ignore_public_acls()).unwrap_or(false),
            block_public_policy: flag(c.block_public_policy()).unwrap_or(false),
            restrict_public_buckets: flag(c.restrict_public_buckets()).unwrap_or(false),
        }))
}

pub(super) async fn bucket_exists(
    client: &aws_sdk_s3::Client,
    bucket: &str,
) -> ProviderResult<bool> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => Ok(true),
        Err(err) => {
            let not_found = err.as_service_error().is_some_and(|e| e.is_not_found())
                || err
                    .raw_response()
                    .is_some_and(|r| r.status().as_u16() == 404);
            if not_found {
                Ok(false)
            } else {
                Err(failed("s3:HeadBucket")(err))
            }
        }
    }
}
