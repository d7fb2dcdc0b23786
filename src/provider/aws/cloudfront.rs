use aws_sdk_cloudfront::types;

use super::shape::{failed, flag, listed, next_token, opt_text, present, text, Present};
use crate::provider::{
    CacheBehavior, Distribution, DistributionSummary, LoggingConfig, Origin, OriginGroup, Page,
    ProviderError, ProviderResult, Tag,
};

pub(super) async fn distributions(
    client: &aws_sdk_cloudfront::Client,
    marker: Option<String>,
) -> ProviderResult<Page<DistributionSummary>> {
    let output = client
        .list_distributions()
        .set_marker(marker)
        .send()
        .await
        .map_err(failed("cloudfront:ListDistributions"))?;

    let Some(list) = output.distribution_list() else {
        return Ok(Page::default());
    };

    let items = listed(list.items())
        .iter()
        .map(|d| DistributionSummary {
            id: text(d.id()),
            arn: text(d.arn()),
        })
        .collect();

    let truncated = flag(list.is_truncated()).unwrap_or(false);
    Ok(Page {
        items,
        next_token: if truncated {
            next_token(list.next_marker())
        } else {
            None
        },
    })
}

pub(super) async fn distribution(
    client: &aws_sdk_cloudfront::Client,
    id: &str,
) -> ProviderResult<Distribution> {
    let output = client
        .get_distribution()
        .id(id)
        .send()
        .await
        .map_err(failed("cloudfront:GetDistribution"))?;

    let distribution = output.distribution().ok_or_else(|| missing_config(id))?;
    let config = present(distribution.distribution_config()).ok_or_else(|| missing_config(id))?;
    let default_behavior =
        present(config.default_cache_behavior()).ok_or_else(|| missing_config(id))?;
    let cache_behaviors = match present(config.cache_behaviors()) {
        Some(behaviors) => listed(behaviors.items())
            .iter()
            .map(|behavior| cache_behavior(behavior, id))
            .collect::<ProviderResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(Distribution {
        id: id.to_string(),
        arn: text(distribution.arn()),
        default_root_object: opt_text(config.default_root_object()),
        logging: present(config.logging()).map(|logging| LoggingConfig {
            enabled: flag(logging.enabled()).unwrap_or(false),
            bucket: opt_text(logging.bucket()),
            prefix: opt_text(logging.prefix()),
        }),
        origins: present(config.origins())
            .map(|origins| listed(origins.items()).iter().map(origin).collect())
            .unwrap_or_default(),
        origin_groups: present(config.origin_groups())
            .map(|groups| listed(groups.items()).iter().map(origin_group).collect())
            .unwrap_or_default(),
        default_cache_behavior: CacheBehavior {
            path_pattern: None,
            viewer_protocol_policy: viewer_protocol_policy(
                default_behavior.viewer_protocol_policy(),
                id,
            )?,
        },
        cache_behaviors,
    })
}

fn missing_config(id: &str) -> ProviderError {
    ProviderError::new(
        "cloudfront:GetDistribution",
        format!("response for {id} carried no distribution config"),
    )
}

/// A behavior without a viewer protocol policy cannot be judged by CloudFront.3.
fn viewer_protocol_policy<'a>(
    policy: impl Present<'a, types::ViewerProtocolPolicy>,
    id: &str,
) -> ProviderResult<String> {
    present(policy)
        .map(|p| p.as_str().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            ProviderError::new(
                "cloudfront:GetDistribution",
                format!("cache behavior of {id} carried no viewer protocol policy"),
            )
        })
}

fn origin(origin: &types::Origin) -> Origin {
    Origin {
        id: text(origin.id()),
        domain_name: text(origin.domain_name()),
        origin_access_control_id: opt_text(origin.origin_access_control_id()),
    }
}

fn origin_group(group: &types::OriginGroup) -> OriginGroup {
    let members = present(group.members())
        .map(|members| {
            listed(members.items())
                .iter()
                .map(|m| text(m.origin_id()))
                .collect()
        })
        .unwrap_or_default();

    OriginGroup {
        id: text(group.id()),
        members,
    }
}

fn cache_behavior(behavior: &types::CacheBehavior, id: &str) -> ProviderResult<CacheBehavior> {
    Ok(CacheBehavior {
        path_pattern: opt_text(behavior.path_pattern()),
        viewer_protocol_policy: viewer_protocol_policy(behavior.viewer_protocol_policy(), id)?,
    })
}

pub(super) async fn distribution_tags(
    client: &aws_sdk_cloudfront::Client,
    arn: &str,
) -> ProviderResult<Vec<Tag>> {
    let output = client
        .list_tags_for_resource()
        .resource(arn)
        .send()
        .await
        .map_err(failed("cloudfront:ListTagsForResource"))?;

    Ok(present(output.tags())
        .map(|tags| {
            listed(tags.items())
                .iter()
                .map(|tag| Tag {
                    key: text(tag.key()),
                    value: opt_text(tag.value()),
                })
                .collect()
        })
        .unwrap_or_default())
}
