use aws_sdk_wafv2::types::{ResourceType, Scope};

use super::shape::{failed, flag, listed, next_token, opt_text, present, text};
use crate::provider::{
    collect_pages, ApiV2, ApiV2Route, ApiV2Stage, MethodSetting, Page, ProviderResult, RestApi,
    RestStage, WebAcl,
};

/// Largest page size GetRestApis accepts.
const REST_API_PAGE_LIMIT: i32 = 500;

pub(super) async fn rest_apis(
    client: &aws_sdk_apigateway::Client,
    position: Option<String>,
) -> ProviderResult<Page<RestApi>> {
    let output = client
        .get_rest_apis()
        .limit(REST_API_PAGE_LIMIT)
        .set_position(position)
        .send()
        .await
        .map_err(failed("apigateway:GetRestApis"))?;

    let items = listed(output.items())
        .iter()
        .map(|api| RestApi {
            id: text(api.id()),
            name: text(api.name()),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.position()),
    })
}

pub(super) async fn rest_api_stages(
    client: &aws_sdk_apigateway::Client,
    api_id: &str,
) -> ProviderResult<Vec<RestStage>> {
    let output = client
        .get_stages()
        .rest_api_id(api_id)
        .send()
        .await
        .map_err(failed("apigateway:GetStages"))?;

    Ok(listed(output.item()).iter().map(rest_stage).collect())
}

fn rest_stage(stage: &aws_sdk_apigateway::types::Stage) -> RestStage {
    let method_settings = present(stage.method_settings())
        .map(|settings| {
            settings
                .iter()
                .map(|(key, setting)| {
                    let setting = MethodSetting {
                        logging_level: opt_text(setting.logging_level()),
                        caching_enabled: flag(setting.caching_enabled()).unwrap_or(false),
                        cache_data_encrypted: flag(setting.cache_data_encrypted())
                            .unwrap_or(false),
                    };
                    (key.clone(), setting)
                })
                .collect()
        })
        .unwrap_or_default();

    RestStage {
        stage_name: text(stage.stage_name()),
        client_certificate_id: opt_text(stage.client_certificate_id()),
        tracing_enabled: flag(stage.tracing_enabled()).unwrap_or(false),
        cache_cluster_enabled: flag(stage.cache_cluster_enabled()).unwrap_or(false),
        cache_cluster_size: present(stage.cache_cluster_size()).map(|s| s.as_str().to_string()),
        web_acl_arn: opt_text(stage.web_acl_arn()),
        method_settings,
    }
}

pub(super) async fn regional_web_acls(
    client: &aws_sdk_wafv2::Client,
) -> ProviderResult<Vec<WebAcl>> {
    let summaries = collect_pages(|marker| web_acl_page(client, marker)).await?;

    let mut acls = Vec::with_capacity(summaries.len());
    for mut acl in summaries {
        let output = client
            .list_resources_for_web_acl()
            .web_acl_arn(&acl.arn)
            .resource_type(ResourceType::ApiGateway)
            .send()
            .await
            .map_err(failed("wafv2:ListResourcesForWebACL"))?;
        acl.resource_arns = listed(output.resource_arns()).to_vec();
        acls.push(acl);
    }

    Ok(acls)
}

async fn web_acl_page(
    client: &aws_sdk_wafv2::Client,
    marker: Option<String>,
) -> ProviderResult<Page<WebAcl>> {
    let output = client
        .list_web_acls()
        .scope(Scope::Regional)
        .set_next_marker(marker)
        .send()
        .await
        .map_err(failed("wafv2:ListWebACLs"))?;

    let items = listed(output.web_acls())
        .iter()
        .map(|acl| WebAcl {
            name: text(acl.name()),
            arn: text(acl.arn()),
            resource_arns: Vec::new(),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.next_marker()),
    })
}

pub(super) async fn v2_apis(
    client: &aws_sdk_apigatewayv2::Client,
    token: Option<String>,
) -> ProviderResult<Page<ApiV2>> {
    let output = client
        .get_apis()
        .set_next_token(token)
        .send()
        .await
        .map_err(failed("apigatewayv2:GetApis"))?;

    let items = listed(output.items())
        .iter()
        .map(|api| ApiV2 {
            api_id: text(api.api_id()),
            name: text(api.name()),
            protocol_type: present(api.protocol_type())
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.next_token()),
    })
}

pub(super) async fn v2_api_stages(
    client: &aws_sdk_apigatewayv2::Client,
    api_id: &str,
) -> ProviderResult<Vec<ApiV2Stage>> {
    collect_pages(|token| v2_stage_page(client, api_id, token)).await
}

async fn v2_stage_page(
    client: &aws_sdk_apigatewayv2::Client,
    api_id: &str,
    token: Option<String>,
) -> ProviderResult<Page<ApiV2Stage>> {
    let output = client
        .get_stages()
        .api_id(api_id)
        .set_next_token(token)
        .send()
        .await
        .map_err(failed("apigatewayv2:GetStages"))?;

    let items = listed(output.items())
        .iter()
        .map(|stage| ApiV2Stage {
            stage_name: text(stage.stage_name()),
            access_log_destination: present(stage.access_log_settings())
                .and_then(|settings| opt_text(settings.destination_arn())),
            default_logging_level: present(stage.default_route_settings())
                .and_then(|route| present(route.logging_level()))
                .map(|level| level.as_str().to_string()),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.next_token()),
    })
}

pub(super) async fn v2_api_routes(
    client: &aws_sdk_apigatewayv2::Client,
    api_id: &str,
) -> ProviderResult<Vec<ApiV2Route>> {
    collect_pages(|token| v2_route_page(client, api_id, token)).await
}

async fn v2_route_page(
    client: &aws_sdk_apigatewayv2::Client,
    api_id: &str,
    token: Option<String>,
) -> ProviderResult<Page<ApiV2Route>> {
    let output = client
        .get_routes()
        .api_id(api_id)
        .set_next_token(token)
        .send()
        .await
        .map_err(failed("apigatewayv2:GetRoutes"))?;

    let items = listed(output.items())
        .iter()
        .map(|route| ApiV2Route {
            route_key: text(route.route_key()),
            authorization_type: present(route.authorization_type())
                .map(|auth| auth.as_str().to_string()),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.next_token()),
    })
}
