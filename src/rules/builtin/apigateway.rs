use async_trait::async_trait;

use crate::provider::{collect_pages, ApiV2, Provider, ProviderResult, RestApi, RestStage, WebAcl};
use crate::rules::{
    sweep, Annotate, Control, ControlMetadata, Judged, Scope, Service, Severity, Trail, Verdict,
};

const REST_APIS: &str = "API Gateway REST APIs";
const V2_APIS: &str = "API Gateway v2 APIs";

/// Logging level that disables execution logging.
const LOGGING_OFF: &str = "OFF";

/// Route authorization types that count as configured.
const AUTHORIZATION_TYPES: [&str; 3] = ["AWS_IAM", "CUSTOM", "JWT"];

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
        service: Service::ApiGateway,
        severity,
    }
}

async fn list_rest_apis(provider: &dyn Provider) -> ProviderResult<Vec<RestApi>> {
    collect_pages(|token| provider.rest_apis(token)).await
}

async fn list_v2_apis(provider: &dyn Provider) -> ProviderResult<Vec<ApiV2>> {
    collect_pages(|token| provider.v2_apis(token)).await
}

/// Stages of one REST API; `None` (after recording the error) when they
/// cannot be fetched.
async fn rest_stages(
    provider: &dyn Provider,
    api: &RestApi,
    judged: &mut Judged,
) -> Option<Vec<RestStage>> {
    let name = &api.name;
    judged.check(0, format!("Checking API: {name}"));
    match provider.rest_api_stages(&api.id).await {
        Ok(stages) if stages.is_empty() => {
            judged.info(1, format!("No stages deployed for API {name}"));
            Some(stages)
        }
        Ok(stages) => Some(stages),
        Err(err) => {
            judged.error(1, format!("Failed to get stages for API {name}: {err}"));
            None
        }
    }
}

/// ARN WAF uses to identify a REST API stage.
pub(crate) fn stage_arn(region: &str, api_id: &str, stage: &str) -> String {
    format!("arn:aws:apigateway:{region}::/restapis/{api_id}/stages/{stage}")
}

/// APIGateway.1: Execution Logging
///
/// REST stages need a method-setting logging level other than `OFF`;
/// WebSocket stages need a default route logging level other than `OFF`.
pub struct ExecutionLoggingEnabled;

/// An API whose stages carry execution logging settings.
enum LoggedApi {
    Rest(RestApi),
    WebSocket(ApiV2),
}

fn logging_enabled(level: Option<&str>) -> bool {
    level.is_some_and(|l| !l.is_empty() && !l.eq_ignore_ascii_case(LOGGING_OFF))
}

#[async_trait]
impl Control for ExecutionLoggingEnabled {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "APIGateway.1",
            "api-gw-execution-logging-enabled",
            "API Gateway REST and WebSocket API execution logging should be enabled",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            "API Gateway REST and WebSocket APIs",
            "All API Gateway REST and WebSocket API stages have execution logging enabled",
            "One or more API Gateway stages do not have execution logging enabled",
        );

        let listing = match (list_rest_apis(provider).await, list_v2_apis(provider).await) {
            (Ok(rest), Ok(v2)) => Ok(rest
                .into_iter()
                .map(LoggedApi::Rest)
                .chain(
                    v2.into_iter()
                        .filter(|api| api.protocol_type == "WEBSOCKET")
                        .map(LoggedApi::WebSocket),
                )
                .collect::<Vec<_>>()),
            (Err(err), _) | (_, Err(err)) => Err(err),
        };

        sweep(trail, listing, &scope, move |api| async move {
            let mut judged = Judged::new();
            match api {
                LoggedApi::Rest(api) => {
                    let Some(stages) = rest_stages(provider, &api, &mut judged).await else {
                        return judged;
                    };
                    for stage in stages {
                        let name = &stage.stage_name;
                        judged.check(1, format!("Checking stage: {name}"));
                        let levels: Vec<&str> = stage
                            .method_settings
                            .values()
                            .filter_map(|s| s.logging_level.as_deref())
                            .collect();
                        if !levels.is_empty() && levels.iter().all(|l| logging_enabled(Some(*l))) {
                            let levels = levels.join(", ");
                            judged.pass(
                                2,
                                format!("Logging enabled (level: {levels}) for stage {name}"),
                            );
                        } else {
                            judged.fail(2, format!("Logging not enabled for stage {name}"));
                        }
                    }
                }
                LoggedApi::WebSocket(api) => {
                    let api_name = &api.name;
                    judged.check(0, format!("Checking WebSocket API: {api_name}"));
                    let stages = match provider.v2_api_stages(&api.api_id).await {
                        Ok(stages) => stages,
                        Err(err) => {
                            judged.error(
                                1,
                                format!("Failed to get stages for WebSocket API {api_name}: {err}"),
                            );
                            return judged;
                        }
                    };
                    for stage in stages {
                        let name = &stage.stage_name;
                        judged.check(1, format!("Checking stage: {name}"));
                        match stage.default_logging_level.as_deref() {
                            Some(level) if logging_enabled(Some(level)) => judged.pass(
                                2,
                                format!("Logging enabled (level: {level}) for stage {name}"),
                            ),
                            _ => judged.fail(2, format!("Logging not enabled for stage {name}")),
                        }
                    }
                }
            }
            judged
        })
        .await
    }
}

/// APIGateway.2: Backend SSL Certificates
pub struct SslEnabled;

#[async_trait]
impl Control for SslEnabled {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "APIGateway.2",
            "api-gw-ssl-enabled",
            "API Gateway REST API stages should be configured to use SSL certificates for \
             backend authentication",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            REST_APIS,
            "All API Gateway REST API stages have SSL client certificates configured",
            "One or more API Gateway REST API stages do not have SSL client certificates \
             configured",
        );
        let listing = list_rest_apis(provider).await;

        sweep(trail, listing, &scope, move |api| async move {
            let mut judged = Judged::new();
            let Some(stages) = rest_stages(provider, &api, &mut judged).await else {
                return judged;
            };
            for stage in stages {
                let name = &stage.stage_name;
                judged.check(1, format!("Checking stage: {name}"));
                match &stage.client_certificate_id {
                    Some(cert) => judged.pass(
                        2,
                        format!("SSL certificate {cert} configured for stage {name}"),
                    ),
                    None => judged.fail(
                        2,
                        format!("No SSL certificate configured for stage {name}"),
                    ),
                }
            }
            judged
        })
        .await
    }
}

/// APIGateway.3: X-Ray Tracing
pub struct XrayEnabled;

#[async_trait]
impl Control for XrayEnabled {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "APIGateway.3",
            "api-gw-xray-enabled",
            "API Gateway REST API stages should have AWS X-Ray tracing enabled",
            Severity::Low,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            REST_APIS,
            "All API Gateway REST API stages have X-Ray tracing enabled",
            "One or more API Gateway REST API stages do not have X-Ray tracing enabled",
        );
        let listing = list_rest_apis(provider).await;

        sweep(trail, listing, &scope, move |api| async move {
            let mut judged = Judged::new();
            let Some(stages) = rest_stages(provider, &api, &mut judged).await else {
                return judged;
            };
            for stage in stages {
                let name = &stage.stage_name;
                if stage.tracing_enabled {
                    judged.pass(1, format!("X-Ray tracing enabled for stage {name}"));
                } else {
                    judged.fail(1, format!("X-Ray tracing not enabled for stage {name}"));
                }
            }
            judged
        })
        .await
    }
}

/// APIGateway.4: WAF Association
///
/// A stage passes when a regional web ACL lists its ARN or the stage itself
/// carries a web ACL ARN.
pub struct AssociatedWithWaf;

fn associated_acl<'a>(acls: &'a [WebAcl], stage: &RestStage, arn: &str) -> Option<&'a str> {
    let attached = stage.web_acl_arn.as_deref();
    acls.iter()
        .find(|acl| acl.resource_arns.iter().any(|r| r == arn) || attached == Some(&acl.arn))
        .map(|acl| acl.name.as_str())
}

#[async_trait]
impl Control for AssociatedWithWaf {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "APIGateway.4",
            "api-gw-associated-with-waf",
            "API Gateway should be associated with a WAF Web ACL",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            REST_APIS,
            "All API Gateway stages are associated with WAF web ACLs",
            "One or more API Gateway stages are not associated with WAF web ACLs",
        );
        let listing = list_rest_apis(provider).await;

        // Web ACLs are fetched once for the whole account, and only when
        // there is something to match them against.
        let acls = match &listing {
            Ok(apis) if !apis.is_empty() => match provider.regional_web_acls().await {
                Ok(acls) => acls,
                Err(err) => {
                    trail.error(0, format!("Failed to list WAF web ACLs: {err}"));
                    return trail.conclude(Verdict::NotApplicable, "Failed to list WAF web ACLs");
                }
            },
            _ => Vec::new(),
        };
        let acls = acls.as_slice();
        let region = provider.region();

        sweep(trail, listing, &scope, move |api| async move {
            let mut judged = Judged::new();
            let Some(stages) = rest_stages(provider, &api, &mut judged).await else {
                return judged;
            };
            for stage in stages {
                let name = &stage.stage_name;
                judged.check(1, format!("Checking stage: {name}"));
                let arn = stage_arn(region, &api.id, name);
                match associated_acl(acls, &stage, &arn) {
                    Some(acl) => {
                        judged.pass(2, format!("Stage {name} is associated with web ACL {acl}"))
                    }
                    None if stage.web_acl_arn.is_some() => {
                        judged.pass(2, format!("Stage {name} carries a web ACL association"))
                    }
                    None => judged.fail(
                        2,
                        format!("Stage {name} is not associated with any web ACL"),
                    ),
                }
            }
            judged
        })
        .await
    }
}

/// APIGateway.5: Cache Encryption
///
/// Only stages with caching enabled are judged.
pub struct CacheEncrypted;

#[async_trait]
impl Control for CacheEncrypted {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "APIGateway.5",
            "api-gw-cache-encrypted",
            "API Gateway REST API cache data should be encrypted at rest",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            REST_APIS,
            "All API Gateway REST API stages with caching enabled have encryption enabled",
            "One or more API Gateway REST API stages with caching enabled do not have encryption \
             enabled",
        );
        let listing = list_rest_apis(provider).await;

        sweep(trail, listing, &scope, move |api| async move {
            let mut judged = Judged::new();
            let Some(stages) = rest_stages(provider, &api, &mut judged).await else {
                return judged;
            };
            for stage in stages {
                let name = &stage.stage_name;
                judged.check(1, format!("Checking stage: {name}"));
                if !stage.cache_cluster_enabled {
                    judged.info(2, format!("Caching is not enabled for stage {name}"));
                    continue;
                }
                if stage.cache_cluster_size.as_deref().unwrap_or_default().is_empty() {
                    judged.fail(
                        2,
                        format!("Cache enabled but size not specified for stage {name}"),
                    );
                }

                let unencrypted: Vec<&str> = stage
                    .method_settings
                    .iter()
                    .filter(|(_, s)| s.caching_enabled && !s.cache_data_encrypted)
                    .map(|(method, _)| method.as_str())
                    .collect();
                if unencrypted.is_empty() {
                    judged.pass(2, format!("Cache encryption is enabled for stage {name}"));
                } else {
                    let methods = unencrypted.join(", ");
                    judged.fail(
                        2,
                        format!(
                            "Cache encryption is not enabled for stage {name} (methods: {methods})"
                        ),
                    );
                }
            }
            judged
        })
        .await
    }
}

/// APIGateway.8: Route Authorization
pub struct V2AuthorizationTypeConfigured;

#[async_trait]
impl Control for V2AuthorizationTypeConfigured {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "APIGateway.8",
            "api-gwv2-authorization-type-configured",
            "API Gateway routes should specify an authorization type",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            V2_APIS,
            "All API Gateway routes have a valid authorization type configured (AWS_IAM, CUSTOM, \
             or JWT)",
            "One or more API Gateway routes do not have a valid authorization type configured \
             (AWS_IAM, CUSTOM, or JWT)",
        );
        let listing = list_v2_apis(provider).await;

        sweep(trail, listing, &scope, move |api| async move {
            let mut judged = Judged::new();
            let name = &api.name;
            judged.check(0, format!("Checking API: {name}"));
            let routes = match provider.v2_api_routes(&api.api_id).await {
                Ok(routes) => routes,
                Err(err) => {
                    judged.error(1, format!("Failed to get routes for API {name}: {err}"));
                    return judged;
                }
            };
            for route in routes {
                let key = &route.route_key;
                let auth = route.authorization_type.as_deref().unwrap_or("NONE");
                if AUTHORIZATION_TYPES.contains(&auth) {
                    judged.pass(
                        1,
                        format!("Valid authorization type {auth} configured for route {key}"),
                    );
                } else {
                    judged.fail(
                        1,
                        format!(
                            "Invalid or no authorization type configured for route {key} \
                             (type: {auth})"
                        ),
                    );
                }
            }
            judged
        })
        .await
    }
}

/// APIGateway.9: V2 Access Logging
pub struct V2AccessLogsEnabled;

#[async_trait]
impl Control for V2AccessLogsEnabled {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "APIGateway.9",
            "api-gwv2-access-logs-enabled",
            "Access logging should be configured for API Gateway V2 Stages",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            V2_APIS,
            "All API Gateway V2 stages have access logging configured",
            "One or more API Gateway V2 stages do not have access logging configured",
        );
        let listing = list_v2_apis(provider).await;

        sweep(trail, listing, &scope, move |api| async move {
            let mut judged = Judged::new();
            let name = &api.name;
            judged.check(0, format!("Checking API: {name}"));
            let stages = match provider.v2_api_stages(&api.api_id).await {
                Ok(stages) => stages,
                Err(err) => {
                    judged.error(1, format!("Failed to get stages for API {name}: {err}"));
                    return judged;
                }
            };
            for stage in stages {
                let name = &stage.stage_name;
                match &stage.access_log_destination {
                    Some(destination) => {
                        judged.pass(1, format!("Access logging configured for stage {name}"));
                        judged.info(2, format!("Destination: {destination}"));
                    }
                    None => {
                        judged.fail(1, format!("Access logging not configured for stage {name}"))
                    }
                }
            }
            judged
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::*;
    use crate::provider::{ApiV2Route, ApiV2Stage, MethodSetting};
    use crate::rules::Mark;
    use crate::testing::FixtureProvider;
    use pretty_assertions::assert_eq;

    fn rest_api(id: &str) -> RestApi {
        RestApi {
            id: id.into(),
            name: format!("{id}-name"),
        }
    }

    fn stage(name: &str) -> RestStage {
        RestStage {
            stage_name: name.into(),
            ..Default::default()
        }
    }

    fn with_rest(stages: Vec<(&str, Vec<RestStage>)>) -> FixtureProvider {
        FixtureProvider {
            rest_apis: stages.iter().map(|(id, _)| rest_api(id)).collect(),
            rest_stages: stages
                .into_iter()
                .map(|(id, s)| (id.to_string(), s))
                .collect::<HashMap<_, _>>(),
            ..FixtureProvider::new()
        }
    }

    fn logging(level: &str) -> BTreeMap<String, MethodSetting> {
        [(
            "*/*".to_string(),
            MethodSetting {
                logging_level: Some(level.into()),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect()
    }

    async fn run(control: &dyn Control, provider: &FixtureProvider) -> (Verdict, Trail) {
        let mut trail = Trail::new(control.metadata().id);
        let verdict = control.evaluate(provider, &mut trail).await;
        (verdict, trail)
    }

    #[tokio::test]
    async fn execution_logging_covers_rest_and_websocket() {
        let mut info = stage("prod");
        info.method_settings = logging("INFO");
        let mut provider = with_rest(vec![("a1", vec![info])]);
        provider.v2_apis = vec![
            ApiV2 {
                api_id: "ws".into(),
                name: "chat".into(),
                protocol_type: "WEBSOCKET".into(),
            },
            ApiV2 {
                api_id: "http".into(),
                name: "plain".into(),
                protocol_type: "HTTP".into(),
            },
        ];
        provider.v2_stages.insert(
            "ws".into(),
            vec![ApiV2Stage {
                stage_name: "live".into(),
                default_logging_level: Some("ERROR".into()),
                ..Default::default()
            }],
        );
        assert_eq!(
            run(&ExecutionLoggingEnabled, &provider).await.0,
            Verdict::Pass
        );

        provider.v2_stages.insert(
            "ws".into(),
            vec![ApiV2Stage {
                stage_name: "live".into(),
                default_logging_level: Some("OFF".into()),
                ..Default::default()
            }],
        );
        let (verdict, trail) = run(&ExecutionLoggingEnabled, &provider).await;
        assert_eq!(verdict, Verdict::Fail);
        assert!(trail
            .lines()
            .iter()
            .any(|l| l.mark == Mark::Fail && l.text.contains("stage live")));
    }

    #[tokio::test]
    async fn rest_stage_without_logging_settings_fails() {
        let provider = with_rest(vec![("a1", vec![stage("dev")])]);
        assert_eq!(
            run(&ExecutionLoggingEnabled, &provider).await.0,
            Verdict::Fail
        );
    }

    #[tokio::test]
    async fn either_listing_failing_is_not_applicable() {
        let provider = with_rest(vec![("a1", vec![stage("dev")])]).fail("apigatewayv2:GetApis");
        assert_eq!(
            run(&ExecutionLoggingEnabled, &provider).await.0,
            Verdict::NotApplicable
        );
    }

    #[tokio::test]
    async fn ssl_and_xray_per_stage() {
        let mut good = stage("prod");
        good.client_certificate_id = Some("cert-1".into());
        good.tracing_enabled = true;
        let provider = with_rest(vec![("a1", vec![good.clone()]), ("a2", vec![stage("dev")])]);

        assert_eq!(run(&SslEnabled, &provider).await.0, Verdict::Fail);
        assert_eq!(run(&XrayEnabled, &provider).await.0, Verdict::Fail);

        let provider = with_rest(vec![("a1", vec![good])]);
        assert_eq!(run(&SslEnabled, &provider).await.0, Verdict::Pass);
        assert_eq!(run(&XrayEnabled, &provider).await.0, Verdict::Pass);
    }

    #[tokio::test]
    async fn apis_without_stages_are_not_applicable() {
        let provider = with_rest(vec![("a1", vec![])]);
        assert_eq!(run(&SslEnabled, &provider).await.0, Verdict::NotApplicable);
    }

    #[tokio::test]
    async fn waf_association_by_resource_arn() {
        let mut provider = with_rest(vec![("a1", vec![stage("prod"), stage("dev")])]);
        provider.web_acls = vec![WebAcl {
            name: "edge-acl".into(),
            arn: "arn:aws:wafv2:ap-northeast-2:123:regional/webacl/edge-acl/1".into(),
            resource_arns: vec![stage_arn("ap-northeast-2", "a1", "prod")],
        }];

        let (verdict, trail) = run(&AssociatedWithWaf, &provider).await;
        assert_eq!(verdict, Verdict::Fail);
        assert!(trail
            .lines()
            .iter()
            .any(|l| l.mark == Mark::Pass && l.text.contains("edge-acl")));
        assert!(trail
            .lines()
            .iter()
            .any(|l| l.mark == Mark::Fail && l.text.contains("Stage dev")));
    }

    #[tokio::test]
    async fn waf_listing_failure_is_not_applicable() {
        let provider = with_rest(vec![("a1", vec![stage("prod")])]).fail("wafv2:ListWebACLs");
        let (verdict, trail) = run(&AssociatedWithWaf, &provider).await;
        assert_eq!(verdict, Verdict::NotApplicable);
        assert_eq!(trail.message(), Some("Failed to list WAF web ACLs"));
    }

    #[tokio::test]
    async fn cache_encryption_only_applies_to_caching_stages() {
        let mut caching = stage("prod");
        caching.cache_cluster_enabled = true;
        caching.cache_cluster_size = Some("0.5".into());
        caching.method_settings.insert(
            "*/*".into(),
            MethodSetting {
                caching_enabled: true,
                cache_data_encrypted: false,
                ..Default::default()
            },
        );

        let provider = with_rest(vec![("a1", vec![stage("dev")])]);
        assert_eq!(
            run(&CacheEncrypted, &provider).await.0,
            Verdict::NotApplicable
        );

        let provider = with_rest(vec![("a1", vec![stage("dev"), caching.clone()])]);
        assert_eq!(run(&CacheEncrypted, &provider).await.0, Verdict::Fail);

        if let Some(setting) = caching.method_settings.get_mut("*/*") {
            setting.cache_data_encrypted = true;
        }
        let provider = with_rest(vec![("a1", vec![caching.clone()])]);
        assert_eq!(run(&CacheEncrypted, &provider).await.0, Verdict::Pass);

        caching.cache_cluster_size = None;
        let provider = with_rest(vec![("a1", vec![caching])]);
        assert_eq!(run(&CacheEncrypted, &provider).await.0, Verdict::Fail);
    }

    #[tokio::test]
    async fn route_authorization_types() {
        let mut provider = FixtureProvider {
            v2_apis: vec![ApiV2 {
                api_id: "h1".into(),
                name: "orders".into(),
                protocol_type: "HTTP".into(),
            }],
            ..FixtureProvider::new()
        };
        let route = |key: &str, auth: Option<&str>| ApiV2Route {
            route_key: key.into(),
            authorization_type: auth.map(str::to_string),
        };

        provider.v2_routes.insert(
            "h1".into(),
            vec![
                route("GET /a", Some("JWT")),
                route("POST /b", Some("AWS_IAM")),
            ],
        );
        assert_eq!(
            run(&V2AuthorizationTypeConfigured, &provider).await.0,
            Verdict::Pass
        );

        provider.v2_routes.insert(
            "h1".into(),
            vec![
                route("GET /a", Some("JWT")),
                route("$default", Some("NONE")),
            ],
        );
        assert_eq!(
            run(&V2AuthorizationTypeConfigured, &provider).await.0,
            Verdict::Fail
        );
    }

    #[tokio::test]
    async fn v2_access_logs() {
        let mut provider = FixtureProvider {
            v2_apis: vec![ApiV2 {
                api_id: "h1".into(),
                name: "orders".into(),
                protocol_type: "HTTP".into(),
            }],
            ..FixtureProvider::new()
        };
        provider.v2_stages.insert(
            "h1".into(),
            vec![
                ApiV2Stage {
                    stage_name: "prod".into(),
                    access_log_destination: Some(
                        "arn:aws:logs:ap-northeast-2:123:log-group:api".into(),
                    ),
                    default_logging_level: None,
                },
                ApiV2Stage {
                    stage_name: "$default".into(),
                    ..Default::default()
                },
            ],
        );

        let (verdict, trail) = run(&V2AccessLogsEnabled, &provider).await;
        assert_eq!(verdict, Verdict::Fail);
        assert!(trail
            .lines()
            .iter()
            .any(|l| l.mark == Mark::Fail && l.text.contains("$default")));
    }
}
