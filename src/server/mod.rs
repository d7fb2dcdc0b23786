//! HTTP surface: one GET endpoint per control, a liveness check and a
//! generated OpenAPI document. Verdicts always come back with status 200.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::CatalogConfig;
use crate::error::{AuditError, Result};
use crate::provider::Provider;
use crate::rules::{ControlRegistry, Verdict};

pub const HELLO_PATH: &str = "/srv/hello";
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub registry: Arc<ControlRegistry>,
    pub catalog: CatalogConfig,
}

/// Body of every control endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub result: Verdict,
    pub message: String,
}

/// Build the router from the registry, one route per control.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route(HELLO_PATH, get(hello))
        .route(OPENAPI_PATH, get(openapi));

    for (index, meta) in state.registry.list().into_iter().enumerate() {
        router = router.route(
            &meta.route(),
            get(move |State(state): State<AppState>| run_control(state, index)),
        );
    }

    router.with_state(state)
}

async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello, World!" }))
}

async fn run_control(state: AppState, index: usize) -> Json<ControlResponse> {
    let Some(control) = state.registry.get(index) else {
        return Json(ControlResponse {
            result: Verdict::NotApplicable,
            message: "Control not registered".into(),
        });
    };

    let id = control.metadata().id;
    tracing::info!(control = id, "evaluating control over HTTP");
    let report = crate::run_control(control, state.provider.as_ref(), &state.catalog).await;
    Json(ControlResponse {
        result: report.verdict,
        message: report.message,
    })
}

async fn openapi(State(state): State<AppState>) -> Json<Value> {
    Json(openapi_document(&state.registry))
}

/// OpenAPI 3 description of every route the router serves.
pub fn openapi_document(registry: &ControlRegistry) -> Value {
    let mut paths = serde_json::Map::new();

    paths.insert(
        HELLO_PATH.to_string(),
        json!({
            "get": {
                "summary": "Liveness check",
                "operationId": "hello",
                "tags": ["srv"],
                "responses": {
                    "200": {
                        "description": "Service is up",
                        "content": {
                            "application/json": {"schema": {"$ref": "#/components/schemas/Hello"}}
                        }
                    }
                }
            }
        }),
    );

    for meta in registry.list() {
        paths.insert(
            meta.route(),
            json!({
                "get": {
                    "summary": format!("[{}] {}", meta.id, meta.title),
                    "operationId": meta.command,
                    "tags": [meta.service.slug()],
                    "x-severity": meta.severity.to_string(),
                    "responses": {
                        "200": {
                            "description": "Control verdict",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/ControlResult"}
                                }
                            }
                        }
                    }
                }
            }),
        );
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "hubaudit",
            "description": "AWS Security Hub control audits",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": paths,
        "components": {
            "schemas": {
                "ControlResult": {
                    "type": "object",
                    "required": ["result", "message"],
                    "properties": {
                        "result": {"type": "string", "enum": ["PASS", "FAIL", "NA"]},
                        "message": {"type": "string"}
                    }
                },
                "Hello": {
                    "type": "object",
                    "properties": {"message": {"type": "string"}}
                }
            }
        }
    })
}

/// Bind `bind` and serve until the process is stopped.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| AuditError::Server(format!("failed to bind {bind}: {e}")))?;
    tracing::info!(%bind, controls = state.registry.len(), "HTTP server listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| AuditError::Server(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Bucket, PublicAccessBlock};
    use crate::testing::FixtureProvider;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn state(provider: FixtureProvider) -> AppState {
        AppState {
            provider: Arc::new(provider),
            registry: Arc::new(ControlRegistry::default()),
            catalog: CatalogConfig {
                path: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                    .join("compliance/aws_security_hub.json"),
                strict: true,
            },
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn hello_answers() {
        let (status, body) = get_json(router(state(FixtureProvider::new())), HELLO_PATH).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Hello, World!"}));
    }

    #[tokio::test]
    async fn control_route_returns_verdict() {
        let mut provider = FixtureProvider {
            buckets: vec![Bucket {
                name: "locked".into(),
            }],
            ..FixtureProvider::new()
        };
        provider
            .public_access_blocks
            .insert("locked".into(), PublicAccessBlock::fully_blocked());

        let (status, body) = get_json(
            router(state(provider)),
            "/s3/s3-account-level-public-access-blocks-periodic",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "PASS");
    }

    #[tokio::test]
    async fn provider_failure_is_still_200_with_na() {
        let provider = FixtureProvider::new().fail("ec2:DescribeSecurityGroups");
        let (status, body) =
            get_json(router(state(provider)), "/ec2/restricted-common-ports").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"result": "NA", "message": "Failed to list security groups"})
        );
    }

    #[tokio::test]
    async fn openapi_lists_every_control_route() {
        let registry = ControlRegistry::default();
        let (status, body) = get_json(router(state(FixtureProvider::new())), OPENAPI_PATH).await;
        assert_eq!(status, StatusCode::OK);

        let paths = body["paths"].as_object().unwrap();
        assert_eq!(paths.len(), registry.len() + 1);
        for meta in registry.list() {
            assert!(
                paths.contains_key(&meta.route()),
                "missing {}",
                meta.route()
            );
        }
    }
}
