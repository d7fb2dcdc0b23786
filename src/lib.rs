//! hubaudit: AWS Security Hub control auditor.
//!
//! Each control lists one kind of resource in the configured account and
//! region, judges every item against a Security Hub rule, and reduces the
//! results to PASS, FAIL or NA with a diagnostic trail. Controls are exposed
//! both as CLI subcommands and as HTTP endpoints.
//!
//! # Quick Start
//!
//! ```no_run
//! use hubaudit::config::Config;
//! use hubaudit::provider::aws::{AwsProvider, ClientConfig};
//! use hubaudit::rules::ControlRegistry;
//!
//! # async fn demo() -> hubaudit::error::Result<()> {
//! let config = Config::default();
//! let provider = AwsProvider::connect(&ClientConfig::from(&config.aws)).await?;
//! let registry = ControlRegistry::new(&config.controls);
//! let control = registry.find("s3.1").expect("registered");
//! let report = hubaudit::run_control(control, &provider, &config.catalog).await;
//! println!("{}: {}", report.verdict, report.message);
//! # Ok(())
//! # }
//! ```

pub mod compliance;
pub mod config;
pub mod error;
pub mod output;
pub mod provider;
pub mod rules;
pub mod server;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use chrono::{DateTime, Utc};
use serde::Serialize;

use compliance::ComplianceCatalog;
use config::CatalogConfig;
use provider::Provider;
use rules::{Annotate, Control, ControlRegistry, Service, Severity, Trail, TrailLine, Verdict};

/// Outcome of evaluating one control.
#[derive(Debug, Clone, Serialize)]
pub struct ControlReport {
    pub id: &'static str,
    pub command: &'static str,
    pub title: &'static str,
    pub service: Service,
    pub severity: Severity,
    /// Catalog description, when the catalog loaded and lists the id.
    pub description: Option<String>,
    pub verdict: Verdict,
    pub message: String,
    pub trail: Vec<TrailLine>,
}

/// Every control evaluated in one `all` run.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRun {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub region: String,
    pub reports: Vec<ControlReport>,
}

/// Verdict counts across an [`AuditRun`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictCounts {
    pub pass: usize,
    pub fail: usize,
    pub not_applicable: usize,
}

impl AuditRun {
    pub fn counts(&self) -> VerdictCounts {
        let mut counts = VerdictCounts::default();
        for report in &self.reports {
            match report.verdict {
                Verdict::Pass => counts.pass += 1,
                Verdict::Fail => counts.fail += 1,
                Verdict::NotApplicable => counts.not_applicable += 1,
            }
        }
        counts
    }
}

/// Evaluate one control with a fresh trail.
///
/// The compliance catalog is re-read on every call. When it cannot be loaded
/// the failure is recorded on the trail and, under a strict catalog, the
/// control is not evaluated at all and reports NA.
pub async fn run_control(
    control: &dyn Control,
    provider: &dyn Provider,
    catalog: &CatalogConfig,
) -> ControlReport {
    let meta = control.metadata();
    let mut trail = Trail::new(meta.id);
    let mut description = None;

    let verdict = match ComplianceCatalog::load(&catalog.path) {
        Err(err) if catalog.strict => {
            trail.error(0, format!("Error loading compliance data: {err}"));
            trail.conclude(Verdict::NotApplicable, "Failed to load compliance data")
        }
        loaded => {
            match loaded {
                Ok(requirements) => {
                    description = requirements.announce(meta.id).map(str::to_string)
                }
                Err(err) => trail.error(0, format!("Error loading compliance data: {err}")),
            }
            control.evaluate(provider, &mut trail).await
        }
    };

    ControlReport {
        id: meta.id,
        command: meta.command,
        title: meta.title,
        service: meta.service,
        severity: meta.severity,
        description,
        verdict,
        message: trail.message().unwrap_or_default().to_string(),
        trail: trail.lines().to_vec(),
    }
}

/// Evaluate every registered control, one after another.
pub async fn run_all(
    registry: &ControlRegistry,
    provider: &dyn Provider,
    catalog: &CatalogConfig,
) -> AuditRun {
    let run_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();
    tracing::info!(%run_id, controls = registry.len(), "starting audit run");

    let mut reports = Vec::with_capacity(registry.len());
    for control in registry.iter() {
        reports.push(run_control(control, provider, catalog).await);
    }

    AuditRun {
        run_id,
        started_at,
        region: provider.region().to_string(),
        reports,
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::provider::{Distribution, LoggingConfig};
    use crate::testing::FixtureProvider;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn shipped_catalog() -> CatalogConfig {
        CatalogConfig {
            path: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("compliance/aws_security_hub.json"),
            strict: true,
        }
    }

    fn logging_scenario() -> FixtureProvider {
        FixtureProvider {
            distributions: vec![
                Distribution {
                    id: "id-1".into(),
                    arn: "arn:aws:cloudfront::123456789012:distribution/id-1".into(),
                    logging: Some(LoggingConfig {
                        enabled: false,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Distribution {
                    id: "id-2".into(),
                    arn: "arn:aws:cloudfront::123456789012:distribution/id-2".into(),
                    logging: Some(LoggingConfig {
                        enabled: true,
                        bucket: Some("logs-bucket".into()),
                        prefix: None,
                    }),
                    ..Default::default()
                },
            ],
            ..FixtureProvider::new()
        }
    }

    #[tokio::test]
    async fn report_carries_catalog_description() {
        let registry = ControlRegistry::default();
        let control = registry.find("cloudfront.5").unwrap();
        let report = run_control(control, &logging_scenario(), &shipped_catalog()).await;

        assert_eq!(report.id, "CloudFront.5");
        assert_eq!(report.verdict, Verdict::Fail);
        assert!(report.description.is_some());
        assert!(report.message.contains("1 out of 2"));
    }

    #[tokio::test]
    async fn strict_catalog_failure_is_not_applicable() {
        let registry = ControlRegistry::default();
        let control = registry.find("CloudFront.5").unwrap();
        let catalog = CatalogConfig {
            path: PathBuf::from("/nonexistent/catalog.json"),
            strict: true,
        };

        let report = run_control(control, &logging_scenario(), &catalog).await;
        assert_eq!(report.verdict, Verdict::NotApplicable);
        assert_eq!(report.message, "Failed to load compliance data");
    }

    #[tokio::test]
    async fn lenient_catalog_failure_still_evaluates() {
        let registry = ControlRegistry::default();
        let control = registry.find("CloudFront.5").unwrap();
        let catalog = CatalogConfig {
            path: PathBuf::from("/nonexistent/catalog.json"),
            strict: false,
        };

        let report = run_control(control, &logging_scenario(), &catalog).await;
        assert_eq!(report.verdict, Verdict::Fail);
        assert!(report.description.is_none());
    }

    #[tokio::test]
    async fn run_all_evaluates_every_control_and_is_repeatable() {
        let registry = ControlRegistry::default();
        let provider = logging_scenario();

        let first = run_all(&registry, &provider, &shipped_catalog()).await;
        let second = run_all(&registry, &provider, &shipped_catalog()).await;

        assert_eq!(first.reports.len(), registry.len());
        let counts = first.counts();
        assert_eq!(
            counts.pass + counts.fail + counts.not_applicable,
            registry.len()
        );
        assert_eq!(counts, second.counts());
        assert_ne!(first.run_id, second.run_id);
    }
}
