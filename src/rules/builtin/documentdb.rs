use async_trait::async_trait;

use crate::provider::{collect_pages, DocDbCluster, Provider};
use crate::rules::{
    sweep, Annotate, Control, ControlMetadata, Judged, Scope, Service, Severity, Trail, Verdict,
};

const CLUSTERS: &str = "DocumentDB clusters";

/// Snapshot attribute listing the accounts allowed to restore it.
const RESTORE_ATTRIBUTE: &str = "restore";
/// Attribute value meaning "any AWS account".
const PUBLIC_GROUP: &str = "all";
const AUDIT_LOG_EXPORT: &str = "audit";

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
        service: Service::DocumentDb,
        severity,
    }
}

/// List every cluster and judge each with a synchronous predicate.
async fn sweep_clusters<F>(
    provider: &dyn Provider,
    trail: &mut Trail,
    scope: &Scope,
    judge: F,
) -> Verdict
where
    F: Fn(&DocDbCluster, &mut Judged) + Copy,
{
    let listing = collect_pages(|token| provider.docdb_clusters(token)).await;
    sweep(trail, listing, scope, move |cluster| async move {
        let mut judged = Judged::new();
        let id = &cluster.identifier;
        judged.check(0, format!("Checking cluster: {id}"));
        judge(&cluster, &mut judged);
        judged
    })
    .await
}

/// DocumentDB.1: Encryption At Rest
pub struct ClusterEncrypted;

#[async_trait]
impl Control for ClusterEncrypted {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "DocumentDB.1",
            "docdb-cluster-encrypted",
            "Amazon DocumentDB clusters should be encrypted at rest",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            CLUSTERS,
            "All DocumentDB clusters are encrypted at rest",
            "Unencrypted DocumentDB clusters found",
        );
        sweep_clusters(provider, trail, &scope, |cluster, judged| {
            let id = &cluster.identifier;
            if cluster.storage_encrypted {
                judged.pass(1, format!("Cluster {id} is encrypted at rest"));
            } else {
                judged.fail(1, format!("Cluster {id} is not encrypted at rest"));
            }
        })
        .await
    }
}

/// DocumentDB.2: Backup Retention
///
/// A cluster without a reported retention period counts as zero days.
pub struct BackupRetentionCheck {
    pub min_retention_days: i32,
}

impl Default for BackupRetentionCheck {
    fn default() -> Self {
        Self {
            min_retention_days: 7,
        }
    }
}

#[async_trait]
impl Control for BackupRetentionCheck {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "DocumentDB.2",
            "docdb-cluster-backup-retention-check",
            "Amazon DocumentDB clusters should have an adequate backup retention period",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            CLUSTERS,
            "All DocumentDB clusters have sufficient backup retention period",
            "DocumentDB clusters found with insufficient backup retention period",
        );
        let minimum = self.min_retention_days;
        sweep_clusters(provider, trail, &scope, move |cluster, judged| {
            let id = &cluster.identifier;
            let days = cluster.backup_retention_period.unwrap_or(0);
            if days >= minimum {
                judged.pass(
                    1,
                    format!("Cluster {id} has sufficient backup retention period: {days} days"),
                );
            } else {
                judged.fail(
                    1,
                    format!(
                        "Cluster {id} has insufficient backup retention period: {days} days \
                         (minimum: {minimum} days)"
                    ),
                );
            }
        })
        .await
    }
}

/// DocumentDB.3: Public Manual Snapshots
///
/// A snapshot is public when its `restore` attribute lists `all`.
pub struct SnapshotPublicProhibited;

#[async_trait]
impl Control for SnapshotPublicProhibited {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "DocumentDB.3",
            "docdb-cluster-snapshot-public-prohibited",
            "Amazon DocumentDB manual cluster snapshots should not be public",
            Severity::Critical,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            "DocumentDB manual cluster snapshots",
            "No public DocumentDB cluster snapshots found",
            "Public DocumentDB cluster snapshots found",
        );
        let listing = collect_pages(|token| provider.docdb_manual_snapshots(token)).await;

        sweep(trail, listing, &scope, move |snapshot| async move {
            let mut judged = Judged::new();
            let id = &snapshot.identifier;
            judged.check(0, format!("Checking snapshot: {id}"));

            let attributes = match provider.docdb_snapshot_attributes(id).await {
                Ok(attributes) => attributes,
                Err(err) => {
                    judged.error(1, format!("Failed to describe snapshot attributes: {err}"));
                    return judged;
                }
            };

            let public = attributes
                .iter()
                .filter(|a| a.name == RESTORE_ATTRIBUTE)
                .any(|a| a.values.iter().any(|v| v == PUBLIC_GROUP));
            if public {
                judged.fail(1, format!("Snapshot {id} is public"));
            } else {
                judged.pass(1, format!("Snapshot {id} is not public"));
            }
            judged
        })
        .await
    }
}

/// DocumentDB.4: Audit Log Export
pub struct AuditLoggingEnabled;

#[async_trait]
impl Control for AuditLoggingEnabled {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "DocumentDB.4",
            "docdb-cluster-audit-logging-enabled",
            "Amazon DocumentDB clusters should publish audit logs to CloudWatch Logs",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            CLUSTERS,
            "All DocumentDB clusters have audit logging enabled",
            "DocumentDB clusters do not have audit logging enabled",
        );
        sweep_clusters(provider, trail, &scope, |cluster, judged| {
            let id = &cluster.identifier;
            if cluster.enabled_log_exports.iter().any(|e| e == AUDIT_LOG_EXPORT) {
                judged.pass(1, format!("Cluster {id} has audit logging enabled"));
            } else {
                judged.fail(
                    1,
                    format!("Cluster {id} does not have audit logging enabled"),
                );
            }
        })
        .await
    }
}

/// DocumentDB.5: Deletion Protection
pub struct DeletionProtectionEnabled;

#[async_trait]
impl Control for DeletionProtectionEnabled {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "DocumentDB.5",
            "docdb-cluster-deletion-protection-enabled",
            "Amazon DocumentDB clusters should have deletion protection enabled",
            Severity::Medium,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            CLUSTERS,
            "All DocumentDB clusters have deletion protection enabled",
            "DocumentDB clusters do not have deletion protection enabled",
        );
        sweep_clusters(provider, trail, &scope, |cluster, judged| {
            let id = &cluster.identifier;
            if cluster.deletion_protection {
                judged.pass(1, format!("Cluster {id} has deletion protection enabled"));
            } else {
                judged.fail(
                    1,
                    format!("Cluster {id} does not have deletion protection enabled"),
                );
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DocDbSnapshot, SnapshotAttribute};
    use crate::testing::FixtureProvider;

    fn cluster(id: &str) -> DocDbCluster {
        DocDbCluster {
            identifier: id.into(),
            storage_encrypted: true,
            backup_retention_period: Some(7),
            deletion_protection: true,
            enabled_log_exports: vec!["audit".into(), "profiler".into()],
        }
    }

    fn with_clusters(clusters: Vec<DocDbCluster>) -> FixtureProvider {
        FixtureProvider {
            docdb_clusters: clusters,
            ..FixtureProvider::new()
        }
    }

    async fn run(control: &dyn Control, provider: &FixtureProvider) -> Verdict {
        let mut trail = Trail::new(control.metadata().id);
        control.evaluate(provider, &mut trail).await
    }

    #[tokio::test]
    async fn compliant_cluster_passes_every_cluster_control() {
        let provider = with_clusters(vec![cluster("c1")]);
        assert_eq!(run(&ClusterEncrypted, &provider).await, Verdict::Pass);
        assert_eq!(
            run(&BackupRetentionCheck::default(), &provider).await,
            Verdict::Pass
        );
        assert_eq!(run(&AuditLoggingEnabled, &provider).await, Verdict::Pass);
        assert_eq!(
            run(&DeletionProtectionEnabled, &provider).await,
            Verdict::Pass
        );
    }

    #[tokio::test]
    async fn each_predicate_fails_on_its_own_field() {
        let mut c = cluster("c2");
        c.storage_encrypted = false;
        let provider = with_clusters(vec![cluster("c1"), c]);
        assert_eq!(run(&ClusterEncrypted, &provider).await, Verdict::Fail);

        let mut c = cluster("c2");
        c.enabled_log_exports = vec!["profiler".into()];
        let provider = with_clusters(vec![c]);
        assert_eq!(run(&AuditLoggingEnabled, &provider).await, Verdict::Fail);

        let mut c = cluster("c2");
        c.deletion_protection = false;
        let provider = with_clusters(vec![c]);
        assert_eq!(
            run(&DeletionProtectionEnabled, &provider).await,
            Verdict::Fail
        );
    }

    #[tokio::test]
    async fn retention_threshold_is_configurable() {
        let mut c = cluster("c1");
        c.backup_retention_period = Some(3);
        let provider = with_clusters(vec![c]);

        assert_eq!(
            run(&BackupRetentionCheck::default(), &provider).await,
            Verdict::Fail
        );
        let relaxed = BackupRetentionCheck {
            min_retention_days: 1,
        };
        assert_eq!(run(&relaxed, &provider).await, Verdict::Pass);
    }

    #[tokio::test]
    async fn no_clusters_or_list_error_is_not_applicable() {
        let provider = with_clusters(vec![]);
        assert_eq!(
            run(&ClusterEncrypted, &provider).await,
            Verdict::NotApplicable
        );
        let provider = with_clusters(vec![cluster("c1")]).fail("docdb:DescribeDBClusters");
        assert_eq!(
            run(&ClusterEncrypted, &provider).await,
            Verdict::NotApplicable
        );
    }

    #[tokio::test]
    async fn public_snapshot_fails() {
        let mut provider = FixtureProvider {
            docdb_snapshots: vec![
                DocDbSnapshot {
                    identifier: "private".into(),
                },
                DocDbSnapshot {
                    identifier: "shared".into(),
                },
            ],
            ..FixtureProvider::new()
        };
        provider.docdb_snapshot_attributes.insert(
            "private".into(),
            vec![SnapshotAttribute {
                name: "restore".into(),
                values: vec!["123456789012".into()],
            }],
        );
        assert_eq!(
            run(&SnapshotPublicProhibited, &provider).await,
            Verdict::Pass
        );

        provider.docdb_snapshot_attributes.insert(
            "shared".into(),
            vec![SnapshotAttribute {
                name: "restore".into(),
                values: vec!["all".into()],
            }],
        );
        assert_eq!(
            run(&SnapshotPublicProhibited, &provider).await,
            Verdict::Fail
        );
    }

    #[tokio::test]
    async fn no_manual_snapshots_is_not_applicable() {
        assert_eq!(
            run(&SnapshotPublicProhibited, &FixtureProvider::new()).await,
            Verdict::NotApplicable
        );
    }
}
