use super::shape::{failed, flag, listed, next_token, number, present, text};
use crate::provider::{DocDbCluster, DocDbSnapshot, Page, ProviderResult, SnapshotAttribute};

/// The DocumentDB API shares its endpoint with RDS and Neptune; only
/// clusters with this engine are DocumentDB clusters.
const DOCDB_ENGINE: &str = "docdb";

pub(super) async fn clusters(
    client: &aws_sdk_docdb::Client,
    marker: Option<String>,
) -> ProviderResult<Page<DocDbCluster>> {
    let output = client
        .describe_db_clusters()
        .set_marker(marker)
        .send()
        .await
        .map_err(failed("docdb:DescribeDBClusters"))?;

    let items = listed(output.db_clusters())
        .iter()
        .filter(|c| present(c.engine()).map_or(true, |engine| engine == DOCDB_ENGINE))
        .map(|c| DocDbCluster {
            identifier: text(c.db_cluster_identifier()),
            storage_encrypted: flag(c.storage_encrypted()).unwrap_or(false),
            backup_retention_period: number(c.backup_retention_period()),
            deletion_protection: flag(c.deletion_protection()).unwrap_or(false),
            enabled_log_exports: listed(c.enabled_cloudwatch_logs_exports()).to_vec(),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.marker()),
    })
}

pub(super) async fn manual_snapshots(
    client: &aws_sdk_docdb::Client,
    marker: Option<String>,
) -> ProviderResult<Page<DocDbSnapshot>> {
    let output = client
        .describe_db_cluster_snapshots()
        .snapshot_type("manual")
        .set_marker(marker)
        .send()
        .await
        .map_err(failed("docdb:DescribeDBClusterSnapshots"))?;

    let items = listed(output.db_cluster_snapshots())
        .iter()
        .filter(|s| present(s.engine()).map_or(true, |engine| engine == DOCDB_ENGINE))
        .map(|s| DocDbSnapshot {
            identifier: text(s.db_cluster_snapshot_identifier()),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.marker()),
    })
}

pub(super) async fn snapshot_attributes(
    client: &aws_sdk_docdb::Client,
    snapshot_id: &str,
) -> ProviderResult<Vec<SnapshotAttribute>> {
    let output = client
        .describe_db_cluster_snapshot_attributes()
        .db_cluster_snapshot_identifier(snapshot_id)
        .send()
        .await
        .map_err(failed("docdb:DescribeDBClusterSnapshotAttributes"))?;

    Ok(present(output.db_cluster_snapshot_attributes_result())
        .map(|result| {
            listed(result.db_cluster_snapshot_attributes())
                .iter()
                .map(|attr| SnapshotAttribute {
                    name: text(attr.attribute_name()),
                    values: listed(attr.attribute_values()).to_vec(),
                })
                .collect()
        })
        .unwrap_or_default())
}
