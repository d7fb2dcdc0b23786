mod account;
mod apigateway;
mod cloudfront;
mod documentdb;
mod ec2;
mod ecs;
mod s3;

use super::Control;
use crate::config::ControlSettings;

/// Returns every built-in control, in catalog order.
pub fn all_controls(settings: &ControlSettings) -> Vec<Box<dyn Control>> {
    vec![
        Box::new(account::SecurityContactProvided),
        Box::new(apigateway::ExecutionLoggingEnabled),
        Box::new(apigateway::SslEnabled),
        Box::new(apigateway::XrayEnabled),
        Box::new(apigateway::AssociatedWithWaf),
        Box::new(apigateway::CacheEncrypted),
        Box::new(apigateway::V2AuthorizationTypeConfigured),
        Box::new(apigateway::V2AccessLogsEnabled),
        Box::new(cloudfront::DefaultRootObjectConfigured),
        Box::new(cloudfront::ViewerPolicyHttps),
        Box::new(cloudfront::OriginFailoverEnabled),
        Box::new(cloudfront::AccessLogsEnabled),
        Box::new(cloudfront::S3OriginNonExistentBucket),
        Box::new(cloudfront::S3OriginAccessControlEnabled),
        Box::new(cloudfront::TaggedDistribution),
        Box::new(documentdb::ClusterEncrypted),
        Box::new(documentdb::BackupRetentionCheck {
            min_retention_days: settings.docdb_min_retention_days,
        }),
        Box::new(documentdb::SnapshotPublicProhibited),
        Box::new(documentdb::AuditLoggingEnabled),
        Box::new(documentdb::DeletionProtectionEnabled),
        Box::new(ec2::EbsSnapshotPublicRestorable),
        Box::new(ec2::RestrictedCommonPorts),
        Box::new(ecs::TaskDefinitionUserForHostMode),
        Box::new(s3::AccountLevelPublicAccessBlocks),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCES: [&str; 7] = [
        include_str!("account.rs"),
        include_str!("apigateway.rs"),
        include_str!("cloudfront.rs"),
        include_str!("documentdb.rs"),
        include_str!("ec2.rs"),
        include_str!("ecs.rs"),
        include_str!("s3.rs"),
    ];

    #[test]
    fn every_control_struct_carries_an_id_header() {
        for control in all_controls(&ControlSettings::default()) {
            let header = format!("/// {}: ", control.metadata().id);
            assert!(
                SOURCES.iter().any(|source| source.contains(&header)),
                "no doc header for {header}"
            );
        }
    }
}
