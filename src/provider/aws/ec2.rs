use aws_sdk_ec2::types::{IpPermission, SnapshotAttributeName};

use super::shape::{failed, listed, next_token, number, present, text};
use crate::provider::{EbsSnapshot, IngressRule, Page, ProviderResult, SecurityGroup};

pub(super) async fn owned_snapshots(
    client: &aws_sdk_ec2::Client,
    token: Option<String>,
) -> ProviderResult<Page<EbsSnapshot>> {
    let output = client
        .describe_snapshots()
        .owner_ids("self")
        .set_next_token(token)
        .send()
        .await
        .map_err(failed("ec2:DescribeSnapshots"))?;

    let items = listed(output.snapshots())
        .iter()
        .map(|s| EbsSnapshot {
            snapshot_id: text(s.snapshot_id()),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.next_token()),
    })
}

pub(super) async fn create_volume_permission_groups(
    client: &aws_sdk_ec2::Client,
    snapshot_id: &str,
) -> ProviderResult<Vec<String>> {
    let output = client
        .describe_snapshot_attribute()
        .snapshot_id(snapshot_id)
        .attribute(SnapshotAttributeName::CreateVolumePermission)
        .send()
        .await
        .map_err(failed("ec2:DescribeSnapshotAttribute"))?;

    Ok(listed(output.create_volume_permissions())
        .iter()
        .filter_map(|perm| present(perm.group()).map(|g| g.as_str().to_string()))
        .collect())
}

pub(super) async fn security_groups(
    client: &aws_sdk_ec2::Client,
    token: Option<String>,
) -> ProviderResult<Page<SecurityGroup>> {
    let output = client
        .describe_security_groups()
        .set_next_token(token)
        .send()
        .await
        .map_err(failed("ec2:DescribeSecurityGroups"))?;

    let items = listed(output.security_groups())
        .iter()
        .map(|sg| SecurityGroup {
            group_id: text(sg.group_id()),
            group_name: text(sg.group_name()),
            ingress: listed(sg.ip_permissions())
                .iter()
                .map(ingress_rule)
                .collect(),
        })
        .collect();

    Ok(Page {
        items,
        next_token: next_token(output.next_token()),
    })
}

fn ingress_rule(perm: &IpPermission) -> IngressRule {
    IngressRule {
        protocol: text(perm.ip_protocol()),
        from_port: number(perm.from_port()),
        to_port: number(perm.to_port()),
        ipv4_ranges: listed(perm.ip_ranges())
            .iter()
            .filter_map(|r| present(r.cidr_ip()).map(str::to_string))
            .collect(),
        ipv6_ranges: listed(perm.ipv6_ranges())
            .iter()
            .filter_map(|r| present(r.cidr_ipv6()).map(str::to_string))
            .collect(),
    }
}
