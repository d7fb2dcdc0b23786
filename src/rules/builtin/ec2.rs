use async_trait::async_trait;

use crate::provider::{collect_pages, Provider, SecurityGroup};
use crate::rules::{
    sweep, Annotate, Control, ControlMetadata, Judged, Scope, Service, Severity, Trail, Verdict,
};

/// Permission group granting every AWS account access.
const PUBLIC_GROUP: &str = "all";

/// Ports EC2.19 forbids opening to the world.
pub const HIGH_RISK_PORTS: [i32; 24] = [
    20, 21, 22, 23, 25, 110, 135, 143, 445, 1433, 1434, 3000, 3306, 3389, 4333, 5000, 5432, 5500,
    5601, 8080, 8088, 8888, 9200, 9300,
];

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
        service: Service::Ec2,
        severity,
    }
}

/// EC2.1: Public EBS Snapshots
///
/// Only snapshots owned by the account are listed. No owned snapshots means
/// nothing can be exposed, so an empty listing passes.
pub struct EbsSnapshotPublicRestorable;

#[async_trait]
impl Control for EbsSnapshotPublicRestorable {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "EC2.1",
            "ebs-snapshot-public-restorable-check",
            "Amazon EBS snapshots should not be publicly restorable",
            Severity::Critical,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            "EBS snapshots",
            "No EBS snapshots are publicly restorable",
            "Publicly restorable EBS snapshots found",
        )
        .pass_when_empty();
        let listing = collect_pages(|token| provider.owned_ebs_snapshots(token)).await;

        sweep(trail, listing, &scope, move |snapshot| async move {
            let mut judged = Judged::new();
            let id = snapshot.snapshot_id;
            judged.check(0, format!("Checking snapshot: {id}"));

            match provider.create_volume_permission_groups(&id).await {
                Err(err) => judged.error(
                    1,
                    format!("Failed to describe snapshot attribute for {id}: {err}"),
                ),
                Ok(groups) if groups.iter().any(|g| g == PUBLIC_GROUP) => {
                    judged.fail(1, format!("EBS snapshot {id} is publicly restorable"))
                }
                Ok(_) => judged.pass(1, format!("EBS snapshot {id} is not publicly restorable")),
            }
            judged
        })
        .await
    }
}

/// EC2.19: High-risk Ports
pub struct RestrictedCommonPorts;

/// Every `(port, cidr)` pair the group opens to the world on a high-risk port.
fn unrestricted_exposures(group: &SecurityGroup) -> Vec<(i32, &str)> {
    let mut exposures = Vec::new();
    for rule in &group.ingress {
        let open = rule.open_ranges();
        if open.is_empty() {
            continue;
        }
        for port in HIGH_RISK_PORTS.iter().copied().filter(|p| rule.covers_port(*p)) {
            exposures.extend(open.iter().map(|cidr| (port, *cidr)));
        }
    }
    exposures
}

#[async_trait]
impl Control for RestrictedCommonPorts {
    fn metadata(&self) -> ControlMetadata {
        metadata(
            "EC2.19",
            "restricted-common-ports",
            "Security groups should not allow unrestricted access to ports with high risk",
            Severity::Critical,
        )
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            "security groups",
            "No security groups allow unrestricted access to high-risk ports",
            "Security groups allow unrestricted access to high-risk ports",
        );
        let listing = collect_pages(|token| provider.security_groups(token)).await;

        sweep(trail, listing, &scope, |group| async move {
            let mut judged = Judged::new();
            let (name, id) = (&group.group_name, &group.group_id);
            judged.check(0, format!("Checking security group: {name} ({id})"));

            let exposures = unrestricted_exposures(&group);
            if exposures.is_empty() {
                judged.pass(
                    1,
                    format!("Security group {id} has no unrestricted access on high-risk ports"),
                );
            }
            for (port, cidr) in exposures {
                judged.fail(
                    1,
                    format!(
                        "Security group {id} allows unrestricted access to port {port} from {cidr}"
                    ),
                );
            }
            judged
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{EbsSnapshot, IngressRule};
    use crate::rules::Mark;
    use crate::testing::FixtureProvider;
    use proptest::prelude::*;

    async fn run(control: &dyn Control, provider: &FixtureProvider) -> (Verdict, Trail) {
        let mut trail = Trail::new(control.metadata().id);
        let verdict = control.evaluate(provider, &mut trail).await;
        (verdict, trail)
    }

    fn snapshots(ids: &[&str]) -> Vec<EbsSnapshot> {
        ids.iter()
            .map(|id| EbsSnapshot {
                snapshot_id: id.to_string(),
            })
            .collect()
    }

    fn group(id: &str, ingress: Vec<IngressRule>) -> SecurityGroup {
        SecurityGroup {
            group_id: id.into(),
            group_name: format!("{id}-name"),
            ingress,
        }
    }

    fn rule(protocol: &str, from: i32, to: i32, v4: &[&str]) -> IngressRule {
        IngressRule {
            protocol: protocol.into(),
            from_port: Some(from),
            to_port: Some(to),
            ipv4_ranges: v4.iter().map(|s| s.to_string()).collect(),
            ipv6_ranges: vec![],
        }
    }

    #[tokio::test]
    async fn no_snapshots_passes() {
        let (verdict, trail) = run(&EbsSnapshotPublicRestorable, &FixtureProvider::new()).await;
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(trail.message(), Some("No EBS snapshots found"));
    }

    #[tokio::test]
    async fn public_snapshot_fails() {
        let mut provider = FixtureProvider {
            ebs_snapshots: snapshots(&["snap-1", "snap-2"]),
            ..FixtureProvider::new()
        };
        provider
            .volume_permissions
            .insert("snap-2".into(), vec!["all".into()]);

        let (verdict, trail) = run(&EbsSnapshotPublicRestorable, &provider).await;
        assert_eq!(verdict, Verdict::Fail);
        assert!(trail
            .lines()
            .iter()
            .any(|l| l.mark == Mark::Fail && l.text.contains("snap-2")));
    }

    #[tokio::test]
    async fn attribute_error_skips_only_that_snapshot() {
        let provider = FixtureProvider {
            ebs_snapshots: snapshots(&["snap-1", "snap-2"]),
            ..FixtureProvider::new()
        }
        .fail_for("ec2:DescribeSnapshotAttribute", "snap-1");

        let (verdict, trail) = run(&EbsSnapshotPublicRestorable, &provider).await;
        assert_eq!(verdict, Verdict::Pass);
        assert!(trail.lines().iter().any(|l| l.mark == Mark::Error));
    }

    #[tokio::test]
    async fn open_ssh_fails_and_private_range_passes() {
        let provider = FixtureProvider {
            security_groups: vec![
                group("sg-private", vec![rule("tcp", 22, 22, &["10.0.0.0/8"])]),
                group("sg-open", vec![rule("tcp", 22, 22, &["0.0.0.0/0"])]),
            ],
            ..FixtureProvider::new()
        };
        let (verdict, trail) = run(&RestrictedCommonPorts, &provider).await;
        assert_eq!(verdict, Verdict::Fail);
        let message = trail.message().unwrap_or_default();
        let summary = "Security groups allow unrestricted access to high-risk ports";
        assert!(message.starts_with(summary));
        assert!(message.ends_with("(1 out of 2 security groups)"));
    }

    #[tokio::test]
    async fn open_https_is_not_high_risk() {
        let provider = FixtureProvider {
            security_groups: vec![group("sg-web", vec![rule("tcp", 443, 443, &["0.0.0.0/0"])])],
            ..FixtureProvider::new()
        };
        assert_eq!(
            run(&RestrictedCommonPorts, &provider).await.0,
            Verdict::Pass
        );
    }

    #[test]
    fn all_traffic_rule_exposes_every_high_risk_port() {
        let g = group(
            "sg-any",
            vec![IngressRule {
                protocol: "-1".into(),
                from_port: None,
                to_port: None,
                ipv4_ranges: vec![],
                ipv6_ranges: vec!["::/0".into()],
            }],
        );
        let exposures = unrestricted_exposures(&g);
        assert_eq!(exposures.len(), HIGH_RISK_PORTS.len());
        assert!(exposures.iter().all(|(_, cidr)| *cidr == "::/0"));
    }

    #[test]
    fn range_rule_reports_each_port_inside_it() {
        let g = group("sg-range", vec![rule("tcp", 3000, 3400, &["0.0.0.0/0"])]);
        let ports: Vec<i32> = unrestricted_exposures(&g)
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(ports, vec![3000, 3306, 3389]);
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #[test]
        fn snapshot_verdict_fails_iff_any_is_public(
            public in prop::collection::vec(any::<bool>(), 0..8)
        ) {
            let ids: Vec<String> = (0..public.len()).map(|i| format!("snap-{i}")).collect();
            let mut provider = FixtureProvider {
                ebs_snapshots: ids
                    .iter()
                    .map(|id| EbsSnapshot { snapshot_id: id.clone() })
                    .collect(),
                ..FixtureProvider::new()
            };
            for (id, exposed) in ids.iter().zip(&public) {
                if *exposed {
                    provider.volume_permissions.insert(id.clone(), vec!["all".into()]);
                }
            }

            let (verdict, _) = block_on(run(&EbsSnapshotPublicRestorable, &provider));
            let expected = if public.iter().any(|p| *p) { Verdict::Fail } else { Verdict::Pass };
            prop_assert_eq!(verdict, expected);
        }
    }
}
