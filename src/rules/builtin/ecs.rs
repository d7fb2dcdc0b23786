use async_trait::async_trait;

use crate::provider::{collect_pages, ContainerDefinition, Provider};
use crate::rules::{
    sweep, Annotate, Control, ControlMetadata, Judged, Scope, Service, Severity, Trail, Verdict,
};

const HOST_NETWORK_MODE: &str = "host";
const ROOT_USER: &str = "root";

/// ECS.1: Host Mode Users
///
/// Containers sharing the host network must either run privileged (an explicit
/// opt-in) or as a non-root user. Definitions in other network modes are out
/// of scope.
pub struct TaskDefinitionUserForHostMode;

/// A container in host mode that is neither privileged nor a non-root user.
fn runs_as_implicit_root(container: &ContainerDefinition) -> bool {
    let privileged = container.privileged.unwrap_or(false);
    let root = match container.user.as_deref() {
        None => true,
        Some(user) => user.is_empty() || user == ROOT_USER,
    };
    !privileged && root
}

#[async_trait]
impl Control for TaskDefinitionUserForHostMode {
    fn metadata(&self) -> ControlMetadata {
        ControlMetadata {
            id: "ECS.1",
            command: "ecs-task-definition-user-for-host-mode-check",
            title: "Amazon ECS task definitions should have secure networking modes and user definitions",
            service: Service::Ecs,
            severity: Severity::High,
        }
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            "active ECS task definitions",
            "All host-mode task definitions have secure user definitions",
            "Host-mode task definitions run containers as root without privileged mode",
        );
        let listing = collect_pages(|token| provider.active_task_definitions(token)).await;

        sweep(trail, listing, &scope, move |arn| async move {
            let mut judged = Judged::new();
            judged.check(0, format!("Checking task definition: {arn}"));

            let definition = match provider.task_definition(&arn).await {
                Ok(definition) => definition,
                Err(err) => {
                    judged.error(
                        1,
                        format!("Unable to describe task definition {arn}: {err}"),
                    );
                    return judged;
                }
            };

            let mode = definition.network_mode.as_deref().unwrap_or("bridge");
            if mode != HOST_NETWORK_MODE {
                judged.info(1, format!("Task definition uses network mode {mode}"));
                return judged;
            }

            judged.info(1, "Task definition uses host network mode");
            for container in &definition.containers {
                let name = &container.name;
                let user = container.user.as_deref().unwrap_or("unset");
                if runs_as_implicit_root(container) {
                    judged.fail(
                        2,
                        format!(
                            "Container {name} runs as root without privileged mode \
                             (user={user})"
                        ),
                    );
                } else {
                    let privileged = container.privileged.unwrap_or(false);
                    judged.pass(
                        2,
                        format!(
                            "Container {name} has a secure user definition \
                             (user={user}, privileged={privileged})"
                        ),
                    );
                }
            }
            judged
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TaskDefinition;
    use crate::testing::FixtureProvider;

    fn container(name: &str, privileged: Option<bool>, user: Option<&str>) -> ContainerDefinition {
        ContainerDefinition {
            name: name.into(),
            privileged,
            user: user.map(String::from),
        }
    }

    fn definition(
        arn: &str,
        mode: Option<&str>,
        containers: Vec<ContainerDefinition>,
    ) -> TaskDefinition {
        TaskDefinition {
            arn: arn.into(),
            network_mode: mode.map(String::from),
            containers,
        }
    }

    async fn run(provider: &FixtureProvider) -> (Verdict, Trail) {
        let mut trail = Trail::new("ECS.1");
        let verdict = TaskDefinitionUserForHostMode
            .evaluate(provider, &mut trail)
            .await;
        (verdict, trail)
    }

    #[test]
    fn implicit_root_detection() {
        assert!(runs_as_implicit_root(&container("a", None, None)));
        assert!(runs_as_implicit_root(&container("a", Some(false), Some("root"))));
        assert!(!runs_as_implicit_root(&container("a", Some(true), None)));
        assert!(!runs_as_implicit_root(&container("a", None, Some("1000"))));
    }

    #[tokio::test]
    async fn host_mode_root_container_fails() {
        let app_user = container("app", None, Some("app"));
        let provider = FixtureProvider {
            task_definitions: vec![
                definition("td-ok", Some("host"), vec![app_user]),
                definition("td-bad", Some("host"), vec![container("app", None, None)]),
            ],
            ..FixtureProvider::new()
        };
        let (verdict, trail) = run(&provider).await;
        assert_eq!(verdict, Verdict::Fail);
        assert!(trail.message().unwrap_or_default().contains("1 out of 2"));
    }

    #[tokio::test]
    async fn only_non_host_definitions_is_not_applicable() {
        let bridged = definition("td", Some("awsvpc"), vec![container("app", None, None)]);
        let provider = FixtureProvider {
            task_definitions: vec![bridged],
            ..FixtureProvider::new()
        };
        let (verdict, trail) = run(&provider).await;
        assert_eq!(verdict, Verdict::NotApplicable);
        assert_eq!(
            trail.message(),
            Some("No applicable active ECS task definitions found")
        );
    }

    #[tokio::test]
    async fn no_definitions_is_not_applicable() {
        assert_eq!(run(&FixtureProvider::new()).await.0, Verdict::NotApplicable);
    }

    #[tokio::test]
    async fn describe_failure_is_skipped() {
        let privileged = container("app", Some(true), None);
        let provider = FixtureProvider {
            task_definitions: vec![
                definition("td-a", Some("host"), vec![privileged]),
                definition("td-b", Some("host"), vec![container("app", None, None)]),
            ],
            ..FixtureProvider::new()
        }
        .fail_for("ecs:DescribeTaskDefinition", "td-b");
        assert_eq!(run(&provider).await.0, Verdict::Pass);
    }
}
