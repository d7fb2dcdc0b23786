use aws_sdk_ecs::types::TaskDefinitionStatus;

use super::shape::{failed, listed, next_token, opt_text, present, text};
use crate::provider::{ContainerDefinition, Page, ProviderError, ProviderResult, TaskDefinition};

pub(super) async fn active_task_definitions(
    client: &aws_sdk_ecs::Client,
    token: Option<String>,
) -> ProviderResult<Page<String>> {
    let output = client
        .list_task_definitions()
        .status(TaskDefinitionStatus::Active)
        .set_next_token(token)
        .send()
        .await
        .map_err(failed("ecs:ListTaskDefinitions"))?;

    Ok(Page {
        items: listed(output.task_definition_arns()).to_vec(),
        next_token: next_token(output.next_token()),
    })
}

pub(super) async fn task_definition(
    client: &aws_sdk_ecs::Client,
    arn: &str,
) -> ProviderResult<TaskDefinition> {
    let output = client
        .describe_task_definition()
        .task_definition(arn)
        .send()
        .await
        .map_err(failed("ecs:DescribeTaskDefinition"))?;

    let definition = output.task_definition().ok_or_else(|| {
        ProviderError::new(
            "ecs:DescribeTaskDefinition",
            format!("response for {arn} carried no task definition"),
        )
    })?;

    let containers = listed(definition.container_definitions())
        .iter()
        .map(|c| ContainerDefinition {
            name: text(c.name()),
            privileged: c.privileged(),
            user: opt_text(c.user()),
        })
        .collect();

    Ok(TaskDefinition {
        arn: opt_text(definition.task_definition_arn()).unwrap_or_else(|| arn.to_string()),
        network_mode: present(definition.network_mode()).map(|m| m.as_str().to_string()),
        containers,
    })
}
