use aws_sdk_account::types::AlternateContactType;

use super::shape::{failed, opt_text};
use crate::provider::{AlternateContact, ProviderResult};

pub(super) async fn security_contact(
    client: &aws_sdk_account::Client,
) -> ProviderResult<Option<AlternateContact>> {
    let result = client
        .get_alternate_contact()
        .alternate_contact_type(AlternateContactType::Security)
        .send()
        .await;

    let output = match result {
        Ok(output) => output,
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception()) =>
        {
            return Ok(None);
        }
        Err(err) => return Err(failed("account:GetAlternateContact")(err)),
    };

    Ok(output.alternate_contact().map(|c| AlternateContact {
        name: opt_text(c.name()),
        email_address: opt_text(c.email_address()),
        phone_number: opt_text(c.phone_number()),
        title: opt_text(c.title()),
    }))
}
