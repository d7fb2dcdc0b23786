use async_trait::async_trait;

use crate::provider::Provider;
use crate::rules::{
    sweep, Annotate, Control, ControlMetadata, Judged, Scope, Service, Severity, Trail, Verdict,
};

/// Account.1: Security Contact
///
/// The account must carry a SECURITY alternate contact with every field set.
pub struct SecurityContactProvided;

#[async_trait]
impl Control for SecurityContactProvided {
    fn metadata(&self) -> ControlMetadata {
        ControlMetadata {
            id: "Account.1",
            command: "security-account-information-provided",
            title: "Security contact information should be provided for an AWS account",
            service: Service::Account,
            severity: Severity::Medium,
        }
    }

    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict {
        let scope = Scope::new(
            "security contacts",
            "Security contact information is properly configured",
            "Security contact information is missing or incomplete",
        );
        // A single account-wide record; a missing contact is a finding, an
        // API failure is not.
        let listing = provider
            .security_contact()
            .await
            .map(|contact| vec![contact]);

        sweep(trail, listing, &scope, |contact| async move {
            let mut judged = Judged::new();
            let Some(contact) = contact else {
                judged.fail(0, "No security contact information is configured");
                return judged;
            };

            judged.check(0, "Checking security contact");
            let fields = [
                ("name", &contact.name),
                ("email", &contact.email_address),
                ("phone number", &contact.phone_number),
                ("title", &contact.title),
            ];
            for (label, value) in fields {
                match value {
                    Some(value) => judged.pass(1, format!("Security contact {label}: {value}")),
                    None => judged.fail(1, format!("Security contact {label} is not configured")),
                }
            }
            judged
        })
        .await
    }
}
