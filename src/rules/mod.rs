pub mod aggregate;
pub mod builtin;
pub mod metadata;
pub mod trail;

use async_trait::async_trait;

use crate::config::ControlSettings;
use crate::provider::Provider;

pub use aggregate::{sweep, Judged, Outcome, Scope};
pub use metadata::{ControlMetadata, Service, Severity, Verdict};
pub use trail::{Annotate, Mark, Trail, TrailLine};

/// A control audits one kind of resource and reduces it to a verdict.
#[async_trait]
pub trait Control: Send + Sync {
    /// Metadata about this control (id, command, title, severity).
    fn metadata(&self) -> ControlMetadata;

    /// Evaluate the control, recording diagnostics on `trail`. Provider
    /// failures are reflected in the verdict and the trail, never returned.
    async fn evaluate(&self, provider: &dyn Provider, trail: &mut Trail) -> Verdict;
}

/// The fixed catalog of controls, built once at startup and shared by the
/// CLI and the HTTP router.
pub struct ControlRegistry {
    controls: Vec<Box<dyn Control>>,
}

impl ControlRegistry {
    /// Create a registry with every built-in control.
    pub fn new(settings: &ControlSettings) -> Self {
        Self {
            controls: builtin::all_controls(settings),
        }
    }

    /// Look up a control by id (`S3.1`, any case), command, or alias.
    pub fn find(&self, name: &str) -> Option<&dyn Control> {
        self.controls
            .iter()
            .find(|c| {
                let meta = c.metadata();
                meta.id.eq_ignore_ascii_case(name) || meta.command == name
            })
            .map(|c| c.as_ref())
    }

    pub fn get(&self, index: usize) -> Option<&dyn Control> {
        self.controls.get(index).map(|c| c.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Control> {
        self.controls.iter().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// List metadata for all registered controls.
    pub fn list(&self) -> Vec<ControlMetadata> {
        self.controls.iter().map(|c| c.metadata()).collect()
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new(&ControlSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_commands_and_routes_are_unique() {
        let registry = ControlRegistry::default();
        let list = registry.list();
        assert_eq!(list.len(), 24);

        let ids: HashSet<_> = list.iter().map(|m| m.id).collect();
        let commands: HashSet<_> = list.iter().map(|m| m.command).collect();
        let routes: HashSet<_> = list.iter().map(|m| m.route()).collect();
        assert_eq!(ids.len(), list.len());
        assert_eq!(commands.len(), list.len());
        assert_eq!(routes.len(), list.len());
    }

    #[test]
    fn find_accepts_id_alias_and_command() {
        let registry = ControlRegistry::default();
        for name in ["S3.1", "s3.1", "s3-account-level-public-access-blocks-periodic"] {
            assert_eq!(registry.find(name).map(|c| c.metadata().id), Some("S3.1"));
        }
        assert!(registry.find("s3.99").is_none());
    }
}
