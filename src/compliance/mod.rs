//! Compliance catalog: the static `{Id, Description}` records shown before a
//! control runs. Display only; nothing here influences a verdict.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Description")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceCatalog {
    #[serde(rename = "Requirements", default)]
    pub requirements: Vec<Requirement>,
}

impl ComplianceCatalog {
    /// Read and parse the catalog. Called once per control invocation, so
    /// edits to the file take effect on the next run without a restart.
    pub fn load(path: &Path) -> Result<Self> {
        let catalog_err = |message: String| AuditError::Catalog {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path)
            .map_err(|e| catalog_err(format!("failed to read compliance file: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| catalog_err(format!("failed to parse compliance data: {e}")))
    }

    pub fn find(&self, id: &str) -> Option<&Requirement> {
        self.requirements.iter().find(|r| r.id == id)
    }

    /// Log the description banner for `id`. Returns the description, or
    /// `None` (after logging an error) when the id is not in the catalog.
    pub fn announce(&self, id: &str) -> Option<&str> {
        match self.find(id) {
            Some(requirement) => {
                let rule = "-".repeat(100);
                tracing::info!("{rule}");
                tracing::info!("[{}] {}", requirement.id, requirement.description);
                tracing::info!("{rule}");
                Some(requirement.description.as_str())
            }
            None => {
                tracing::error!(
                    control = id,
                    "Compliance requirement with ID {id} not found",
                );
                None
            }
        }
    }
}
