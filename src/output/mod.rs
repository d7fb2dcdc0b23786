pub mod console;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::ControlMetadata;
use crate::{AuditRun, ControlReport};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" | "table" => Some(Self::Console),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Render a single control report.
pub fn render_report(report: &ControlReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render_report(report)),
        OutputFormat::Json => json::render(report),
    }
}

/// Render the results of an `all` run.
pub fn render_run(run: &AuditRun, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render_run(run)),
        OutputFormat::Json => json::render_run(run),
    }
}

/// Render the control listing.
pub fn render_controls(controls: &[ControlMetadata], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render_controls(controls)),
        OutputFormat::Json => json::render(controls),
    }
}
