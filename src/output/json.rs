use serde::Serialize;

use crate::error::Result;
use crate::{AuditRun, VerdictCounts};

#[derive(Serialize)]
struct JsonRun<'a> {
    #[serde(flatten)]
    run: &'a AuditRun,
    summary: VerdictCounts,
}

/// Render any serializable value as pretty JSON.
pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(json)
}

/// Render an `all` run with its verdict counts.
pub fn render_run(run: &AuditRun) -> Result<String> {
    render(&JsonRun {
        run,
        summary: run.counts(),
    })
}
