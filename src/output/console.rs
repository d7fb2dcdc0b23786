use crate::rules::{ControlMetadata, Verdict};
use crate::{AuditRun, ControlReport};

fn verdict_tag(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Pass => "[PASS]",
        Verdict::Fail => "[FAIL]",
        Verdict::NotApplicable => "[NA]  ",
    }
}

/// Render one report: the trail followed by the result line.
pub fn render_report(report: &ControlReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n  {} {}\n", report.id, report.title));
    if let Some(description) = &report.description {
        output.push_str(&format!("  {}\n", description));
    }
    output.push('\n');

    for line in &report.trail {
        output.push_str(&format!("  {}\n", line));
    }

    output.push_str(&format!(
        "\n  Result: {} ({})\n\n",
        report.verdict, report.message
    ));
    output
}

/// Render an `all` run as a one-line-per-control table with totals.
pub fn render_run(run: &AuditRun) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n  Audit {} in {} at {}\n\n",
        run.run_id,
        run.region,
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    for report in &run.reports {
        output.push_str(&format!(
            "  {} {:<14} {}\n",
            verdict_tag(report.verdict),
            report.id,
            report.message
        ));
    }

    let counts = run.counts();
    output.push_str(&format!(
        "\n  {} control(s): {} passed, {} failed, {} not applicable\n\n",
        run.reports.len(),
        counts.pass,
        counts.fail,
        counts.not_applicable
    ));
    output
}

pub fn render_controls(controls: &[ControlMetadata]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<14} {:<48} {:<10} TITLE\n",
        "ID", "COMMAND", "SEVERITY"
    ));
    output.push_str(&format!("{}\n", "-".repeat(100)));
    for meta in controls {
        output.push_str(&format!(
            "{:<14} {:<48} {:<10} {}\n",
            meta.id,
            meta.command,
            meta.severity.to_string(),
            meta.title
        ));
    }
    output
}
