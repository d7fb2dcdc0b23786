//! Diagnostic trail: the ordered, indented lines a control emits while it
//! walks resources. Every line is logged as it is recorded and also kept so
//! reports can render it again.

use serde::Serialize;

use super::Verdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Check,
    Pass,
    Fail,
    Info,
    Error,
}

impl Mark {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Check => "[*]",
            Self::Pass => "[PASS]",
            Self::Fail => "[FAIL]",
            Self::Info => "[INFO]",
            Self::Error => "[ERROR]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrailLine {
    pub depth: usize,
    pub mark: Mark,
    pub text: String,
}

impl std::fmt::Display for TrailLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.depth == 0 {
            write!(f, "{} {}", self.mark.tag(), self.text)
        } else {
            let indent = "  ".repeat(self.depth);
            write!(f, "{indent}└─{} {}", self.mark.tag(), self.text)
        }
    }
}

/// Anything that accepts trail lines.
pub trait Annotate {
    fn record(&mut self, line: TrailLine);

    fn note(&mut self, depth: usize, mark: Mark, text: impl Into<String>) {
        self.record(TrailLine {
            depth,
            mark,
            text: text.into(),
        });
    }

    fn check(&mut self, depth: usize, text: impl Into<String>) {
        self.note(depth, Mark::Check, text);
    }

    fn pass(&mut self, depth: usize, text: impl Into<String>) {
        self.note(depth, Mark::Pass, text);
    }

    fn fail(&mut self, depth: usize, text: impl Into<String>) {
        self.note(depth, Mark::Fail, text);
    }

    fn info(&mut self, depth: usize, text: impl Into<String>) {
        self.note(depth, Mark::Info, text);
    }

    fn error(&mut self, depth: usize, text: impl Into<String>) {
        self.note(depth, Mark::Error, text);
    }
}

/// Trail of one control evaluation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trail {
    #[serde(skip)]
    control: &'static str,
    lines: Vec<TrailLine>,
    message: Option<String>,
}

impl Trail {
    pub fn new(control: &'static str) -> Self {
        Self {
            control,
            lines: Vec::new(),
            message: None,
        }
    }

    pub fn lines(&self) -> &[TrailLine] {
        &self.lines
    }

    /// Closing summary set by [`Trail::conclude`].
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Record the closing line and return `verdict` for convenient tail calls.
    pub fn conclude(&mut self, verdict: Verdict, message: impl Into<String>) -> Verdict {
        let message = message.into();
        let mark = match verdict {
            Verdict::Pass => Mark::Pass,
            Verdict::Fail => Mark::Fail,
            Verdict::NotApplicable => Mark::Check,
        };
        self.note(0, mark, message.clone());
        self.message = Some(message);
        verdict
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = TrailLine>) {
        for line in lines {
            self.record(line);
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}

impl Annotate for Trail {
    fn record(&mut self, line: TrailLine) {
        match line.mark {
            Mark::Error => tracing::warn!(control = self.control, "{line}"),
            _ => tracing::info!(control = self.control, "{line}"),
        }
        self.lines.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_lines_are_indented_with_branch() {
        let mut trail = Trail::new("CloudFront.5");
        trail.check(0, "Checking distribution: id-1");
        trail.fail(1, "Access logging not enabled for distribution id-1");
        trail.info(2, "Logging destination bucket: logs");

        assert_eq!(
            trail.render(),
            "[*] Checking distribution: id-1\n\
             \u{20}\u{20}└─[FAIL] Access logging not enabled for distribution id-1\n\
             \u{20}\u{20}\u{20}\u{20}└─[INFO] Logging destination bucket: logs\n"
        );
    }

    #[test]
    fn conclude_sets_message_and_returns_verdict() {
        let mut trail = Trail::new("S3.1");
        let verdict = trail.conclude(Verdict::NotApplicable, "No S3 buckets found");
        assert_eq!(verdict, Verdict::NotApplicable);
        assert_eq!(trail.message(), Some("No S3 buckets found"));
        assert_eq!(trail.lines().last().unwrap().mark, Mark::Check);
    }
}
