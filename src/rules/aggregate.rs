//! The list, describe, judge, aggregate loop shared by every control.

use std::future::Future;

use super::trail::{Annotate, Mark, Trail, TrailLine};
use super::Verdict;
use crate::provider::ProviderResult;

/// Verdict when the listing comes back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroPolicy {
    NotApplicable,
    Pass,
}

/// What a sweep is over and how to phrase its conclusion.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Plural resource noun, e.g. `CloudFront distributions`.
    pub noun: &'static str,
    pub zero: ZeroPolicy,
    pub pass_summary: &'static str,
    pub fail_summary: &'static str,
}

impl Scope {
    pub fn new(noun: &'static str, pass_summary: &'static str, fail_summary: &'static str) -> Self {
        Self {
            noun,
            zero: ZeroPolicy::NotApplicable,
            pass_summary,
            fail_summary,
        }
    }

    pub fn pass_when_empty(mut self) -> Self {
        self.zero = ZeroPolicy::Pass;
        self
    }
}

/// How one listed resource fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Compliant,
    NonCompliant,
    /// A describe call failed; nothing was judged.
    Skipped,
    /// The resource is outside the control's scope.
    Ignored,
}

/// Trail lines for one resource. The outcome follows from the marks
/// recorded: any FAIL wins, then any PASS, then any ERROR.
#[derive(Debug, Clone, Default)]
pub struct Judged {
    lines: Vec<TrailLine>,
    passed: usize,
    failed: usize,
    errors: usize,
}

impl Judged {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcome(&self) -> Outcome {
        if self.failed > 0 {
            Outcome::NonCompliant
        } else if self.passed > 0 {
            Outcome::Compliant
        } else if self.errors > 0 {
            Outcome::Skipped
        } else {
            Outcome::Ignored
        }
    }

    pub fn into_lines(self) -> Vec<TrailLine> {
        self.lines
    }
}

impl Annotate for Judged {
    fn record(&mut self, line: TrailLine) {
        match line.mark {
            Mark::Pass => self.passed += 1,
            Mark::Fail => self.failed += 1,
            Mark::Error => self.errors += 1,
            Mark::Check | Mark::Info => {}
        }
        self.lines.push(line);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub compliant: usize,
    pub non_compliant: usize,
    pub skipped: usize,
    pub ignored: usize,
}

impl Tally {
    fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Compliant => self.compliant += 1,
            Outcome::NonCompliant => self.non_compliant += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Ignored => self.ignored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.compliant + self.non_compliant + self.skipped + self.ignored
    }
}

/// Judge every listed resource in order and fold the outcomes into a verdict.
///
/// A failed listing is NA, an empty one follows [`Scope::zero`]. Any
/// non-compliant resource is FAIL. Skipped resources never flip the
/// verdict, but when nothing at all could be judged compliant the result
/// is NA rather than a vacuous PASS.
pub async fn sweep<T, F, Fut>(
    trail: &mut Trail,
    listing: ProviderResult<Vec<T>>,
    scope: &Scope,
    mut judge: F,
) -> Verdict
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Judged>,
{
    let items = match listing {
        Ok(items) => items,
        Err(err) => {
            trail.error(0, format!("Failed to list {}: {err}", scope.noun));
            return trail.conclude(
                Verdict::NotApplicable,
                format!("Failed to list {}", scope.noun),
            );
        }
    };

    if items.is_empty() {
        let verdict = match scope.zero {
            ZeroPolicy::NotApplicable => Verdict::NotApplicable,
            ZeroPolicy::Pass => Verdict::Pass,
        };
        return trail.conclude(verdict, format!("No {} found", scope.noun));
    }

    let mut tally = Tally::default();
    for item in items {
        let judged = judge(item).await;
        tally.add(judged.outcome());
        trail.extend(judged.into_lines());
    }

    conclude(trail, scope, tally)
}

fn conclude(trail: &mut Trail, scope: &Scope, tally: Tally) -> Verdict {
    if tally.non_compliant > 0 {
        return trail.conclude(
            Verdict::Fail,
            format!(
                "{} ({} out of {} {})",
                scope.fail_summary,
                tally.non_compliant,
                tally.total(),
                scope.noun
            ),
        );
    }
    if tally.compliant == 0 {
        let message = if tally.skipped > 0 {
            format!("No {} could be evaluated", scope.noun)
        } else {
            format!("No applicable {} found", scope.noun)
        };
        return trail.conclude(Verdict::NotApplicable, message);
    }
    trail.conclude(Verdict::Pass, scope.pass_summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use proptest::collection::vec;
    use proptest::option;
    use proptest::prelude::*;

    fn scope() -> Scope {
        Scope::new("widgets", "All widgets are fine", "Some widgets are broken")
    }

    fn block_on<F: Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    async fn judge_flag(ok: Option<bool>) -> Judged {
        let mut judged = Judged::new();
        judged.check(0, "Checking widget");
        match ok {
            Some(true) => judged.pass(1, "fine"),
            Some(false) => judged.fail(1, "broken"),
            None => judged.error(1, "describe failed"),
        }
        judged
    }

    #[tokio::test]
    async fn list_error_is_not_applicable() {
        let mut trail = Trail::new("T.1");
        let listing: ProviderResult<Vec<Option<bool>>> =
            Err(ProviderError::new("svc:List", "AccessDenied"));
        let mut judged_any = false;
        let verdict = sweep(&mut trail, listing, &scope(), |ok| {
            judged_any = true;
            judge_flag(ok)
        })
        .await;

        assert_eq!(verdict, Verdict::NotApplicable);
        assert!(!judged_any);
        assert_eq!(trail.lines()[0].mark, Mark::Error);
        assert_eq!(trail.message(), Some("Failed to list widgets"));
    }

    #[tokio::test]
    async fn empty_listing_follows_zero_policy() {
        let mut trail = Trail::new("T.1");
        let verdict = sweep(&mut trail, Ok(Vec::new()), &scope(), judge_flag).await;
        assert_eq!(verdict, Verdict::NotApplicable);

        let mut trail = Trail::new("T.1");
        let verdict = sweep(
            &mut trail,
            Ok(Vec::new()),
            &scope().pass_when_empty(),
            judge_flag,
        )
        .await;
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(trail.message(), Some("No widgets found"));
    }

    #[tokio::test]
    async fn skipped_items_do_not_fail_the_control() {
        let mut trail = Trail::new("T.1");
        let verdict = sweep(&mut trail, Ok(vec![Some(true), None]), &scope(), judge_flag).await;
        assert_eq!(verdict, Verdict::Pass);

        let mut trail = Trail::new("T.1");
        let verdict = sweep(&mut trail, Ok(vec![None, None]), &scope(), judge_flag).await;
        assert_eq!(verdict, Verdict::NotApplicable);
        assert_eq!(trail.message(), Some("No widgets could be evaluated"));
    }

    #[tokio::test]
    async fn fail_message_counts_offenders() {
        let mut trail = Trail::new("T.1");
        let verdict = sweep(
            &mut trail,
            Ok(vec![Some(false), Some(true), Some(false)]),
            &scope(),
            judge_flag,
        )
        .await;
        assert_eq!(verdict, Verdict::Fail);
        assert_eq!(
            trail.message(),
            Some("Some widgets are broken (2 out of 3 widgets)")
        );
    }

    #[test]
    fn ignored_only_is_not_applicable() {
        let judged = Judged::new();
        assert_eq!(judged.outcome(), Outcome::Ignored);

        let mut trail = Trail::new("T.1");
        let verdict = block_on(sweep(&mut trail, Ok(vec![1, 2]), &scope(), |_| async {
            let mut judged = Judged::new();
            judged.info(0, "out of scope");
            judged
        }));
        assert_eq!(verdict, Verdict::NotApplicable);
        assert_eq!(trail.message(), Some("No applicable widgets found"));
    }

    proptest! {
        #[test]
        fn verdict_is_fail_iff_any_item_fails(flags in vec(any::<bool>(), 1..20)) {
            let mut trail = Trail::new("T.1");
            let listing = Ok(flags.iter().copied().map(Some).collect::<Vec<_>>());
            let verdict = block_on(sweep(&mut trail, listing, &scope(), judge_flag));

            let expected = if flags.iter().all(|ok| *ok) { Verdict::Pass } else { Verdict::Fail };
            prop_assert_eq!(verdict, expected);
        }

        #[test]
        fn sweep_is_idempotent(flags in vec(option::of(any::<bool>()), 0..12)) {
            let run = || {
                let mut trail = Trail::new("T.1");
                let verdict = block_on(sweep(&mut trail, Ok(flags.clone()), &scope(), judge_flag));
                (verdict, trail.render())
            };
            prop_assert_eq!(run(), run());
        }
    }
}
