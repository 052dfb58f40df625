//! Per-approval-type policy evaluation.
//!
//! Each `ApprovalType` variant evaluates the same question over the same
//! inputs: given who has approved and rejected so far, is the workflow
//! terminal, and if not, who decides next? Evaluation runs after the
//! acting approver's approval has been appended to `approved_by` but
//! before any advancement, and never sees rejections - a single rejection
//! terminates the workflow in the engine before policies are consulted.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::workflow::types::{ApprovalSettings, ApprovalType, ApproverSpec};

/// Percentage required when a percentage-style rule does not configure one.
pub const DEFAULT_PERCENTAGE_REQUIRED: Decimal = Decimal::ONE_HUNDRED;

/// Percentage required for hybrid rules without an explicit setting.
pub const HYBRID_DEFAULT_PERCENTAGE: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// Inputs to one round of policy evaluation.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// The canonical approver list for this evaluation round, sorted by step.
    pub approvers: &'a [ApproverSpec],
    /// The governing rule's settings.
    pub settings: &'a ApprovalSettings,
    /// Users who have approved so far (including the acting approver).
    pub approved_by: &'a [Uuid],
    /// Users who have rejected so far.
    pub rejected_by: &'a [Uuid],
    /// The 1-based step of the decision being processed.
    pub approval_step: u32,
    /// Approver-list length snapshot taken at workflow start.
    pub total_approvers: u32,
}

impl PolicyContext<'_> {
    fn is_decided(&self, user_id: Uuid) -> bool {
        self.approved_by.contains(&user_id) || self.rejected_by.contains(&user_id)
    }

    /// First approver in list order who has not yet decided.
    fn next_undecided(&self) -> Option<&ApproverSpec> {
        self.approvers.iter().find(|a| !self.is_decided(a.user_id))
    }

    /// Share of approvals against the snapshot taken at workflow start.
    fn approval_percentage(&self) -> Decimal {
        if self.total_approvers == 0 {
            return DEFAULT_PERCENTAGE_REQUIRED;
        }
        Decimal::from(self.approved_by.len()) * Decimal::ONE_HUNDRED
            / Decimal::from(self.total_approvers)
    }
}

/// Result of one round of policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// The workflow is terminally approved.
    Approved,
    /// The workflow is terminally rejected (e.g., approvers exhausted
    /// below the required threshold).
    Rejected {
        /// Reason recorded on the expense.
        reason: String,
    },
    /// The workflow continues with another approver.
    Advance {
        /// The approver whose decision is awaited next.
        next_approver: Uuid,
        /// The step counter after advancement.
        next_step: u32,
    },
}

const INSUFFICIENT_APPROVALS: &str = "Insufficient approvals";

impl ApprovalType {
    /// Evaluates the policy for one approval round.
    #[must_use]
    pub fn evaluate(self, ctx: &PolicyContext<'_>) -> PolicyOutcome {
        match self {
            Self::Sequential => evaluate_sequential(ctx),
            Self::Parallel => evaluate_parallel(ctx),
            Self::Percentage => evaluate_percentage(ctx, DEFAULT_PERCENTAGE_REQUIRED),
            Self::SpecificApprover => evaluate_specific_approver(ctx),
            Self::Hybrid => evaluate_hybrid(ctx),
        }
    }
}

/// Sequential: terminal once the step counter has covered every approver;
/// otherwise hand off to the approver at the next 1-based step.
fn evaluate_sequential(ctx: &PolicyContext<'_>) -> PolicyOutcome {
    let total = u32::try_from(ctx.approvers.len()).unwrap_or(u32::MAX);
    if ctx.approval_step >= total {
        return PolicyOutcome::Approved;
    }
    let next_step = ctx.approval_step + 1;
    // 1-based step maps to the 0-based approver list.
    let next = &ctx.approvers[(next_step - 1) as usize];
    PolicyOutcome::Advance {
        next_approver: next.user_id,
        next_step,
    }
}

/// Parallel: terminal-approved once every required approver has approved.
/// Exhausting the list below that bar rejects the expense.
fn evaluate_parallel(ctx: &PolicyContext<'_>) -> PolicyOutcome {
    let required: Vec<&ApproverSpec> = ctx.approvers.iter().filter(|a| a.is_required).collect();
    let approved_required = required
        .iter()
        .filter(|a| ctx.approved_by.contains(&a.user_id))
        .count();

    if approved_required >= required.len() {
        return PolicyOutcome::Approved;
    }

    match ctx.next_undecided() {
        Some(next) => PolicyOutcome::Advance {
            next_approver: next.user_id,
            next_step: ctx.approval_step,
        },
        None => PolicyOutcome::Rejected {
            reason: INSUFFICIENT_APPROVALS.to_string(),
        },
    }
}

/// Percentage: terminal-approved once the approval share reaches the
/// configured threshold; on exhaustion the final share decides.
fn evaluate_percentage(ctx: &PolicyContext<'_>, default_required: Decimal) -> PolicyOutcome {
    let required = ctx.settings.percentage_required.unwrap_or(default_required);
    if ctx.approval_percentage() >= required {
        return PolicyOutcome::Approved;
    }

    match ctx.next_undecided() {
        Some(next) => PolicyOutcome::Advance {
            next_approver: next.user_id,
            next_step: ctx.approval_step,
        },
        None => PolicyOutcome::Rejected {
            reason: INSUFFICIENT_APPROVALS.to_string(),
        },
    }
}

/// Specific approver: the designated approver's approval is sufficient on
/// its own; otherwise behaves like percentage with a 100% default.
fn evaluate_specific_approver(ctx: &PolicyContext<'_>) -> PolicyOutcome {
    if let Some(designated) = ctx.settings.specific_approver
        && ctx.approved_by.contains(&designated)
    {
        return PolicyOutcome::Approved;
    }
    evaluate_percentage(ctx, DEFAULT_PERCENTAGE_REQUIRED)
}

/// Hybrid: percentage (60% default) OR specific approver, whichever is
/// satisfied first.
fn evaluate_hybrid(ctx: &PolicyContext<'_>) -> PolicyOutcome {
    if let Some(designated) = ctx.settings.specific_approver
        && ctx.approved_by.contains(&designated)
    {
        return PolicyOutcome::Approved;
    }
    evaluate_percentage(ctx, HYBRID_DEFAULT_PERCENTAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn approvers(n: u32) -> Vec<ApproverSpec> {
        (1..=n)
            .map(|step| ApproverSpec::required(Uuid::new_v4(), step))
            .collect()
    }

    fn ctx<'a>(
        approvers: &'a [ApproverSpec],
        settings: &'a ApprovalSettings,
        approved_by: &'a [Uuid],
        rejected_by: &'a [Uuid],
        step: u32,
    ) -> PolicyContext<'a> {
        PolicyContext {
            approvers,
            settings,
            approved_by,
            rejected_by,
            approval_step: step,
            total_approvers: u32::try_from(approvers.len()).unwrap(),
        }
    }

    #[test]
    fn test_default_percentage_constants() {
        assert_eq!(DEFAULT_PERCENTAGE_REQUIRED, dec!(100));
        assert_eq!(HYBRID_DEFAULT_PERCENTAGE, dec!(60));
    }

    #[test]
    fn test_sequential_advances_in_step_order() {
        let list = approvers(3);
        let settings = ApprovalSettings::default();
        let approved = vec![list[0].user_id];

        let outcome = ApprovalType::Sequential.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert_eq!(
            outcome,
            PolicyOutcome::Advance {
                next_approver: list[1].user_id,
                next_step: 2
            }
        );
    }

    #[test]
    fn test_sequential_terminal_at_last_step() {
        let list = approvers(2);
        let settings = ApprovalSettings::default();
        let approved: Vec<Uuid> = list.iter().map(|a| a.user_id).collect();

        let outcome = ApprovalType::Sequential.evaluate(&ctx(&list, &settings, &approved, &[], 2));
        assert_eq!(outcome, PolicyOutcome::Approved);
    }

    #[test]
    fn test_parallel_requires_all_required_approvers() {
        let list = approvers(3);
        let settings = ApprovalSettings::default();
        let approved = vec![list[0].user_id];

        let outcome = ApprovalType::Parallel.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert_eq!(
            outcome,
            PolicyOutcome::Advance {
                next_approver: list[1].user_id,
                next_step: 1
            }
        );

        let all: Vec<Uuid> = list.iter().map(|a| a.user_id).collect();
        let outcome = ApprovalType::Parallel.evaluate(&ctx(&list, &settings, &all, &[], 1));
        assert_eq!(outcome, PolicyOutcome::Approved);
    }

    #[test]
    fn test_parallel_optional_approvers_do_not_block() {
        let mut list = approvers(3);
        list[2].is_required = false;
        let settings = ApprovalSettings::default();
        let approved = vec![list[0].user_id, list[1].user_id];

        let outcome = ApprovalType::Parallel.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert_eq!(outcome, PolicyOutcome::Approved);
    }

    #[test]
    fn test_parallel_skips_decided_approvers_when_advancing() {
        let list = approvers(3);
        let settings = ApprovalSettings::default();
        let approved = vec![list[1].user_id];
        let rejected: Vec<Uuid> = vec![];

        // First undecided in list order is approver 0, not approver 2.
        let outcome =
            ApprovalType::Parallel.evaluate(&ctx(&list, &settings, &approved, &rejected, 1));
        assert_eq!(
            outcome,
            PolicyOutcome::Advance {
                next_approver: list[0].user_id,
                next_step: 1
            }
        );
    }

    #[test]
    fn test_percentage_meets_threshold() {
        // total=4, required=75%: 3 approvals hit exactly 75%.
        let list = approvers(4);
        let settings = ApprovalSettings {
            percentage_required: Some(dec!(75)),
            ..Default::default()
        };
        let approved: Vec<Uuid> = list.iter().take(3).map(|a| a.user_id).collect();

        let outcome = ApprovalType::Percentage.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert_eq!(outcome, PolicyOutcome::Approved);
    }

    #[test]
    fn test_percentage_below_threshold_advances() {
        let list = approvers(4);
        let settings = ApprovalSettings {
            percentage_required: Some(dec!(75)),
            ..Default::default()
        };
        let approved: Vec<Uuid> = list.iter().take(2).map(|a| a.user_id).collect();

        let outcome = ApprovalType::Percentage.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert!(matches!(outcome, PolicyOutcome::Advance { .. }));
    }

    #[test]
    fn test_percentage_exhaustion_below_threshold_rejects() {
        let list = approvers(4);
        let settings = ApprovalSettings {
            percentage_required: Some(dec!(75)),
            ..Default::default()
        };
        let approved: Vec<Uuid> = list.iter().take(2).map(|a| a.user_id).collect();
        let rejected: Vec<Uuid> = list.iter().skip(2).map(|a| a.user_id).collect();

        let outcome =
            ApprovalType::Percentage.evaluate(&ctx(&list, &settings, &approved, &rejected, 1));
        assert_eq!(
            outcome,
            PolicyOutcome::Rejected {
                reason: "Insufficient approvals".to_string()
            }
        );
    }

    #[test]
    fn test_percentage_exhaustion_at_threshold_approves() {
        // total=4, required=50%: everyone decided, 2 approvals exactly meet it.
        let list = approvers(4);
        let settings = ApprovalSettings {
            percentage_required: Some(dec!(50)),
            ..Default::default()
        };
        let approved: Vec<Uuid> = list.iter().take(2).map(|a| a.user_id).collect();
        let rejected: Vec<Uuid> = list.iter().skip(2).map(|a| a.user_id).collect();

        let outcome =
            ApprovalType::Percentage.evaluate(&ctx(&list, &settings, &approved, &rejected, 1));
        assert_eq!(outcome, PolicyOutcome::Approved);
    }

    #[test]
    fn test_specific_approver_short_circuits() {
        let list = approvers(5);
        let designated = list[3].user_id;
        let settings = ApprovalSettings {
            specific_approver: Some(designated),
            ..Default::default()
        };
        let approved = vec![designated];

        let outcome =
            ApprovalType::SpecificApprover.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert_eq!(outcome, PolicyOutcome::Approved);
    }

    #[test]
    fn test_specific_approver_other_approvals_advance() {
        let list = approvers(5);
        let settings = ApprovalSettings {
            specific_approver: Some(list[3].user_id),
            ..Default::default()
        };
        let approved = vec![list[0].user_id];

        let outcome =
            ApprovalType::SpecificApprover.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert!(matches!(outcome, PolicyOutcome::Advance { .. }));
    }

    #[test]
    fn test_hybrid_percentage_path() {
        // total=5, default 60%: the 3rd approval crosses the bar.
        let list = approvers(5);
        let settings = ApprovalSettings {
            specific_approver: Some(list[4].user_id),
            ..Default::default()
        };
        let approved: Vec<Uuid> = list.iter().take(3).map(|a| a.user_id).collect();

        let outcome = ApprovalType::Hybrid.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert_eq!(outcome, PolicyOutcome::Approved);
    }

    #[test]
    fn test_hybrid_specific_approver_path() {
        let list = approvers(5);
        let designated = list[4].user_id;
        let settings = ApprovalSettings {
            specific_approver: Some(designated),
            ..Default::default()
        };
        let approved = vec![designated];

        let outcome = ApprovalType::Hybrid.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert_eq!(outcome, PolicyOutcome::Approved);
    }

    #[test]
    fn test_hybrid_neither_condition_advances() {
        let list = approvers(5);
        let settings = ApprovalSettings {
            specific_approver: Some(list[4].user_id),
            ..Default::default()
        };
        let approved = vec![list[0].user_id];

        let outcome = ApprovalType::Hybrid.evaluate(&ctx(&list, &settings, &approved, &[], 1));
        assert!(matches!(outcome, PolicyOutcome::Advance { .. }));
    }
}
