//! The approval workflow state machine.
//!
//! `WorkflowEngine` is a stateless service: every method takes the current
//! workflow state and returns the next one, leaving persistence to the
//! repository layer. The governing rule is re-resolved by the caller on
//! every decision, so rule changes mid-workflow take effect on the next
//! evaluation round.

use chrono::Utc;
use uuid::Uuid;

use crate::workflow::error::WorkflowError;
use crate::workflow::policy::{PolicyContext, PolicyOutcome};
use crate::workflow::types::{
    ApprovalAction, ApprovalRuleDef, ApprovalSettings, ApprovalType, ApproverSpec, ExpenseStatus,
    HistoryEntry, WorkflowState,
};

/// Reason recorded when a rejection arrives without a comment.
const NO_REASON_PROVIDED: &str = "No reason provided";

/// The approver list and policy governing one evaluation round.
///
/// Built from the resolved rule when one matches, otherwise from the
/// manager-default fallback.
#[derive(Debug, Clone)]
pub struct EffectivePolicy {
    /// Approvers sorted ascending by step.
    pub approvers: Vec<ApproverSpec>,
    /// The policy to dispatch on.
    pub approval_type: ApprovalType,
    /// Policy settings.
    pub settings: ApprovalSettings,
}

impl EffectivePolicy {
    /// Resolves the effective policy for an expense.
    ///
    /// With a matching rule, its approver list (sorted ascending by step)
    /// and approval type govern. Without one, the submitting employee's
    /// manager becomes the single required approver when flagged as an
    /// approver; otherwise the approver list is empty and initialization
    /// auto-approves.
    #[must_use]
    pub fn resolve(rule: Option<&ApprovalRuleDef>, manager_approver: Option<Uuid>) -> Self {
        if let Some(rule) = rule {
            let mut approvers = rule.approvers.clone();
            approvers.sort_by_key(|a| a.step);
            return Self {
                approvers,
                approval_type: rule.approval_type,
                settings: rule.settings,
            };
        }

        let approvers = manager_approver
            .map(|manager| vec![ApproverSpec::required(manager, 1)])
            .unwrap_or_default();
        Self {
            approvers,
            approval_type: ApprovalType::Sequential,
            settings: ApprovalSettings::default(),
        }
    }
}

/// Stateless engine for the expense approval workflow.
pub struct WorkflowEngine;

impl WorkflowEngine {
    /// Computes the initial workflow state for a new or edited expense.
    ///
    /// Resets all counters and history. With a non-empty approver list the
    /// first approver becomes current at step 1; with an empty list the
    /// expense is auto-approved.
    #[must_use]
    pub fn initialize(policy: &EffectivePolicy) -> WorkflowState {
        let total = u32::try_from(policy.approvers.len()).unwrap_or(u32::MAX);

        match policy.approvers.first() {
            Some(first) => WorkflowState {
                status: ExpenseStatus::Pending,
                current_approver: Some(first.user_id),
                approval_step: 1,
                total_approvers: total,
                approved_by: Vec::new(),
                rejected_by: Vec::new(),
                history: Vec::new(),
                final_approval_date: None,
                rejection_reason: None,
            },
            None => WorkflowState {
                status: ExpenseStatus::Approved,
                current_approver: None,
                approval_step: 0,
                total_approvers: 0,
                approved_by: Vec::new(),
                rejected_by: Vec::new(),
                history: Vec::new(),
                final_approval_date: Some(Utc::now()),
                rejection_reason: None,
            },
        }
    }

    /// Records a decision from the expense's current approver.
    ///
    /// The history entry is appended first. A rejection is final and
    /// immediate regardless of approval type. An approval is appended to
    /// `approved_by` and then dispatched through the policy, which either
    /// terminates the workflow or advances to the next approver.
    ///
    /// # Errors
    ///
    /// * `ExpenseNotPending` when the expense has already reached a
    ///   terminal state.
    /// * `NotCurrentApprover` when the acting user is not the one whose
    ///   decision is awaited.
    pub fn record_decision(
        state: &WorkflowState,
        policy: &EffectivePolicy,
        approver: Uuid,
        action: ApprovalAction,
        comment: Option<String>,
    ) -> Result<WorkflowState, WorkflowError> {
        if state.status != ExpenseStatus::Pending {
            return Err(WorkflowError::ExpenseNotPending {
                status: state.status,
            });
        }
        if state.current_approver != Some(approver) {
            return Err(WorkflowError::NotCurrentApprover { user_id: approver });
        }

        let now = Utc::now();
        let mut next = state.clone();
        next.history.push(HistoryEntry {
            approver,
            action,
            comment: comment.clone(),
            step: state.approval_step,
            timestamp: now,
            is_override: false,
        });

        match action {
            ApprovalAction::Rejected => {
                next.rejected_by.push(approver);
                next.status = ExpenseStatus::Rejected;
                next.rejection_reason =
                    Some(comment.unwrap_or_else(|| NO_REASON_PROVIDED.to_string()));
                next.final_approval_date = Some(now);
                next.current_approver = None;
            }
            ApprovalAction::Approved => {
                next.approved_by.push(approver);

                let ctx = PolicyContext {
                    approvers: &policy.approvers,
                    settings: &policy.settings,
                    approved_by: &next.approved_by,
                    rejected_by: &next.rejected_by,
                    approval_step: next.approval_step,
                    total_approvers: next.total_approvers,
                };

                match policy.approval_type.evaluate(&ctx) {
                    PolicyOutcome::Approved => {
                        next.status = ExpenseStatus::Approved;
                        next.final_approval_date = Some(now);
                        next.current_approver = None;
                    }
                    PolicyOutcome::Rejected { reason } => {
                        next.status = ExpenseStatus::Rejected;
                        next.rejection_reason = Some(reason);
                        next.final_approval_date = Some(now);
                        next.current_approver = None;
                    }
                    PolicyOutcome::Advance {
                        next_approver,
                        next_step,
                    } => {
                        next.approval_step = next_step;
                        next.current_approver = Some(next_approver);
                    }
                }
            }
        }

        Ok(next)
    }

    /// Forces a terminal state, bypassing all policy evaluation.
    ///
    /// Authorization (administrator capability) is the caller's
    /// responsibility. Appends a history entry tagged as an override at
    /// `approval_step + 1` and unconditionally terminates the workflow.
    #[must_use]
    pub fn override_decision(
        state: &WorkflowState,
        acting_user: Uuid,
        action: ApprovalAction,
        comment: Option<String>,
    ) -> WorkflowState {
        let now = Utc::now();
        let mut next = state.clone();
        next.history.push(HistoryEntry {
            approver: acting_user,
            action,
            comment: comment.clone(),
            step: state.approval_step + 1,
            timestamp: now,
            is_override: true,
        });

        next.status = match action {
            ApprovalAction::Approved => ExpenseStatus::Approved,
            ApprovalAction::Rejected => {
                next.rejection_reason =
                    Some(comment.unwrap_or_else(|| NO_REASON_PROVIDED.to_string()));
                ExpenseStatus::Rejected
            }
        };
        next.final_approval_date = Some(now);
        next.current_approver = None;

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sequential_rule(approvers: Vec<ApproverSpec>) -> ApprovalRuleDef {
        ApprovalRuleDef {
            id: Uuid::new_v4(),
            amount_threshold: Some(Decimal::ZERO),
            priority: 1,
            is_active: true,
            approvers,
            approval_type: ApprovalType::Sequential,
            settings: ApprovalSettings::default(),
        }
    }

    fn policy_of(rule: &ApprovalRuleDef) -> EffectivePolicy {
        EffectivePolicy::resolve(Some(rule), None)
    }

    #[test]
    fn test_resolve_sorts_approvers_by_step() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rule = sequential_rule(vec![
            ApproverSpec::required(b, 2),
            ApproverSpec::required(a, 1),
        ]);
        let policy = policy_of(&rule);
        assert_eq!(policy.approvers[0].user_id, a);
        assert_eq!(policy.approvers[1].user_id, b);
    }

    #[test]
    fn test_resolve_manager_fallback() {
        let manager = Uuid::new_v4();
        let policy = EffectivePolicy::resolve(None, Some(manager));
        assert_eq!(policy.approvers.len(), 1);
        assert_eq!(policy.approvers[0].user_id, manager);
        assert_eq!(policy.approvers[0].step, 1);
        assert!(policy.approvers[0].is_required);
        assert_eq!(policy.approval_type, ApprovalType::Sequential);
    }

    #[test]
    fn test_resolve_no_rule_no_manager_is_empty() {
        let policy = EffectivePolicy::resolve(None, None);
        assert!(policy.approvers.is_empty());
    }

    #[test]
    fn test_initialize_sets_first_approver() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rule = sequential_rule(vec![
            ApproverSpec::required(a, 1),
            ApproverSpec::required(b, 2),
        ]);
        let state = WorkflowEngine::initialize(&policy_of(&rule));

        assert_eq!(state.status, ExpenseStatus::Pending);
        assert_eq!(state.current_approver, Some(a));
        assert_eq!(state.approval_step, 1);
        assert_eq!(state.total_approvers, 2);
        assert!(state.final_approval_date.is_none());
    }

    #[test]
    fn test_initialize_empty_list_auto_approves() {
        let state = WorkflowEngine::initialize(&EffectivePolicy::resolve(None, None));
        assert_eq!(state.status, ExpenseStatus::Approved);
        assert_eq!(state.current_approver, None);
        assert_eq!(state.total_approvers, 0);
        assert!(state.final_approval_date.is_some());
    }

    #[test]
    fn test_sequential_full_approval_chain() {
        // amount 500 USD, rule {threshold 0, sequential, A step1, B step2}:
        // A approves then B approves -> approved, history steps 1 and 2.
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rule = sequential_rule(vec![
            ApproverSpec::required(a, 1),
            ApproverSpec::required(b, 2),
        ]);
        let policy = policy_of(&rule);
        let state = WorkflowEngine::initialize(&policy);

        let state =
            WorkflowEngine::record_decision(&state, &policy, a, ApprovalAction::Approved, None)
                .unwrap();
        assert_eq!(state.status, ExpenseStatus::Pending);
        assert_eq!(state.current_approver, Some(b));
        assert_eq!(state.approval_step, 2);

        let state =
            WorkflowEngine::record_decision(&state, &policy, b, ApprovalAction::Approved, None)
                .unwrap();
        assert_eq!(state.status, ExpenseStatus::Approved);
        assert_eq!(state.current_approver, None);
        assert!(state.final_approval_date.is_some());
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[0].step, 1);
        assert_eq!(state.history[1].step, 2);
    }

    #[test]
    fn test_rejection_is_final_regardless_of_policy() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rule = sequential_rule(vec![
            ApproverSpec::required(a, 1),
            ApproverSpec::required(b, 2),
        ]);
        rule.approval_type = ApprovalType::Percentage;
        rule.settings.percentage_required = Some(dec!(50));
        let policy = policy_of(&rule);
        let state = WorkflowEngine::initialize(&policy);

        let state = WorkflowEngine::record_decision(
            &state,
            &policy,
            a,
            ApprovalAction::Rejected,
            Some("Over budget".to_string()),
        )
        .unwrap();

        assert_eq!(state.status, ExpenseStatus::Rejected);
        assert_eq!(state.rejection_reason.as_deref(), Some("Over budget"));
        assert_eq!(state.rejected_by, vec![a]);
        assert!(state.approved_by.is_empty());
        assert_eq!(state.history.len(), 1);
        assert!(state.final_approval_date.is_some());
    }

    #[test]
    fn test_rejection_without_comment_gets_default_reason() {
        let a = Uuid::new_v4();
        let rule = sequential_rule(vec![ApproverSpec::required(a, 1)]);
        let policy = policy_of(&rule);
        let state = WorkflowEngine::initialize(&policy);

        let state =
            WorkflowEngine::record_decision(&state, &policy, a, ApprovalAction::Rejected, None)
                .unwrap();
        assert_eq!(
            state.rejection_reason.as_deref(),
            Some("No reason provided")
        );
    }

    #[test]
    fn test_decision_from_wrong_approver_fails() {
        let a = Uuid::new_v4();
        let rule = sequential_rule(vec![ApproverSpec::required(a, 1)]);
        let policy = policy_of(&rule);
        let state = WorkflowEngine::initialize(&policy);

        let imposter = Uuid::new_v4();
        let result = WorkflowEngine::record_decision(
            &state,
            &policy,
            imposter,
            ApprovalAction::Approved,
            None,
        );
        assert!(matches!(
            result,
            Err(WorkflowError::NotCurrentApprover { user_id }) if user_id == imposter
        ));
    }

    #[test]
    fn test_decision_on_terminal_expense_fails() {
        let a = Uuid::new_v4();
        let rule = sequential_rule(vec![ApproverSpec::required(a, 1)]);
        let policy = policy_of(&rule);
        let state = WorkflowEngine::initialize(&policy);

        let state =
            WorkflowEngine::record_decision(&state, &policy, a, ApprovalAction::Approved, None)
                .unwrap();
        assert_eq!(state.status, ExpenseStatus::Approved);

        // Resubmitting the same decision must fail, never double-count.
        let result =
            WorkflowEngine::record_decision(&state, &policy, a, ApprovalAction::Approved, None);
        assert!(matches!(
            result,
            Err(WorkflowError::ExpenseNotPending { .. })
        ));
        assert_eq!(state.approved_by, vec![a]);
    }

    #[test]
    fn test_percentage_workflow_approves_at_threshold() {
        // total=4, required=75%: the third approval terminates the workflow.
        let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut rule = sequential_rule(
            users
                .iter()
                .enumerate()
                .map(|(i, u)| ApproverSpec::required(*u, u32::try_from(i + 1).unwrap()))
                .collect(),
        );
        rule.approval_type = ApprovalType::Percentage;
        rule.settings.percentage_required = Some(dec!(75));
        let policy = policy_of(&rule);

        let mut state = WorkflowEngine::initialize(&policy);
        for (i, user) in users.iter().take(3).enumerate() {
            state = WorkflowEngine::record_decision(
                &state,
                &policy,
                *user,
                ApprovalAction::Approved,
                None,
            )
            .unwrap();
            if i < 2 {
                assert_eq!(state.status, ExpenseStatus::Pending);
            }
        }
        assert_eq!(state.status, ExpenseStatus::Approved);
        assert_eq!(state.approved_by.len(), 3);
    }

    #[test]
    fn test_percentage_rejection_terminates_before_threshold() {
        // total=4, required=75%: 2 approvals, then a rejection ends it.
        let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut rule = sequential_rule(
            users
                .iter()
                .enumerate()
                .map(|(i, u)| ApproverSpec::required(*u, u32::try_from(i + 1).unwrap()))
                .collect(),
        );
        rule.approval_type = ApprovalType::Percentage;
        rule.settings.percentage_required = Some(dec!(75));
        let policy = policy_of(&rule);

        let mut state = WorkflowEngine::initialize(&policy);
        for user in users.iter().take(2) {
            state = WorkflowEngine::record_decision(
                &state,
                &policy,
                *user,
                ApprovalAction::Approved,
                None,
            )
            .unwrap();
        }
        state = WorkflowEngine::record_decision(
            &state,
            &policy,
            users[2],
            ApprovalAction::Rejected,
            None,
        )
        .unwrap();
        assert_eq!(state.status, ExpenseStatus::Rejected);
    }

    #[test]
    fn test_specific_approver_first_approval_wins() {
        // 5 approvers, designated approver decides first: approved with
        // approved_by.len() == 1.
        let users: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let mut rule = sequential_rule(
            users
                .iter()
                .enumerate()
                .map(|(i, u)| ApproverSpec::required(*u, u32::try_from(i + 1).unwrap()))
                .collect(),
        );
        rule.approval_type = ApprovalType::SpecificApprover;
        rule.settings.specific_approver = Some(users[0]);
        let policy = policy_of(&rule);

        let state = WorkflowEngine::initialize(&policy);
        let state = WorkflowEngine::record_decision(
            &state,
            &policy,
            users[0],
            ApprovalAction::Approved,
            None,
        )
        .unwrap();

        assert_eq!(state.status, ExpenseStatus::Approved);
        assert_eq!(state.approved_by.len(), 1);
        assert_eq!(state.total_approvers, 5);
    }

    #[test]
    fn test_override_forces_rejection_on_fresh_workflow() {
        let a = Uuid::new_v4();
        let rule = sequential_rule(vec![ApproverSpec::required(a, 1)]);
        let policy = policy_of(&rule);
        let state = WorkflowEngine::initialize(&policy);

        let admin = Uuid::new_v4();
        let state = WorkflowEngine::override_decision(
            &state,
            admin,
            ApprovalAction::Rejected,
            Some("Duplicate claim".to_string()),
        );

        assert_eq!(state.status, ExpenseStatus::Rejected);
        assert_eq!(state.current_approver, None);
        assert_eq!(state.rejection_reason.as_deref(), Some("Duplicate claim"));
        assert!(state.final_approval_date.is_some());
        assert_eq!(state.history.len(), 1);
        assert!(state.history[0].is_override);
        assert_eq!(state.history[0].step, 2);
    }

    #[test]
    fn test_approved_and_rejected_stay_disjoint() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rule = sequential_rule(vec![
            ApproverSpec::required(a, 1),
            ApproverSpec::required(b, 2),
        ]);
        let policy = policy_of(&rule);
        let state = WorkflowEngine::initialize(&policy);

        let state =
            WorkflowEngine::record_decision(&state, &policy, a, ApprovalAction::Approved, None)
                .unwrap();
        let state =
            WorkflowEngine::record_decision(&state, &policy, b, ApprovalAction::Rejected, None)
                .unwrap();

        assert_eq!(state.approved_by, vec![a]);
        assert_eq!(state.rejected_by, vec![b]);
    }
}
