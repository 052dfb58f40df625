//! Property-based tests for the workflow engine.
//!
//! Validates the workflow invariants under randomized approver lists,
//! policies, and decision orders.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::workflow::engine::{EffectivePolicy, WorkflowEngine};
use crate::workflow::types::{
    ApprovalAction, ApprovalRuleDef, ApprovalSettings, ApprovalType, ApproverSpec, ExpenseStatus,
};

fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn arb_approval_type() -> impl Strategy<Value = ApprovalType> {
    prop_oneof![
        Just(ApprovalType::Sequential),
        Just(ApprovalType::Parallel),
        Just(ApprovalType::Percentage),
        Just(ApprovalType::SpecificApprover),
        Just(ApprovalType::Hybrid),
    ]
}

/// An active rule with 1-8 distinct required approvers and an arbitrary
/// policy; the specific approver (when relevant) is the last in the list.
fn arb_rule() -> impl Strategy<Value = ApprovalRuleDef> {
    (
        proptest::collection::hash_set(any::<u128>(), 1..8),
        arb_approval_type(),
        proptest::option::of(0u32..=100),
    )
        .prop_map(|(ids, approval_type, pct)| {
            let approvers: Vec<ApproverSpec> = ids
                .into_iter()
                .enumerate()
                .map(|(i, raw)| {
                    ApproverSpec::required(
                        Uuid::from_u128(raw),
                        u32::try_from(i + 1).unwrap(),
                    )
                })
                .collect();
            let specific = approvers.last().map(|a| a.user_id);
            ApprovalRuleDef {
                id: Uuid::new_v4(),
                amount_threshold: None,
                priority: 1,
                is_active: true,
                approvers,
                approval_type,
                settings: ApprovalSettings {
                    percentage_required: pct.map(Decimal::from),
                    specific_approver: specific,
                    allow_manager_override: false,
                    auto_approve_after_days: None,
                },
            }
        })
}

/// Drives the workflow to completion by always approving as the current
/// approver, returning the final state.
fn approve_to_completion(rule: &ApprovalRuleDef) -> crate::workflow::types::WorkflowState {
    let policy = EffectivePolicy::resolve(Some(rule), None);
    let mut state = WorkflowEngine::initialize(&policy);
    // Bounded: each round either terminates or consumes an undecided approver.
    for _ in 0..=rule.approvers.len() {
        let Some(current) = state.current_approver else {
            break;
        };
        state = WorkflowEngine::record_decision(
            &state,
            &policy,
            current,
            ApprovalAction::Approved,
            None,
        )
        .expect("current approver decision must be accepted");
    }
    state
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// final_approval_date is set iff the status is terminal.
    #[test]
    fn prop_final_date_iff_terminal(rule in arb_rule()) {
        let policy = EffectivePolicy::resolve(Some(&rule), None);
        let state = WorkflowEngine::initialize(&policy);
        prop_assert_eq!(state.final_approval_date.is_some(), state.status.is_terminal());

        let state = approve_to_completion(&rule);
        prop_assert_eq!(state.final_approval_date.is_some(), state.status.is_terminal());
    }

    /// Unanimous approval always terminates in Approved, whatever the policy.
    #[test]
    fn prop_unanimous_approval_approves(rule in arb_rule()) {
        let state = approve_to_completion(&rule);
        prop_assert_eq!(state.status, ExpenseStatus::Approved);
        prop_assert_eq!(state.current_approver, None);
    }

    /// approved_by and rejected_by stay disjoint, and no approver is
    /// counted twice.
    #[test]
    fn prop_decision_sets_disjoint_and_unique(rule in arb_rule()) {
        let state = approve_to_completion(&rule);
        for user in &state.approved_by {
            prop_assert!(!state.rejected_by.contains(user));
        }
        let mut seen = std::collections::HashSet::new();
        for user in state.approved_by.iter().chain(&state.rejected_by) {
            prop_assert!(seen.insert(*user), "approver counted twice: {user}");
        }
    }

    /// A rejection at any point terminates the workflow in Rejected, with
    /// history length equal to the number of decisions taken.
    #[test]
    fn prop_rejection_halts(rule in arb_rule(), reject_at in 0usize..8) {
        let policy = EffectivePolicy::resolve(Some(&rule), None);
        let mut state = WorkflowEngine::initialize(&policy);
        let mut decisions = 0usize;

        for round in 0..=rule.approvers.len() {
            let Some(current) = state.current_approver else { break };
            let action = if round == reject_at {
                ApprovalAction::Rejected
            } else {
                ApprovalAction::Approved
            };
            state = WorkflowEngine::record_decision(&state, &policy, current, action, None)
                .expect("current approver decision must be accepted");
            decisions += 1;
            if action == ApprovalAction::Rejected {
                prop_assert_eq!(state.status, ExpenseStatus::Rejected);
                break;
            }
        }
        prop_assert_eq!(state.history.len(), decisions);
    }

    /// An override forces the requested terminal state from any reachable
    /// pending state.
    #[test]
    fn prop_override_always_wins(rule in arb_rule(), admin in arb_uuid()) {
        let policy = EffectivePolicy::resolve(Some(&rule), None);
        let state = WorkflowEngine::initialize(&policy);
        prop_assume!(state.status == ExpenseStatus::Pending);

        let overridden = WorkflowEngine::override_decision(
            &state,
            admin,
            ApprovalAction::Rejected,
            None,
        );
        prop_assert_eq!(overridden.status, ExpenseStatus::Rejected);
        prop_assert_eq!(overridden.current_approver, None);
        prop_assert!(overridden.history.last().unwrap().is_override);
    }

    /// Sequential policies record history steps 1..=N in order.
    #[test]
    fn prop_sequential_steps_ordered(rule in arb_rule()) {
        prop_assume!(rule.approval_type == ApprovalType::Sequential);
        let state = approve_to_completion(&rule);
        for (i, entry) in state.history.iter().enumerate() {
            prop_assert_eq!(entry.step as usize, i + 1);
        }
    }
}
