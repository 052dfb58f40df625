//! Approval rule matching.
//!
//! Given a company's rules and a monetary amount in company currency,
//! selects the single rule that governs the expense: the highest
//! `(priority, amount_threshold)` among active rules whose threshold is
//! absent or at most the amount. Pure read; no rule found is not an error,
//! callers fall back to the manager-default policy.

use rust_decimal::Decimal;

use crate::workflow::types::ApprovalRuleDef;

/// Selects the governing approval rule for an amount.
///
/// Candidates are active rules whose `amount_threshold` is `None` or
/// `<= amount`; ties are broken by priority descending, then threshold
/// descending (a rule with no threshold loses to any thresholded match
/// at equal priority).
#[must_use]
pub fn select_rule(rules: &[ApprovalRuleDef], amount: Decimal) -> Option<&ApprovalRuleDef> {
    let mut candidates: Vec<&ApprovalRuleDef> = rules
        .iter()
        .filter(|r| r.is_active)
        .filter(|r| r.amount_threshold.is_none_or(|threshold| threshold <= amount))
        .collect();

    candidates.sort_by(|a, b| {
        b.priority.cmp(&a.priority).then(
            b.amount_threshold
                .unwrap_or(Decimal::MIN)
                .cmp(&a.amount_threshold.unwrap_or(Decimal::MIN)),
        )
    });

    candidates.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::{ApprovalSettings, ApprovalType};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn rule(threshold: Option<Decimal>, priority: i32, is_active: bool) -> ApprovalRuleDef {
        ApprovalRuleDef {
            id: Uuid::new_v4(),
            amount_threshold: threshold,
            priority,
            is_active,
            approvers: vec![],
            approval_type: ApprovalType::Sequential,
            settings: ApprovalSettings::default(),
        }
    }

    #[test]
    fn test_no_rules_yields_none() {
        assert!(select_rule(&[], dec!(100)).is_none());
    }

    #[test]
    fn test_threshold_is_inclusive_lower_bound() {
        let rules = vec![rule(Some(dec!(500)), 1, true)];
        assert!(select_rule(&rules, dec!(499.99)).is_none());
        assert!(select_rule(&rules, dec!(500)).is_some());
        assert!(select_rule(&rules, dec!(10000)).is_some());
    }

    #[test]
    fn test_rule_without_threshold_always_matches() {
        let rules = vec![rule(None, 1, true)];
        assert!(select_rule(&rules, Decimal::ZERO).is_some());
    }

    #[test]
    fn test_inactive_rules_skipped() {
        let rules = vec![rule(None, 10, false), rule(None, 1, true)];
        let selected = select_rule(&rules, dec!(100)).unwrap();
        assert_eq!(selected.priority, 1);
    }

    #[test]
    fn test_highest_priority_wins() {
        let low = rule(Some(dec!(0)), 1, true);
        let high = rule(Some(dec!(0)), 5, true);
        let rules = vec![low, high.clone()];
        assert_eq!(select_rule(&rules, dec!(100)).unwrap().id, high.id);
    }

    #[test]
    fn test_priority_tie_broken_by_threshold() {
        let loose = rule(Some(dec!(100)), 3, true);
        let tight = rule(Some(dec!(1000)), 3, true);
        let rules = vec![loose.clone(), tight.clone()];

        // Both match at 5000; the higher threshold is the more specific rule.
        assert_eq!(select_rule(&rules, dec!(5000)).unwrap().id, tight.id);
        // Only the loose rule matches at 500.
        assert_eq!(select_rule(&rules, dec!(500)).unwrap().id, loose.id);
    }

    #[test]
    fn test_thresholdless_rule_loses_tie_to_thresholded() {
        let bare = rule(None, 3, true);
        let thresholded = rule(Some(dec!(50)), 3, true);
        let rules = vec![bare, thresholded.clone()];
        assert_eq!(select_rule(&rules, dec!(100)).unwrap().id, thresholded.id);
    }
}
