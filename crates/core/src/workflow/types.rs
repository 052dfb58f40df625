//! Workflow domain types for the expense approval lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Expense status in the approval workflow.
///
/// `Approved` and `Rejected` are terminal; once reached, no further
/// workflow mutation occurs through non-override paths.
/// `PartiallyApproved` exists in the schema but is never assigned by the
/// decision logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Awaiting approval decisions.
    Pending,
    /// Fully approved (terminal).
    Approved,
    /// Rejected (terminal).
    Rejected,
    /// Reserved status, not reachable from the decision logic.
    PartiallyApproved,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::PartiallyApproved => "partially_approved",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "partially_approved" => Some(Self::PartiallyApproved),
            _ => None,
        }
    }

    /// Returns true if no further workflow mutation may occur.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Returns true if the expense can still be edited or deleted.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A decision an approver can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    /// Approve the expense at the current step.
    Approved,
    /// Reject the expense. A single rejection halts the workflow.
    Rejected,
}

impl ApprovalAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses an action from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Approval policy configured on a rule.
///
/// Each variant implements the common `evaluate` interface in
/// `workflow::policy`; adding a policy means adding a variant and its
/// evaluation arm, not another string branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    /// Approvers act one at a time in step order.
    Sequential,
    /// All required approvers must approve, in any order.
    Parallel,
    /// A configured percentage of approvers must approve.
    Percentage,
    /// One designated approver's approval is sufficient.
    SpecificApprover,
    /// Percentage OR specific approver, whichever is satisfied first.
    Hybrid,
}

impl ApprovalType {
    /// Returns the string representation of the approval type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Percentage => "percentage",
            Self::SpecificApprover => "specific_approver",
            Self::Hybrid => "hybrid",
        }
    }

    /// Parses an approval type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "parallel" => Some(Self::Parallel),
            "percentage" => Some(Self::Percentage),
            "specific_approver" => Some(Self::SpecificApprover),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Parses an approval type, mapping unknown values to `Parallel`.
    ///
    /// Unknown types behave like parallel: all required approvers must
    /// approve.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Parallel)
    }
}

impl fmt::Display for ApprovalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// One entry in a rule's ordered approver list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverSpec {
    /// The approving user.
    pub user_id: Uuid,
    /// 1-based position in the sequential ordering. Steps need not be
    /// contiguous; the list is sorted ascending before processing.
    pub step: u32,
    /// Whether this approver's absence blocks approval under
    /// parallel-style policies.
    #[serde(default = "default_true")]
    pub is_required: bool,
    /// Whether this approver may override the workflow.
    #[serde(default)]
    pub can_override: bool,
}

impl ApproverSpec {
    /// Creates a required approver at the given step.
    #[must_use]
    pub const fn required(user_id: Uuid, step: u32) -> Self {
        Self {
            user_id,
            step,
            is_required: true,
            can_override: false,
        }
    }
}

/// Per-rule approval settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApprovalSettings {
    /// Percentage of approvers required (0-100). Default depends on
    /// policy: 100 for percentage, 60 for hybrid.
    #[serde(default)]
    pub percentage_required: Option<Decimal>,
    /// Designated approver whose approval alone is sufficient.
    #[serde(default)]
    pub specific_approver: Option<Uuid>,
    /// Whether a manager override is permitted for this rule.
    #[serde(default)]
    pub allow_manager_override: bool,
    /// Auto-approve after this many days without a decision.
    #[serde(default)]
    pub auto_approve_after_days: Option<u32>,
}

/// A company-scoped approval rule, resolved from persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRuleDef {
    /// Unique identifier for the rule.
    pub id: Uuid,
    /// Inclusive lower bound of applicability in company currency.
    /// `None` means the rule always matches on amount.
    pub amount_threshold: Option<Decimal>,
    /// Priority for rule selection (higher wins on tie-break).
    pub priority: i32,
    /// Whether the rule participates in matching.
    pub is_active: bool,
    /// Ordered approver list.
    pub approvers: Vec<ApproverSpec>,
    /// The approval policy for this rule.
    pub approval_type: ApprovalType,
    /// Policy settings.
    pub settings: ApprovalSettings,
}

/// One append-only entry in the approval history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The user who acted.
    pub approver: Uuid,
    /// The decision taken.
    pub action: ApprovalAction,
    /// Optional comment from the approver.
    pub comment: Option<String>,
    /// The approval step at which the decision was recorded.
    pub step: u32,
    /// When the decision was recorded.
    pub timestamp: DateTime<Utc>,
    /// True when the entry was produced by an administrative override.
    #[serde(default)]
    pub is_override: bool,
}

/// The workflow portion of an expense, as operated on by the engine.
///
/// Persistence maps this onto the expense row; the engine itself is pure
/// and produces a new state rather than mutating storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowState {
    /// Current workflow status.
    pub status: ExpenseStatus,
    /// The approver whose decision is awaited, if any.
    pub current_approver: Option<Uuid>,
    /// 1-based step counter; 0 = workflow not started.
    pub approval_step: u32,
    /// Snapshot of the resolved approver-list length at workflow start.
    pub total_approvers: u32,
    /// Users who approved, ordered by arrival. Disjoint from `rejected_by`.
    pub approved_by: Vec<Uuid>,
    /// Users who rejected, ordered by arrival.
    pub rejected_by: Vec<Uuid>,
    /// Append-only decision log.
    pub history: Vec<HistoryEntry>,
    /// Set exactly when the status is terminal.
    pub final_approval_date: Option<DateTime<Utc>>,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in [
            ExpenseStatus::Pending,
            ExpenseStatus::Approved,
            ExpenseStatus::Rejected,
            ExpenseStatus::PartiallyApproved,
        ] {
            assert_eq!(ExpenseStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ExpenseStatus::parse("invalid"), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!ExpenseStatus::Pending.is_terminal());
        assert!(ExpenseStatus::Approved.is_terminal());
        assert!(ExpenseStatus::Rejected.is_terminal());
        assert!(!ExpenseStatus::PartiallyApproved.is_terminal());
    }

    #[test]
    fn test_status_editable() {
        assert!(ExpenseStatus::Pending.is_editable());
        assert!(!ExpenseStatus::Approved.is_editable());
        assert!(!ExpenseStatus::Rejected.is_editable());
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(ApprovalAction::parse("APPROVED"), Some(ApprovalAction::Approved));
        assert_eq!(ApprovalAction::parse("rejected"), Some(ApprovalAction::Rejected));
        assert_eq!(ApprovalAction::parse("maybe"), None);
    }

    #[test]
    fn test_approval_type_round_trip() {
        for t in [
            ApprovalType::Sequential,
            ApprovalType::Parallel,
            ApprovalType::Percentage,
            ApprovalType::SpecificApprover,
            ApprovalType::Hybrid,
        ] {
            assert_eq!(ApprovalType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_approval_type_lossy_defaults_to_parallel() {
        assert_eq!(ApprovalType::parse_lossy("weighted"), ApprovalType::Parallel);
        assert_eq!(
            ApprovalType::parse_lossy("sequential"),
            ApprovalType::Sequential
        );
    }

    #[test]
    fn test_approver_spec_serde_defaults() {
        // is_required defaults to true, can_override to false
        let json = format!(r#"{{"user_id":"{}","step":2}}"#, Uuid::nil());
        let spec: ApproverSpec = serde_json::from_str(&json).unwrap();
        assert!(spec.is_required);
        assert!(!spec.can_override);
        assert_eq!(spec.step, 2);
    }
}
