//! Expense approval workflow engine.
//!
//! This module implements the approval workflow state machine: rule
//! matching, approver-list initialization, decision processing under the
//! five approval policies, and the administrative override.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (ExpenseStatus, ApproverSpec, WorkflowState)
//! - `error` - Workflow-specific error types
//! - `rules` - Approval rule matching
//! - `policy` - Per-approval-type policy evaluation
//! - `engine` - The decision state machine

pub mod engine;
pub mod error;
pub mod policy;
pub mod rules;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{EffectivePolicy, WorkflowEngine};
pub use error::WorkflowError;
pub use policy::{PolicyContext, PolicyOutcome};
pub use rules::select_rule;
pub use types::{
    ApprovalAction, ApprovalRuleDef, ApprovalSettings, ApprovalType, ApproverSpec, ExpenseStatus,
    HistoryEntry, WorkflowState,
};
