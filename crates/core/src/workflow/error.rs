//! Workflow error types for the expense approval lifecycle.

use thiserror::Error;
use uuid::Uuid;

use crate::workflow::types::ExpenseStatus;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Attempted to decide on an expense that is not pending.
    #[error("Expense is not pending (current status: {status})")]
    ExpenseNotPending {
        /// The expense's current status.
        status: ExpenseStatus,
    },

    /// The acting user is not the expense's current approver.
    #[error("User {user_id} is not the current approver for this expense")]
    NotCurrentApprover {
        /// The user who attempted to decide.
        user_id: Uuid,
    },

    /// The acting user may not override the workflow.
    #[error("User {user_id} is not authorized to override this expense")]
    NotAuthorizedToOverride {
        /// The user who attempted the override.
        user_id: Uuid,
    },

    /// A concurrent decision committed first; this one had no effect.
    #[error("A concurrent decision was recorded for this approval step")]
    DecisionConflict,

    /// Expense not found.
    #[error("Expense {0} not found")]
    ExpenseNotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}
