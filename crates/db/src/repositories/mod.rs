//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod approval_rule;
pub mod expense;
pub mod workflow;

pub use approval_rule::{
    ApprovalRuleError, ApprovalRuleRepository, CreateApprovalRuleInput, UpdateApprovalRuleInput,
};
pub use expense::{CreateExpenseInput, ExpenseError, ExpenseRepository, UpdateExpenseInput};
pub use workflow::WorkflowRepository;
