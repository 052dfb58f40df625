//! Workflow repository for expense approval state transitions.
//!
//! Bridges the pure `WorkflowEngine` and the expenses table. Decisions
//! are committed with a conditional update on `(status, current_approver)`
//! so two approvers racing on one expense cannot both win.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use expensio_core::workflow::{
    ApprovalAction, EffectivePolicy, ExpenseStatus, WorkflowEngine, WorkflowError, WorkflowState,
};

use crate::entities::{
    expenses::{self, Entity as ExpenseEntity, Model as ExpenseModel},
    users,
};
use crate::repositories::approval_rule::ApprovalRuleRepository;
use crate::repositories::expense::{workflow_state, ExpenseError};

/// Workflow repository for expense state transitions.
#[derive(Debug, Clone)]
pub struct WorkflowRepository {
    db: DatabaseConnection,
}

impl WorkflowRepository {
    /// Creates a new workflow repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Initializes (or re-initializes) the approval workflow of an expense.
    ///
    /// Resolves the governing rule for the expense's company-currency
    /// amount, falls back to the employee's manager when no rule matches,
    /// and resets all workflow columns from the engine's initial state.
    /// An empty resolved approver list auto-approves the expense.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Expense is not found
    /// - Expense has already reached a terminal state
    /// - Database operation fails
    pub async fn initialize_workflow(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
    ) -> Result<ExpenseModel, WorkflowError> {
        let expense = self.fetch_expense(company_id, expense_id).await?;

        let current = workflow_state(&expense).map_err(map_expense_err)?;
        if current.status != ExpenseStatus::Pending {
            return Err(WorkflowError::ExpenseNotPending {
                status: current.status,
            });
        }

        let policy = self.resolve_policy(company_id, &expense).await?;
        let state = WorkflowEngine::initialize(&policy);

        let mut active: expenses::ActiveModel = expense.into();
        apply_state(&mut active, &state)?;

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(updated)
    }

    /// Records an approve/reject decision from the current approver.
    ///
    /// The governing rule is re-resolved on every decision, so rule edits
    /// mid-workflow take effect from the next evaluation round. The write
    /// is conditional on the row still being pending with the same
    /// current approver; losing that race yields `DecisionConflict`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Expense is not found
    /// - Expense is not pending
    /// - The acting user is not the current approver
    /// - Another decision landed first (`DecisionConflict`)
    /// - Database operation fails
    pub async fn record_decision(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
        approver: Uuid,
        action: ApprovalAction,
        comment: Option<String>,
    ) -> Result<ExpenseModel, WorkflowError> {
        let expense = self.fetch_expense(company_id, expense_id).await?;
        let state = workflow_state(&expense).map_err(map_expense_err)?;

        let policy = self.resolve_policy(company_id, &expense).await?;
        let next = WorkflowEngine::record_decision(&state, &policy, approver, action, comment)?;

        let result = ExpenseEntity::update_many()
            .col_expr(expenses::Column::Status, Expr::value(next.status.as_str()))
            .col_expr(
                expenses::Column::CurrentApprover,
                Expr::value(next.current_approver),
            )
            .col_expr(
                expenses::Column::ApprovalStep,
                Expr::value(to_db_count(next.approval_step)),
            )
            .col_expr(
                expenses::Column::ApprovedBy,
                Expr::value(to_json(&next.approved_by)?),
            )
            .col_expr(
                expenses::Column::RejectedBy,
                Expr::value(to_json(&next.rejected_by)?),
            )
            .col_expr(
                expenses::Column::ApprovalHistory,
                Expr::value(to_json(&next.history)?),
            )
            .col_expr(
                expenses::Column::FinalApprovalDate,
                Expr::value(next.final_approval_date.map(sea_orm::prelude::DateTimeWithTimeZone::from)),
            )
            .col_expr(
                expenses::Column::RejectionReason,
                Expr::value(next.rejection_reason.clone()),
            )
            .col_expr(
                expenses::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(
                    chrono::Utc::now(),
                )),
            )
            .filter(expenses::Column::Id.eq(expense_id))
            .filter(expenses::Column::CompanyId.eq(company_id))
            .filter(expenses::Column::Status.eq(ExpenseStatus::Pending.as_str()))
            .filter(expenses::Column::CurrentApprover.eq(approver))
            .exec(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(WorkflowError::DecisionConflict);
        }

        self.fetch_expense(company_id, expense_id).await
    }

    /// Forces a terminal decision regardless of workflow position.
    ///
    /// Authorization (administrator capability) is checked by the caller;
    /// this method applies the override unconditionally, including on
    /// already-terminal expenses.
    ///
    /// # Errors
    ///
    /// Returns an error if the expense is not found or the write fails.
    pub async fn override_expense(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
        acting_user: Uuid,
        action: ApprovalAction,
        comment: Option<String>,
    ) -> Result<ExpenseModel, WorkflowError> {
        let expense = self.fetch_expense(company_id, expense_id).await?;
        let state = workflow_state(&expense).map_err(map_expense_err)?;

        let next = WorkflowEngine::override_decision(&state, acting_user, action, comment);

        let mut active: expenses::ActiveModel = expense.into();
        apply_state(&mut active, &next)?;

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(updated)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    async fn fetch_expense(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
    ) -> Result<ExpenseModel, WorkflowError> {
        ExpenseEntity::find_by_id(expense_id)
            .filter(expenses::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))
    }

    /// Resolves the effective policy for an expense: matching rule first,
    /// then the employee's manager when flagged as an approver.
    async fn resolve_policy(
        &self,
        company_id: Uuid,
        expense: &ExpenseModel,
    ) -> Result<EffectivePolicy, WorkflowError> {
        let rules = ApprovalRuleRepository::new(self.db.clone());
        let rule = rules
            .resolve_rule(company_id, expense.amount_in_company_currency)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let manager_approver = if rule.is_none() {
            self.manager_approver(expense.employee_id).await?
        } else {
            None
        };

        Ok(EffectivePolicy::resolve(rule.as_ref(), manager_approver))
    }

    /// Finds the employee's manager, if one exists and is flagged as an
    /// approver.
    async fn manager_approver(&self, employee_id: Uuid) -> Result<Option<Uuid>, WorkflowError> {
        let employee = users::Entity::find_by_id(employee_id)
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let Some(manager_id) = employee.and_then(|u| u.manager_id) else {
            return Ok(None);
        };

        let manager = users::Entity::find_by_id(manager_id)
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(manager.and_then(|m| m.is_manager_approver.then_some(m.id)))
    }
}

// ============================================================================
// Conversion helpers
// ============================================================================

/// Writes every workflow column of an expense from an engine state.
fn apply_state(
    active: &mut expenses::ActiveModel,
    state: &WorkflowState,
) -> Result<(), WorkflowError> {
    active.status = Set(state.status.as_str().to_string());
    active.current_approver = Set(state.current_approver);
    active.approval_step = Set(to_db_count(state.approval_step));
    active.total_approvers = Set(to_db_count(state.total_approvers));
    active.approved_by = Set(to_json(&state.approved_by)?);
    active.rejected_by = Set(to_json(&state.rejected_by)?);
    active.approval_history = Set(to_json(&state.history)?);
    active.final_approval_date = Set(state.final_approval_date.map(Into::into));
    active.rejection_reason = Set(state.rejection_reason.clone());
    active.updated_at = Set(chrono::Utc::now().into());
    Ok(())
}

fn to_db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, WorkflowError> {
    serde_json::to_value(value).map_err(|e| WorkflowError::Database(e.to_string()))
}

fn map_expense_err(err: ExpenseError) -> WorkflowError {
    match err {
        ExpenseError::NotFound(id) => WorkflowError::ExpenseNotFound(id),
        other => WorkflowError::Database(other.to_string()),
    }
}
