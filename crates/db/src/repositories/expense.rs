//! Expense repository.
//!
//! CRUD for expense rows plus decoding of the persisted workflow columns
//! into the core `WorkflowState`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use thiserror::Error;
use uuid::Uuid;

use expensio_core::workflow::{ExpenseStatus, HistoryEntry, WorkflowState};

use crate::entities::expenses::{self, ActiveModel, Entity as ExpenseEntity, Model as ExpenseModel};

/// Errors that can occur during expense operations.
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// Expense not found.
    #[error("Expense {0} not found")]
    NotFound(Uuid),

    /// Expense is no longer editable.
    #[error("Expense is {status} and can no longer be modified")]
    NotEditable {
        /// The terminal status blocking the edit.
        status: String,
    },

    /// Only the submitting employee may modify the expense.
    #[error("User {0} does not own this expense")]
    NotOwner(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Stored workflow data could not be decoded.
    #[error("Invalid expense data: {0}")]
    InvalidData(String),
}

/// Input for creating an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseInput {
    /// Submitting employee.
    pub employee_id: Uuid,
    /// Amount in the submitted currency.
    pub amount: Decimal,
    /// ISO 4217 code of the submitted currency.
    pub currency: String,
    /// Amount normalized into company currency.
    pub amount_in_company_currency: Decimal,
    /// Rate used for the normalization.
    pub exchange_rate: Decimal,
    /// Expense category.
    pub category: String,
    /// Free-form description.
    pub description: String,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
}

/// Input for updating a pending expense.
#[derive(Debug, Clone, Default)]
pub struct UpdateExpenseInput {
    /// New amount in the submitted currency.
    pub amount: Option<Decimal>,
    /// New currency code.
    pub currency: Option<String>,
    /// Re-normalized company-currency amount.
    pub amount_in_company_currency: Option<Decimal>,
    /// Rate used for the re-normalization.
    pub exchange_rate: Option<Decimal>,
    /// New category.
    pub category: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New expense date.
    pub expense_date: Option<NaiveDate>,
}

/// Repository for expense operations.
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new `ExpenseRepository`.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a new pending expense with an unstarted workflow.
    ///
    /// The caller is expected to initialize the workflow immediately
    /// after, once the governing rule is resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_expense(
        &self,
        company_id: Uuid,
        input: CreateExpenseInput,
    ) -> Result<ExpenseModel, ExpenseError> {
        let now = chrono::Utc::now();
        let expense = ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(input.employee_id),
            company_id: Set(company_id),
            amount: Set(input.amount),
            currency: Set(input.currency),
            amount_in_company_currency: Set(input.amount_in_company_currency),
            exchange_rate: Set(input.exchange_rate),
            category: Set(input.category),
            description: Set(input.description),
            expense_date: Set(input.expense_date),
            status: Set(ExpenseStatus::Pending.as_str().to_string()),
            current_approver: Set(None),
            approval_step: Set(0),
            total_approvers: Set(0),
            approved_by: Set(serde_json::json!([])),
            rejected_by: Set(serde_json::json!([])),
            approval_history: Set(serde_json::json!([])),
            final_approval_date: Set(None),
            rejection_reason: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let result = expense.insert(&self.db).await?;
        Ok(result)
    }

    /// Gets an expense by ID within a company.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such expense exists in the company.
    pub async fn get_expense(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
    ) -> Result<ExpenseModel, ExpenseError> {
        let expense = ExpenseEntity::find_by_id(expense_id)
            .filter(expenses::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(ExpenseError::NotFound(expense_id))?;

        Ok(expense)
    }

    /// Lists an employee's expenses, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_for_employee(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Vec<ExpenseModel>, ExpenseError> {
        let rows = ExpenseEntity::find()
            .filter(expenses::Column::CompanyId.eq(company_id))
            .filter(expenses::Column::EmployeeId.eq(employee_id))
            .order_by_desc(expenses::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(rows)
    }

    /// Lists pending expenses currently awaiting the given approver.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_pending_for_approver(
        &self,
        company_id: Uuid,
        approver_id: Uuid,
    ) -> Result<Vec<ExpenseModel>, ExpenseError> {
        let rows = ExpenseEntity::find()
            .filter(expenses::Column::CompanyId.eq(company_id))
            .filter(expenses::Column::Status.eq(ExpenseStatus::Pending.as_str()))
            .filter(expenses::Column::CurrentApprover.eq(approver_id))
            .order_by_desc(expenses::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(rows)
    }

    /// Updates a pending expense's editable fields.
    ///
    /// The caller re-initializes the workflow afterwards when the amount
    /// changed, since the governing rule may differ.
    ///
    /// # Errors
    ///
    /// Returns an error if the expense is missing, owned by another user,
    /// or no longer pending.
    pub async fn update_expense(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
        employee_id: Uuid,
        input: UpdateExpenseInput,
    ) -> Result<ExpenseModel, ExpenseError> {
        let existing = self.get_expense(company_id, expense_id).await?;
        require_editable_by(&existing, employee_id)?;

        let mut expense: ActiveModel = existing.into();

        if let Some(amount) = input.amount {
            expense.amount = Set(amount);
        }
        if let Some(currency) = input.currency {
            expense.currency = Set(currency);
        }
        if let Some(converted) = input.amount_in_company_currency {
            expense.amount_in_company_currency = Set(converted);
        }
        if let Some(rate) = input.exchange_rate {
            expense.exchange_rate = Set(rate);
        }
        if let Some(category) = input.category {
            expense.category = Set(category);
        }
        if let Some(description) = input.description {
            expense.description = Set(description);
        }
        if let Some(expense_date) = input.expense_date {
            expense.expense_date = Set(expense_date);
        }

        expense.updated_at = Set(chrono::Utc::now().into());

        let result = expense.update(&self.db).await?;
        Ok(result)
    }

    /// Deletes a pending expense.
    ///
    /// # Errors
    ///
    /// Returns an error if the expense is missing, owned by another user,
    /// or no longer pending.
    pub async fn delete_expense(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
        employee_id: Uuid,
    ) -> Result<(), ExpenseError> {
        let existing = self.get_expense(company_id, expense_id).await?;
        require_editable_by(&existing, employee_id)?;

        existing.delete(&self.db).await?;
        Ok(())
    }

    /// Gets the decoded approval history of an expense.
    ///
    /// # Errors
    ///
    /// Returns an error if the expense is missing or its history column
    /// cannot be decoded.
    pub async fn get_history(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
    ) -> Result<Vec<HistoryEntry>, ExpenseError> {
        let expense = self.get_expense(company_id, expense_id).await?;
        serde_json::from_value(expense.approval_history)
            .map_err(|e| ExpenseError::InvalidData(format!("approval_history: {e}")))
    }
}

fn require_editable_by(expense: &ExpenseModel, employee_id: Uuid) -> Result<(), ExpenseError> {
    if expense.employee_id != employee_id {
        return Err(ExpenseError::NotOwner(employee_id));
    }
    let status = ExpenseStatus::parse(&expense.status)
        .ok_or_else(|| ExpenseError::InvalidData(format!("status: {}", expense.status)))?;
    if !status.is_editable() {
        return Err(ExpenseError::NotEditable {
            status: expense.status.clone(),
        });
    }
    Ok(())
}

/// Decodes the workflow columns of an expense row into a `WorkflowState`.
///
/// # Errors
///
/// Returns an error if the status string or a JSON column is malformed.
pub fn workflow_state(model: &ExpenseModel) -> Result<WorkflowState, ExpenseError> {
    let status = ExpenseStatus::parse(&model.status)
        .ok_or_else(|| ExpenseError::InvalidData(format!("status: {}", model.status)))?;

    let approved_by: Vec<Uuid> = serde_json::from_value(model.approved_by.clone())
        .map_err(|e| ExpenseError::InvalidData(format!("approved_by: {e}")))?;
    let rejected_by: Vec<Uuid> = serde_json::from_value(model.rejected_by.clone())
        .map_err(|e| ExpenseError::InvalidData(format!("rejected_by: {e}")))?;
    let history: Vec<HistoryEntry> = serde_json::from_value(model.approval_history.clone())
        .map_err(|e| ExpenseError::InvalidData(format!("approval_history: {e}")))?;

    Ok(WorkflowState {
        status,
        current_approver: model.current_approver,
        approval_step: u32::try_from(model.approval_step).unwrap_or(0),
        total_approvers: u32::try_from(model.total_approvers).unwrap_or(0),
        approved_by,
        rejected_by,
        history,
        final_approval_date: model.final_approval_date.map(Into::into),
        rejection_reason: model.rejection_reason.clone(),
    })
}
