//! Expense submission and management routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{
    conversion_error_response, expense_error_response, respond, workflow_error_response,
};
use crate::{AppState, middleware::AuthUser};
use expensio_db::entities::{companies, expenses};
use expensio_db::repositories::expense::{
    CreateExpenseInput, ExpenseRepository, UpdateExpenseInput,
};
use expensio_db::repositories::workflow::WorkflowRepository;
use expensio_shared::AppError;

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(create_expense))
        .route("/expenses", get(list_expenses))
        .route("/expenses/{expense_id}", get(get_expense))
        .route("/expenses/{expense_id}", put(update_expense))
        .route("/expenses/{expense_id}", delete(delete_expense))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting an expense.
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    /// Amount in the submitted currency.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Expense category.
    pub category: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
}

/// Request body for editing a pending expense.
#[derive(Debug, Deserialize)]
pub struct UpdateExpenseRequest {
    /// New amount in the submitted currency.
    pub amount: Option<Decimal>,
    /// New currency code.
    pub currency: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New expense date.
    pub expense_date: Option<NaiveDate>,
}

/// Response for an expense.
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    /// Expense ID.
    pub id: Uuid,
    /// Submitting employee.
    pub employee_id: Uuid,
    /// Amount in the submitted currency.
    pub amount: String,
    /// Submitted currency code.
    pub currency: String,
    /// Amount in the company reporting currency.
    pub amount_in_company_currency: String,
    /// Rate used for normalization.
    pub exchange_rate: String,
    /// Category.
    pub category: String,
    /// Description.
    pub description: String,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
    /// Workflow status.
    pub status: String,
    /// Approver whose decision is awaited.
    pub current_approver: Option<Uuid>,
    /// Current approval step.
    pub approval_step: i32,
    /// Approver-list length at workflow start.
    pub total_approvers: i32,
    /// Users who approved so far.
    pub approved_by: serde_json::Value,
    /// Users who rejected.
    pub rejected_by: serde_json::Value,
    /// When the workflow reached a terminal state.
    pub final_approval_date: Option<String>,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/expenses` - Submit an expense.
///
/// The amount is normalized into the company reporting currency, then the
/// approval workflow is initialized from the matching rule (or manager
/// fallback).
async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateExpenseRequest>,
) -> impl IntoResponse {
    if let Err(response) = validate_amount(payload.amount) {
        return response;
    }
    if payload.category.trim().is_empty() {
        return respond(&AppError::Validation("Category is required".to_string()));
    }

    let company_currency = match company_currency(&state, auth.company_id()).await {
        Ok(c) => c,
        Err(response) => return response,
    };

    let conversion = match state
        .conversion
        .convert(payload.amount, &payload.currency, &company_currency)
        .await
    {
        Ok(c) => c,
        Err(e) => return conversion_error_response(&e),
    };

    let expense_repo = ExpenseRepository::new((*state.db).clone());
    let input = CreateExpenseInput {
        employee_id: auth.user_id(),
        amount: payload.amount,
        currency: payload.currency.to_uppercase(),
        amount_in_company_currency: conversion.converted_amount,
        exchange_rate: conversion.exchange_rate,
        category: payload.category,
        description: payload.description,
        expense_date: payload.expense_date,
    };

    let expense = match expense_repo.create_expense(auth.company_id(), input).await {
        Ok(e) => e,
        Err(e) => {
            error!(error = %e, "Failed to create expense");
            return expense_error_response(&e);
        }
    };

    let workflow_repo = WorkflowRepository::new((*state.db).clone());
    match workflow_repo
        .initialize_workflow(auth.company_id(), expense.id)
        .await
    {
        Ok(expense) => {
            info!(
                expense_id = %expense.id,
                employee_id = %expense.employee_id,
                status = %expense.status,
                "Expense submitted"
            );
            (StatusCode::CREATED, Json(expense_to_response(expense))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize workflow");
            workflow_error_response(&e)
        }
    }
}

/// GET `/expenses` - List the caller's expenses, newest first.
async fn list_expenses(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let expense_repo = ExpenseRepository::new((*state.db).clone());

    match expense_repo
        .list_for_employee(auth.company_id(), auth.user_id())
        .await
    {
        Ok(rows) => {
            let items: Vec<ExpenseResponse> = rows.into_iter().map(expense_to_response).collect();
            (StatusCode::OK, Json(json!({ "data": items }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list expenses");
            expense_error_response(&e)
        }
    }
}

/// GET `/expenses/{expense_id}` - Get one expense.
async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
) -> impl IntoResponse {
    let expense_repo = ExpenseRepository::new((*state.db).clone());

    match expense_repo.get_expense(auth.company_id(), expense_id).await {
        Ok(expense) => (StatusCode::OK, Json(expense_to_response(expense))).into_response(),
        Err(e) => expense_error_response(&e),
    }
}

/// PUT `/expenses/{expense_id}` - Edit a pending expense.
///
/// Only the submitting employee may edit, and only while pending. The
/// amount is re-normalized and the workflow re-initialized, since the
/// governing rule may have changed.
async fn update_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> impl IntoResponse {
    if let Some(amount) = payload.amount {
        if let Err(response) = validate_amount(amount) {
            return response;
        }
    }

    let expense_repo = ExpenseRepository::new((*state.db).clone());

    let existing = match expense_repo.get_expense(auth.company_id(), expense_id).await {
        Ok(e) => e,
        Err(e) => return expense_error_response(&e),
    };

    let amount = payload.amount.unwrap_or(existing.amount);
    let currency = payload
        .currency
        .clone()
        .unwrap_or_else(|| existing.currency.clone());

    let company_currency = match company_currency(&state, auth.company_id()).await {
        Ok(c) => c,
        Err(response) => return response,
    };

    let conversion = match state
        .conversion
        .convert(amount, &currency, &company_currency)
        .await
    {
        Ok(c) => c,
        Err(e) => return conversion_error_response(&e),
    };

    let input = UpdateExpenseInput {
        amount: payload.amount,
        currency: payload.currency.map(|c| c.to_uppercase()),
        amount_in_company_currency: Some(conversion.converted_amount),
        exchange_rate: Some(conversion.exchange_rate),
        category: payload.category,
        description: payload.description,
        expense_date: payload.expense_date,
    };

    if let Err(e) = expense_repo
        .update_expense(auth.company_id(), expense_id, auth.user_id(), input)
        .await
    {
        error!(error = %e, "Failed to update expense");
        return expense_error_response(&e);
    }

    // The rule may match differently after the edit; restart the workflow.
    let workflow_repo = WorkflowRepository::new((*state.db).clone());
    match workflow_repo
        .initialize_workflow(auth.company_id(), expense_id)
        .await
    {
        Ok(expense) => {
            info!(expense_id = %expense.id, "Expense updated, workflow restarted");
            (StatusCode::OK, Json(expense_to_response(expense))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to re-initialize workflow");
            workflow_error_response(&e)
        }
    }
}

/// DELETE `/expenses/{expense_id}` - Delete a pending expense.
async fn delete_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
) -> impl IntoResponse {
    let expense_repo = ExpenseRepository::new((*state.db).clone());

    match expense_repo
        .delete_expense(auth.company_id(), expense_id, auth.user_id())
        .await
    {
        Ok(()) => {
            info!(expense_id = %expense_id, "Expense deleted");
            (StatusCode::NO_CONTENT, ()).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to delete expense");
            expense_error_response(&e)
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

pub(crate) fn expense_to_response(expense: expenses::Model) -> ExpenseResponse {
    ExpenseResponse {
        id: expense.id,
        employee_id: expense.employee_id,
        amount: expense.amount.to_string(),
        currency: expense.currency,
        amount_in_company_currency: expense.amount_in_company_currency.to_string(),
        exchange_rate: expense.exchange_rate.to_string(),
        category: expense.category,
        description: expense.description,
        expense_date: expense.expense_date,
        status: expense.status,
        current_approver: expense.current_approver,
        approval_step: expense.approval_step,
        total_approvers: expense.total_approvers,
        approved_by: expense.approved_by,
        rejected_by: expense.rejected_by,
        final_approval_date: expense.final_approval_date.map(|d| d.to_rfc3339()),
        rejection_reason: expense.rejection_reason,
        created_at: expense.created_at.to_rfc3339(),
        updated_at: expense.updated_at.to_rfc3339(),
    }
}

#[allow(clippy::result_large_err)]
fn validate_amount(amount: Decimal) -> Result<(), axum::response::Response> {
    if amount <= Decimal::ZERO {
        return Err(respond(&AppError::Validation(
            "Amount must be positive".to_string(),
        )));
    }
    Ok(())
}

async fn company_currency(
    state: &AppState,
    company_id: Uuid,
) -> Result<String, axum::response::Response> {
    match companies::Entity::find_by_id(company_id).one(&*state.db).await {
        Ok(Some(company)) => Ok(company.currency),
        Ok(None) => Err(respond(&AppError::NotFound(
            "Company not found".to_string(),
        ))),
        Err(e) => {
            error!(error = %e, "Database error loading company");
            Err(respond(&AppError::Database(e.to_string())))
        }
    }
}
