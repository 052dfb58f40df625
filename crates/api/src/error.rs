//! Domain-error to HTTP response mapping.
//!
//! Handlers funnel every error through [`AppError`], which owns the
//! status-code and error-code vocabulary. Internal detail is kept out of
//! 500 responses; all other errors surface their display message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use expensio_core::currency::ConversionError;
use expensio_core::workflow::WorkflowError;
use expensio_db::repositories::approval_rule::ApprovalRuleError;
use expensio_db::repositories::expense::ExpenseError;
use expensio_shared::AppError;

/// Renders an [`AppError`] as the API's JSON error body.
pub(crate) fn respond(e: &AppError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "An error occurred".to_string()
    } else {
        e.to_string()
    };

    (
        status,
        Json(json!({ "error": e.error_code(), "message": message })),
    )
        .into_response()
}

pub(crate) fn expense_error_response(e: &ExpenseError) -> Response {
    respond(&expense_app_error(e))
}

pub(crate) fn workflow_error_response(e: &WorkflowError) -> Response {
    respond(&workflow_app_error(e))
}

pub(crate) fn conversion_error_response(e: &ConversionError) -> Response {
    respond(&conversion_app_error(e))
}

pub(crate) fn approval_rule_error_response(e: &ApprovalRuleError) -> Response {
    respond(&approval_rule_app_error(e))
}

fn expense_app_error(e: &ExpenseError) -> AppError {
    match e {
        ExpenseError::NotFound(_) => AppError::NotFound("Expense not found".to_string()),
        ExpenseError::NotEditable { .. } => AppError::InvalidState(e.to_string()),
        ExpenseError::NotOwner(_) => AppError::Forbidden(e.to_string()),
        ExpenseError::Database(err) => AppError::Database(err.to_string()),
        ExpenseError::InvalidData(msg) => AppError::Internal(msg.clone()),
    }
}

fn workflow_app_error(e: &WorkflowError) -> AppError {
    match e {
        WorkflowError::ExpenseNotPending { .. } => AppError::InvalidState(e.to_string()),
        WorkflowError::NotCurrentApprover { .. }
        | WorkflowError::NotAuthorizedToOverride { .. } => AppError::Forbidden(e.to_string()),
        WorkflowError::DecisionConflict => AppError::Conflict(e.to_string()),
        WorkflowError::ExpenseNotFound(_) => AppError::NotFound("Expense not found".to_string()),
        WorkflowError::Database(msg) => AppError::Database(msg.clone()),
    }
}

fn conversion_app_error(e: &ConversionError) -> AppError {
    match e {
        ConversionError::InvalidCurrency(code) => {
            AppError::Validation(format!("Invalid currency code: {code}"))
        }
        ConversionError::RateUnavailable { .. } | ConversionError::Provider(_) => {
            AppError::ConversionFailure("Exchange rate is unavailable; try again later".to_string())
        }
    }
}

fn approval_rule_app_error(e: &ApprovalRuleError) -> AppError {
    match e {
        ApprovalRuleError::NotFound(_) => AppError::NotFound("Approval rule not found".to_string()),
        ApprovalRuleError::InvalidSettings(msg) => AppError::Validation(msg.clone()),
        ApprovalRuleError::Database(err) => AppError::Database(err.to_string()),
        ApprovalRuleError::InvalidRuleData(msg) => AppError::Internal(msg.clone()),
    }
}
