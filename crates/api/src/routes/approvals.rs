//! Approval decision routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{expense_error_response, respond, workflow_error_response};
use crate::routes::expenses::expense_to_response;
use crate::{AppState, middleware::AuthUser};
use expensio_core::workflow::{ApprovalAction, WorkflowError};
use expensio_db::repositories::expense::ExpenseRepository;
use expensio_db::repositories::workflow::WorkflowRepository;
use expensio_shared::AppError;

/// Creates the approval routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals/pending", get(list_pending))
        .route("/approvals/{expense_id}", put(decide))
        .route("/approvals/{expense_id}/override", put(override_decision))
        .route("/approvals/{expense_id}/history", get(get_history))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for an approval decision.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// `approved` or `rejected`.
    pub action: String,
    /// Optional comment; doubles as the rejection reason.
    pub comment: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/approvals/pending` - Expenses awaiting the caller's decision.
async fn list_pending(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if !auth.claims().can_approve() {
        return approver_required_response();
    }

    let expense_repo = ExpenseRepository::new((*state.db).clone());

    match expense_repo
        .list_pending_for_approver(auth.company_id(), auth.user_id())
        .await
    {
        Ok(rows) => {
            let items: Vec<_> = rows.into_iter().map(expense_to_response).collect();
            (StatusCode::OK, Json(json!({ "data": items }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list pending approvals");
            expense_error_response(&e)
        }
    }
}

/// PUT `/approvals/{expense_id}` - Record the current approver's decision.
async fn decide(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> impl IntoResponse {
    if !auth.claims().can_approve() {
        return approver_required_response();
    }

    let Some(action) = ApprovalAction::parse(&payload.action) else {
        return invalid_action_response(&payload.action);
    };

    let workflow_repo = WorkflowRepository::new((*state.db).clone());

    match workflow_repo
        .record_decision(
            auth.company_id(),
            expense_id,
            auth.user_id(),
            action,
            payload.comment,
        )
        .await
    {
        Ok(expense) => {
            info!(
                expense_id = %expense_id,
                approver = %auth.user_id(),
                action = %action,
                status = %expense.status,
                "Approval decision recorded"
            );
            (StatusCode::OK, Json(expense_to_response(expense))).into_response()
        }
        Err(e) => {
            warn!(expense_id = %expense_id, error = %e, "Approval decision failed");
            workflow_error_response(&e)
        }
    }
}

/// PUT `/approvals/{expense_id}/override` - Administrative override.
///
/// Forces a terminal state regardless of workflow position. Admin only.
async fn override_decision(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> impl IntoResponse {
    if !auth.claims().is_admin() {
        return workflow_error_response(&WorkflowError::NotAuthorizedToOverride {
            user_id: auth.user_id(),
        });
    }

    let Some(action) = ApprovalAction::parse(&payload.action) else {
        return invalid_action_response(&payload.action);
    };

    let workflow_repo = WorkflowRepository::new((*state.db).clone());

    match workflow_repo
        .override_expense(
            auth.company_id(),
            expense_id,
            auth.user_id(),
            action,
            payload.comment,
        )
        .await
    {
        Ok(expense) => {
            info!(
                expense_id = %expense_id,
                admin = %auth.user_id(),
                action = %action,
                "Workflow overridden"
            );
            (StatusCode::OK, Json(expense_to_response(expense))).into_response()
        }
        Err(e) => {
            error!(expense_id = %expense_id, error = %e, "Override failed");
            workflow_error_response(&e)
        }
    }
}

/// GET `/approvals/{expense_id}/history` - Decision log of an expense.
async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
) -> impl IntoResponse {
    let expense_repo = ExpenseRepository::new((*state.db).clone());

    match expense_repo.get_history(auth.company_id(), expense_id).await {
        Ok(history) => (StatusCode::OK, Json(json!({ "data": history }))).into_response(),
        Err(e) => expense_error_response(&e),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn approver_required_response() -> axum::response::Response {
    respond(&AppError::Forbidden(
        "You are not authorized to act on approval requests".to_string(),
    ))
}

fn invalid_action_response(action: &str) -> axum::response::Response {
    respond(&AppError::Validation(format!(
        "Action must be 'approved' or 'rejected', got '{action}'"
    )))
}
