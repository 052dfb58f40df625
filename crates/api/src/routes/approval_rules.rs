//! Approval rule management routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{approval_rule_error_response, respond};
use crate::{AppState, middleware::AuthUser};
use expensio_core::workflow::{ApprovalSettings, ApprovalType, ApproverSpec};
use expensio_db::repositories::approval_rule::{
    ApprovalRuleRepository, CreateApprovalRuleInput, UpdateApprovalRuleInput,
};
use expensio_shared::AppError;

/// Creates the approval rules routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approval-rules", get(list_approval_rules))
        .route("/approval-rules", post(create_approval_rule))
        .route("/approval-rules/{rule_id}", get(get_approval_rule))
        .route("/approval-rules/{rule_id}", patch(update_approval_rule))
        .route("/approval-rules/{rule_id}", delete(delete_approval_rule))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating an approval rule.
#[derive(Debug, Deserialize)]
pub struct CreateApprovalRuleRequest {
    /// Name of the approval rule.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Inclusive amount threshold in company currency.
    pub amount_threshold: Option<Decimal>,
    /// Category names the rule covers.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Department names the rule covers.
    #[serde(default)]
    pub departments: Vec<String>,
    /// Ordered approver list.
    pub approvers: Vec<ApproverSpec>,
    /// Approval policy; must be one of the known types.
    pub approval_type: String,
    /// Policy settings.
    #[serde(default)]
    pub settings: ApprovalSettings,
    /// Priority (higher wins when several rules match).
    #[serde(default)]
    pub priority: i32,
}

/// Request body for updating an approval rule.
#[derive(Debug, Deserialize)]
pub struct UpdateApprovalRuleRequest {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New amount threshold.
    pub amount_threshold: Option<Option<Decimal>>,
    /// New categories.
    pub categories: Option<Vec<String>>,
    /// New departments.
    pub departments: Option<Vec<String>>,
    /// New approver list.
    pub approvers: Option<Vec<ApproverSpec>>,
    /// New approval policy.
    pub approval_type: Option<String>,
    /// New policy settings.
    pub settings: Option<ApprovalSettings>,
    /// New priority.
    pub priority: Option<i32>,
    /// Active status.
    pub is_active: Option<bool>,
}

/// Response for an approval rule.
#[derive(Debug, Serialize)]
pub struct ApprovalRuleResponse {
    /// Rule ID.
    pub id: Uuid,
    /// Company ID.
    pub company_id: Uuid,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Amount threshold.
    pub amount_threshold: Option<String>,
    /// Categories.
    pub categories: serde_json::Value,
    /// Departments.
    pub departments: serde_json::Value,
    /// Approver list.
    pub approvers: serde_json::Value,
    /// Approval policy.
    pub approval_type: String,
    /// Policy settings.
    pub approval_settings: serde_json::Value,
    /// Priority.
    pub priority: i32,
    /// Active status.
    pub is_active: bool,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/approval-rules` - List active approval rules.
async fn list_approval_rules(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let rule_repo = ApprovalRuleRepository::new((*state.db).clone());

    match rule_repo.list_rules(auth.company_id()).await {
        Ok(rules) => {
            let items: Vec<ApprovalRuleResponse> =
                rules.into_iter().map(rule_to_response).collect();

            (StatusCode::OK, Json(json!({ "data": items }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list approval rules");
            approval_rule_error_response(&e)
        }
    }
}

/// POST `/approval-rules` - Create approval rule. Admin only.
async fn create_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateApprovalRuleRequest>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    if payload.name.trim().is_empty() {
        return respond(&AppError::Validation("Name is required".to_string()));
    }

    if let Err(response) = validate_threshold(payload.amount_threshold) {
        return response;
    }

    let Some(approval_type) = ApprovalType::parse(&payload.approval_type) else {
        return invalid_approval_type_response(&payload.approval_type);
    };

    let rule_repo = ApprovalRuleRepository::new((*state.db).clone());

    let input = CreateApprovalRuleInput {
        name: payload.name,
        description: payload.description,
        amount_threshold: payload.amount_threshold,
        categories: payload.categories,
        departments: payload.departments,
        approvers: payload.approvers,
        approval_type,
        settings: payload.settings,
        priority: payload.priority,
    };

    match rule_repo.create_rule(auth.company_id(), input).await {
        Ok(rule) => {
            info!(
                company_id = %auth.company_id(),
                rule_id = %rule.id,
                "Approval rule created"
            );

            (StatusCode::CREATED, Json(rule_to_response(rule))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create approval rule");
            approval_rule_error_response(&e)
        }
    }
}

/// GET `/approval-rules/{rule_id}` - Get approval rule.
async fn get_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rule_id): Path<Uuid>,
) -> impl IntoResponse {
    let rule_repo = ApprovalRuleRepository::new((*state.db).clone());

    match rule_repo.get_rule(auth.company_id(), rule_id).await {
        Ok(rule) => (StatusCode::OK, Json(rule_to_response(rule))).into_response(),
        Err(e) => approval_rule_error_response(&e),
    }
}

/// PATCH `/approval-rules/{rule_id}` - Update approval rule. Admin only.
async fn update_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rule_id): Path<Uuid>,
    Json(payload): Json<UpdateApprovalRuleRequest>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    if let Some(threshold) = payload.amount_threshold {
        if let Err(response) = validate_threshold(threshold) {
            return response;
        }
    }

    let approval_type = match payload.approval_type.as_deref() {
        Some(raw) => match ApprovalType::parse(raw) {
            Some(t) => Some(t),
            None => return invalid_approval_type_response(raw),
        },
        None => None,
    };

    let rule_repo = ApprovalRuleRepository::new((*state.db).clone());

    let input = UpdateApprovalRuleInput {
        name: payload.name,
        description: payload.description.map(Some),
        amount_threshold: payload.amount_threshold,
        categories: payload.categories,
        departments: payload.departments,
        approvers: payload.approvers,
        approval_type,
        settings: payload.settings,
        priority: payload.priority,
        is_active: payload.is_active,
    };

    match rule_repo.update_rule(auth.company_id(), rule_id, input).await {
        Ok(rule) => {
            info!(
                company_id = %auth.company_id(),
                rule_id = %rule_id,
                "Approval rule updated"
            );

            (StatusCode::OK, Json(rule_to_response(rule))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to update approval rule");
            approval_rule_error_response(&e)
        }
    }
}

/// DELETE `/approval-rules/{rule_id}` - Deactivate approval rule. Admin only.
async fn delete_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rule_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    let rule_repo = ApprovalRuleRepository::new((*state.db).clone());

    match rule_repo.delete_rule(auth.company_id(), rule_id).await {
        Ok(()) => {
            info!(
                company_id = %auth.company_id(),
                rule_id = %rule_id,
                "Approval rule deleted"
            );

            (StatusCode::NO_CONTENT, ()).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to delete approval rule");
            approval_rule_error_response(&e)
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn rule_to_response(
    rule: expensio_db::entities::approval_rules::Model,
) -> ApprovalRuleResponse {
    ApprovalRuleResponse {
        id: rule.id,
        company_id: rule.company_id,
        name: rule.name,
        description: rule.description,
        amount_threshold: rule.amount_threshold.map(|a| a.to_string()),
        categories: rule.categories,
        departments: rule.departments,
        approvers: rule.approvers,
        approval_type: rule.approval_type,
        approval_settings: rule.approval_settings,
        priority: rule.priority,
        is_active: rule.is_active,
        created_at: rule.created_at.to_rfc3339(),
        updated_at: rule.updated_at.to_rfc3339(),
    }
}

#[allow(clippy::result_large_err)]
fn require_admin(auth: &AuthUser) -> Result<(), axum::response::Response> {
    if auth.claims().is_admin() {
        Ok(())
    } else {
        Err(respond(&AppError::Forbidden(
            "Administrator role required for this operation".to_string(),
        )))
    }
}

#[allow(clippy::result_large_err)]
fn validate_threshold(threshold: Option<Decimal>) -> Result<(), axum::response::Response> {
    match threshold {
        Some(t) if t < Decimal::ZERO => Err(respond(&AppError::Validation(
            "Amount threshold must be non-negative".to_string(),
        ))),
        _ => Ok(()),
    }
}

fn invalid_approval_type_response(value: &str) -> axum::response::Response {
    respond(&AppError::Validation(format!(
        "Unknown approval type '{value}'"
    )))
}
