//! Approval rule repository.
//!
//! Provides CRUD operations for approval rules and resolves the
//! governing rule for an expense amount.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use thiserror::Error;
use uuid::Uuid;

use expensio_core::workflow::{
    select_rule, ApprovalRuleDef, ApprovalSettings, ApprovalType, ApproverSpec,
};

use crate::entities::approval_rules::{
    self, ActiveModel, Entity as ApprovalRuleEntity, Model as ApprovalRuleModel,
};

/// Errors that can occur during approval rule operations.
#[derive(Debug, Error)]
pub enum ApprovalRuleError {
    /// Approval rule not found.
    #[error("Approval rule {0} not found")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Invalid rule settings.
    #[error("Invalid rule settings: {0}")]
    InvalidSettings(String),

    /// Stored rule data could not be decoded.
    #[error("Invalid rule data: {0}")]
    InvalidRuleData(String),
}

/// Input for creating an approval rule.
#[derive(Debug, Clone)]
pub struct CreateApprovalRuleInput {
    /// Name of the approval rule.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Inclusive amount threshold in company currency; `None` matches any.
    pub amount_threshold: Option<Decimal>,
    /// Category names the rule is documented to cover.
    pub categories: Vec<String>,
    /// Department names the rule is documented to cover.
    pub departments: Vec<String>,
    /// Ordered approver list.
    pub approvers: Vec<ApproverSpec>,
    /// The approval policy.
    pub approval_type: ApprovalType,
    /// Policy settings.
    pub settings: ApprovalSettings,
    /// Priority (higher wins when several rules match).
    pub priority: i32,
}

/// Input for updating an approval rule.
#[derive(Debug, Clone, Default)]
pub struct UpdateApprovalRuleInput {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New amount threshold.
    pub amount_threshold: Option<Option<Decimal>>,
    /// New categories.
    pub categories: Option<Vec<String>>,
    /// New departments.
    pub departments: Option<Vec<String>>,
    /// New approver list.
    pub approvers: Option<Vec<ApproverSpec>>,
    /// New approval policy.
    pub approval_type: Option<ApprovalType>,
    /// New policy settings.
    pub settings: Option<ApprovalSettings>,
    /// New priority.
    pub priority: Option<i32>,
    /// Active status.
    pub is_active: Option<bool>,
}

/// Repository for approval rule operations.
pub struct ApprovalRuleRepository {
    db: DatabaseConnection,
}

impl ApprovalRuleRepository {
    /// Creates a new `ApprovalRuleRepository`.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new approval rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the insert fails.
    pub async fn create_rule(
        &self,
        company_id: Uuid,
        input: CreateApprovalRuleInput,
    ) -> Result<ApprovalRuleModel, ApprovalRuleError> {
        validate_settings(&input.settings)?;

        let rule = ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(input.name),
            description: Set(input.description),
            amount_threshold: Set(input.amount_threshold),
            categories: Set(to_json(&input.categories)?),
            departments: Set(to_json(&input.departments)?),
            approvers: Set(to_json(&input.approvers)?),
            approval_type: Set(input.approval_type.as_str().to_string()),
            approval_settings: Set(to_json(&input.settings)?),
            is_active: Set(true),
            priority: Set(input.priority),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(chrono::Utc::now().into()),
        };

        let result = rule.insert(&self.db).await?;
        Ok(result)
    }

    /// Lists all active approval rules for a company, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_rules(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<ApprovalRuleModel>, ApprovalRuleError> {
        let rules = ApprovalRuleEntity::find()
            .filter(approval_rules::Column::CompanyId.eq(company_id))
            .filter(approval_rules::Column::IsActive.eq(true))
            .order_by_desc(approval_rules::Column::Priority)
            .all(&self.db)
            .await?;

        Ok(rules)
    }

    /// Gets a specific approval rule by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no rule with this ID exists in the company.
    pub async fn get_rule(
        &self,
        company_id: Uuid,
        rule_id: Uuid,
    ) -> Result<ApprovalRuleModel, ApprovalRuleError> {
        let rule = ApprovalRuleEntity::find_by_id(rule_id)
            .filter(approval_rules::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(ApprovalRuleError::NotFound(rule_id))?;

        Ok(rule)
    }

    /// Updates an approval rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is not found or the update fails.
    pub async fn update_rule(
        &self,
        company_id: Uuid,
        rule_id: Uuid,
        input: UpdateApprovalRuleInput,
    ) -> Result<ApprovalRuleModel, ApprovalRuleError> {
        let existing = self.get_rule(company_id, rule_id).await?;

        let mut rule: ActiveModel = existing.into();

        if let Some(name) = input.name {
            rule.name = Set(name);
        }
        if let Some(description) = input.description {
            rule.description = Set(description);
        }
        if let Some(amount_threshold) = input.amount_threshold {
            rule.amount_threshold = Set(amount_threshold);
        }
        if let Some(categories) = input.categories {
            rule.categories = Set(to_json(&categories)?);
        }
        if let Some(departments) = input.departments {
            rule.departments = Set(to_json(&departments)?);
        }
        if let Some(approvers) = input.approvers {
            rule.approvers = Set(to_json(&approvers)?);
        }
        if let Some(approval_type) = input.approval_type {
            rule.approval_type = Set(approval_type.as_str().to_string());
        }
        if let Some(settings) = input.settings {
            validate_settings(&settings)?;
            rule.approval_settings = Set(to_json(&settings)?);
        }
        if let Some(priority) = input.priority {
            rule.priority = Set(priority);
        }
        if let Some(is_active) = input.is_active {
            rule.is_active = Set(is_active);
        }

        rule.updated_at = Set(chrono::Utc::now().into());

        let result = rule.update(&self.db).await?;
        Ok(result)
    }

    /// Soft deletes an approval rule by setting `is_active` to false.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is not found or the update fails.
    pub async fn delete_rule(
        &self,
        company_id: Uuid,
        rule_id: Uuid,
    ) -> Result<(), ApprovalRuleError> {
        let existing = self.get_rule(company_id, rule_id).await?;

        let mut rule: ActiveModel = existing.into();
        rule.is_active = Set(false);
        rule.updated_at = Set(chrono::Utc::now().into());

        rule.update(&self.db).await?;
        Ok(())
    }

    /// Resolves the governing rule for an expense amount in company currency.
    ///
    /// Matching and tie-breaking (priority, then threshold) are delegated
    /// to the core `select_rule`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored rule cannot be
    /// decoded.
    pub async fn resolve_rule(
        &self,
        company_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<ApprovalRuleDef>, ApprovalRuleError> {
        let models = self.list_rules(company_id).await?;

        let defs: Vec<ApprovalRuleDef> = models
            .iter()
            .map(to_rule_def)
            .collect::<Result<_, _>>()?;

        Ok(select_rule(&defs, amount).cloned())
    }
}

/// Decodes a stored rule row into the core rule definition.
///
/// Unknown approval types decode as `parallel` rather than failing, so a
/// forward-migrated rule never blocks decision processing.
pub fn to_rule_def(model: &ApprovalRuleModel) -> Result<ApprovalRuleDef, ApprovalRuleError> {
    let approvers: Vec<ApproverSpec> = serde_json::from_value(model.approvers.clone())
        .map_err(|e| ApprovalRuleError::InvalidRuleData(format!("approvers: {e}")))?;
    let settings: ApprovalSettings = serde_json::from_value(model.approval_settings.clone())
        .map_err(|e| ApprovalRuleError::InvalidRuleData(format!("approval_settings: {e}")))?;

    Ok(ApprovalRuleDef {
        id: model.id,
        amount_threshold: model.amount_threshold,
        priority: model.priority,
        is_active: model.is_active,
        approvers,
        approval_type: ApprovalType::parse_lossy(&model.approval_type),
        settings,
    })
}

fn validate_settings(settings: &ApprovalSettings) -> Result<(), ApprovalRuleError> {
    if let Some(pct) = settings.percentage_required {
        if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
            return Err(ApprovalRuleError::InvalidSettings(format!(
                "percentage_required must be between 0 and 100, got {pct}"
            )));
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ApprovalRuleError> {
    serde_json::to_value(value).map_err(|e| ApprovalRuleError::InvalidRuleData(e.to_string()))
}
