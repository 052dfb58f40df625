//! `SeaORM` Entity for approval_rules table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "approval_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Inclusive lower bound in company currency; NULL matches any amount.
    pub amount_threshold: Option<Decimal>,
    /// JSON array of category names; informational, not used in matching.
    pub categories: Json,
    /// JSON array of department names; informational, not used in matching.
    pub departments: Json,
    /// JSON array of approver specs `{user_id, step, is_required, can_override}`.
    pub approvers: Json,
    /// One of `sequential`, `parallel`, `percentage`, `specific_approver`,
    /// `hybrid`. Unknown values behave as `parallel`.
    pub approval_type: String,
    /// JSON object of policy settings (percentage_required, specific_approver,
    /// allow_manager_override, auto_approve_after_days).
    pub approval_settings: Json,
    pub is_active: bool,
    /// Higher priority wins when several rules match.
    pub priority: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The company this rule applies to.
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Companies,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
