//! `SeaORM` Entity for expenses table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub employee_id: Uuid,
    pub company_id: Uuid,
    /// Amount in the submitted currency.
    pub amount: Decimal,
    /// ISO 4217 code of the submitted currency.
    pub currency: String,
    /// Amount normalized into the company reporting currency at
    /// submit/edit time; rule thresholds compare against this.
    pub amount_in_company_currency: Decimal,
    pub exchange_rate: Decimal,
    pub category: String,
    pub description: String,
    pub expense_date: Date,
    /// One of `pending`, `approved`, `rejected`, `partially_approved`.
    pub status: String,
    pub current_approver: Option<Uuid>,
    /// 1-based step counter; 0 = workflow not started.
    pub approval_step: i32,
    pub total_approvers: i32,
    /// JSON array of user IDs, in decision order.
    pub approved_by: Json,
    /// JSON array of user IDs, in decision order.
    pub rejected_by: Json,
    /// JSON array of append-only history entries.
    pub approval_history: Json,
    pub final_approval_date: Option<DateTimeWithTimeZone>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The employee who submitted this expense.
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::EmployeeId",
        to = "super::users::Column::Id"
    )]
    Users,
    /// The company the expense was submitted within.
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Companies,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
