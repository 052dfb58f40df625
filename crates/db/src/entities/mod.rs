//! `SeaORM` entity definitions.

pub mod approval_rules;
pub mod companies;
pub mod expenses;
pub mod users;
