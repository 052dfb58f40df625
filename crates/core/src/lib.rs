//! Core business logic for Expensio.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, policy evaluation, and calculations live here.
//!
//! # Modules
//!
//! - `workflow` - Approval workflow engine and policy evaluation
//! - `currency` - Currency conversion with a TTL rate cache

pub mod currency;
pub mod workflow;
