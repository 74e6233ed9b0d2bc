//! Attribute container model.
//!
//! # Responsibility
//! - Define the record contract shared by every pipeline stage.
//! - Keep identity, projection and filtering rules in one place.
//!
//! # Invariants
//! - Consumers read containers only through [`interface::AttributeContainer`].
//! - Attribute exposure is decided from static per-type declarations.

pub mod expression;
pub mod identifier;
pub mod interface;
pub mod value;
