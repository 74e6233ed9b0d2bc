//! Core attribute container model for pipeline record exchange.
//! This crate is the single source of truth for attribute exposure rules.

pub mod container;
pub mod logging;

pub use container::expression::{
    parse_expression, Comparison, ComparisonOperator, ExpressionError,
};
pub use container::identifier::{Identifier, IdentifierParseError};
pub use container::interface::{
    convert_attribute, convert_optional_attribute, is_protected_name, validate_declaration,
    AttributeContainer, ContainerError, ContainerResult, DeclarationError, IdentifierSlot,
    PROTECTED_MARKER, VALUES_SEPARATOR,
};
pub use container::value::{AttributeValue, ValueTypeError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
