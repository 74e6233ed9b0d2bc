//! Attribute container interface.
//!
//! # Responsibility
//! - Define the contract every record kind exposes to downstream consumers:
//!   attribute enumeration, dict/hash/string projection, identity and
//!   expression matching.
//! - Resolve which attributes are visible from the per-type declarations,
//!   never from live object inspection.
//!
//! # Invariants
//! - A protected attribute (name starting with [`PROTECTED_MARKER`]) is only
//!   exposed when it is allow-listed AND the type declares a non-empty schema.
//! - Every declared public attribute is always exposed.
//! - `CONTAINER_TYPE` and `SCHEMA` are associated consts and cannot vary per
//!   instance.
//! - Query operations are total; `matches_expression` degrades to `false`.

use crate::container::expression::parse_expression;
use crate::container::identifier::Identifier;
use crate::container::value::{exact_integer, AttributeValue, ValueTypeError};
use log::debug;
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Leading character marking an attribute name as protected.
pub const PROTECTED_MARKER: char = '_';

/// Separator used by [`AttributeContainer::attribute_values_string`].
pub const VALUES_SEPARATOR: &str = ", ";

/// Returns whether `name` is a protected attribute name.
pub fn is_protected_name(name: &str) -> bool {
    name.starts_with(PROTECTED_MARKER)
}

pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors raised while writing attributes into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// Value does not fit the field type.
    ValueType {
        name: String,
        source: ValueTypeError,
    },
    /// Container type does not accept writes for this attribute.
    ReadOnlyAttribute(String),
    /// Name is not declared by the container type.
    UnknownAttribute(String),
}

impl Display for ContainerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValueType { name, source } => write!(f, "attribute `{name}`: {source}"),
            Self::ReadOnlyAttribute(name) => write!(f, "attribute is read-only: {name}"),
            Self::UnknownAttribute(name) => write!(f, "attribute is not declared: {name}"),
        }
    }
}

impl Error for ContainerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ValueType { source, .. } => Some(source),
            Self::ReadOnlyAttribute(_) => None,
            Self::UnknownAttribute(_) => None,
        }
    }
}

/// Converts a projected value into a field type for `set_attribute_value`.
pub fn convert_attribute<T>(name: &str, value: AttributeValue) -> ContainerResult<T>
where
    T: TryFrom<AttributeValue, Error = ValueTypeError>,
{
    T::try_from(value).map_err(|source| ContainerError::ValueType {
        name: name.to_string(),
        source,
    })
}

/// Like [`convert_attribute`], mapping `Null` to `None`.
pub fn convert_optional_attribute<T>(
    name: &str,
    value: AttributeValue,
) -> ContainerResult<Option<T>>
where
    T: TryFrom<AttributeValue, Error = ValueTypeError>,
{
    value
        .into_optional()
        .map_err(|source| ContainerError::ValueType {
            name: name.to_string(),
            source,
        })
}

/// Storage for a container's identifier.
///
/// Allocation is lazy and race-free through a shared reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierSlot {
    cell: OnceCell<Identifier>,
}

impl IdentifierSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier without allocating.
    pub fn get(&self) -> Option<&Identifier> {
        self.cell.get()
    }

    /// Returns the identifier, allocating one on first access.
    pub fn get_or_allocate(&self) -> &Identifier {
        self.cell.get_or_init(Identifier::new)
    }

    /// Replaces or clears the identifier.
    pub fn replace(&mut self, identifier: Option<Identifier>) {
        self.cell = match identifier {
            Some(identifier) => OnceCell::with_value(identifier),
            None => OnceCell::new(),
        };
    }
}

/// Typed, attribute-bearing record exchanged between pipeline stages.
///
/// Implementors declare their attributes statically and provide a live read
/// of each field; every projection is derived from those declarations.
pub trait AttributeContainer {
    /// Tag identifying the concrete record kind.
    const CONTAINER_TYPE: &'static str;

    /// Every declared instance attribute, public and protected.
    const ATTRIBUTE_NAMES: &'static [&'static str];

    /// Attribute name to semantic type name.
    ///
    /// Only its presence is used here: a non-empty schema enables
    /// serialization of allow-listed protected attributes.
    const SCHEMA: &'static [(&'static str, &'static str)] = &[];

    /// Protected attributes eligible for exposure when a schema is declared.
    const SERIALIZABLE_PROTECTED_ATTRIBUTES: &'static [&'static str] = &[];

    /// Reads the live value of a declared attribute.
    fn attribute_value(&self, name: &str) -> Option<AttributeValue>;

    /// Writes one attribute; read-only unless the type overrides it.
    fn set_attribute_value(&mut self, name: &str, _value: AttributeValue) -> ContainerResult<()> {
        Err(ContainerError::ReadOnlyAttribute(name.to_string()))
    }

    fn identifier_slot(&self) -> &IdentifierSlot;

    fn identifier_slot_mut(&mut self) -> &mut IdentifierSlot;

    fn container_type(&self) -> &'static str {
        Self::CONTAINER_TYPE
    }

    fn has_schema(&self) -> bool {
        !Self::SCHEMA.is_empty()
    }

    /// Names eligible for exposure under the protected-attribute policy.
    fn attribute_names(&self) -> BTreeSet<&'static str> {
        let expose_protected = self.has_schema();
        Self::ATTRIBUTE_NAMES
            .iter()
            .copied()
            .filter(|name| {
                !is_protected_name(name)
                    || (expose_protected && Self::SERIALIZABLE_PROTECTED_ATTRIBUTES.contains(name))
            })
            .collect()
    }

    /// `(name, value)` pairs for every eligible attribute, sorted by name.
    ///
    /// A declared attribute the type cannot read projects as `Null`.
    fn attributes(&self) -> Vec<(&'static str, AttributeValue)> {
        self.attribute_names()
            .into_iter()
            .map(|name| {
                let value = self.attribute_value(name).unwrap_or(AttributeValue::Null);
                (name, value)
            })
            .collect()
    }

    /// Eligible attributes as a plain mapping for serializers.
    fn copy_to_dict(&self) -> BTreeMap<String, AttributeValue> {
        self.attributes()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    /// Sets every eligible attribute present in `attributes`.
    ///
    /// Ineligible or undeclared keys are skipped. All-or-nothing: writes go
    /// to a staged copy that replaces `self` only when every write succeeds,
    /// so on error the container is left unchanged.
    ///
    /// # Errors
    /// - Returns the first error raised by `set_attribute_value`.
    fn copy_from_dict(
        &mut self,
        attributes: &BTreeMap<String, AttributeValue>,
    ) -> ContainerResult<()>
    where
        Self: Clone,
    {
        let names = self.attribute_names();
        let mut staged = self.clone();
        for (name, value) in attributes {
            if !names.contains(name.as_str()) {
                debug!(
                    "event=attribute_skipped module=container container_type={} reason=not_eligible",
                    Self::CONTAINER_TYPE
                );
                continue;
            }
            staged.set_attribute_value(name, value.clone())?;
        }
        *self = staged;
        Ok(())
    }

    /// Human-readable `name: value` rendering of the set attributes.
    ///
    /// Sorted by name; unset (`Null`) attributes are omitted.
    fn attribute_values_string(&self) -> String {
        self.attributes()
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(VALUES_SEPARATOR)
    }

    /// Deterministic hash over the set attribute values.
    ///
    /// SHA-256 of a typed canonical encoding, truncated to 64 bits. Stable
    /// across processes, so it can be used as a dedup key.
    fn attribute_values_hash(&self) -> u64 {
        let digest = Sha256::digest(canonical_bytes(&self.attributes()));
        let mut prefix = [0_u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }

    /// Returns the identifier, allocating one on first access.
    fn identifier(&self) -> Identifier {
        self.identifier_slot().get_or_allocate().clone()
    }

    /// Replaces the identifier; `None` clears it.
    fn set_identifier(&mut self, identifier: Option<Identifier>) {
        self.identifier_slot_mut().replace(identifier);
    }

    /// Evaluates a single `name == literal` comparison against live values.
    ///
    /// Returns `false` for unparseable expressions and unknown attributes.
    fn matches_expression(&self, expression: &str) -> bool {
        let comparison = match parse_expression(expression) {
            Ok(comparison) => comparison,
            Err(err) => {
                debug!(
                    "event=expression_rejected module=container container_type={} reason={}",
                    Self::CONTAINER_TYPE,
                    err.code()
                );
                return false;
            }
        };

        let names = self.attribute_names();
        let outcome = comparison.evaluate(|name| {
            names
                .contains(name)
                .then(|| self.attribute_value(name).unwrap_or(AttributeValue::Null))
        });

        outcome.unwrap_or_else(|| {
            debug!(
                "event=expression_rejected module=container container_type={} reason=unknown_attribute",
                Self::CONTAINER_TYPE
            );
            false
        })
    }
}

/// Length-prefixed, type-tagged encoding of the set `(name, value)` pairs.
///
/// `pairs` must already be sorted by name. Floats holding an exact integer
/// (including `-0.0`) encode as that integer, so values that compare equal
/// encode identically.
fn canonical_bytes(pairs: &[(&'static str, AttributeValue)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (name, value) in pairs {
        let (tag, payload) = match value {
            AttributeValue::Null => continue,
            AttributeValue::Bool(inner) => (b'b', vec![u8::from(*inner)]),
            AttributeValue::Integer(inner) => (b'i', inner.to_be_bytes().to_vec()),
            AttributeValue::Float(inner) => match exact_integer(*inner) {
                Some(integral) => (b'i', integral.to_be_bytes().to_vec()),
                None => (b'f', inner.to_bits().to_be_bytes().to_vec()),
            },
            AttributeValue::String(inner) => (b's', inner.as_bytes().to_vec()),
            AttributeValue::Identifier(inner) => (b'r', inner.copy_to_string().into_bytes()),
        };
        push_field(&mut bytes, name.as_bytes());
        bytes.push(tag);
        push_field(&mut bytes, &payload);
    }
    bytes
}

fn push_field(bytes: &mut Vec<u8>, field: &[u8]) {
    bytes.extend_from_slice(&(field.len() as u64).to_be_bytes());
    bytes.extend_from_slice(field);
}

/// Checks a container type's static declarations.
///
/// Intended for registries and tests; projections do not depend on it.
///
/// # Errors
/// - Returns the first declaration problem found.
pub fn validate_declaration<C: AttributeContainer>() -> Result<(), DeclarationError> {
    if C::CONTAINER_TYPE.trim().is_empty() {
        return Err(DeclarationError::EmptyContainerType);
    }

    let mut declared = BTreeSet::new();
    for name in C::ATTRIBUTE_NAMES {
        if name.trim().is_empty() {
            return Err(DeclarationError::EmptyAttributeName);
        }
        if !declared.insert(*name) {
            return Err(DeclarationError::DuplicateAttribute(name.to_string()));
        }
    }

    for name in C::SERIALIZABLE_PROTECTED_ATTRIBUTES {
        if !is_protected_name(name) {
            return Err(DeclarationError::NotProtected(name.to_string()));
        }
        if !declared.contains(name) {
            return Err(DeclarationError::UndeclaredAttribute(name.to_string()));
        }
    }

    let mut schema_names = BTreeSet::new();
    for (name, _) in C::SCHEMA {
        if !declared.contains(name) {
            return Err(DeclarationError::UndeclaredAttribute(name.to_string()));
        }
        if !schema_names.insert(*name) {
            return Err(DeclarationError::DuplicateSchemaEntry(name.to_string()));
        }
    }

    Ok(())
}

/// Static declaration errors for a container type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    EmptyContainerType,
    EmptyAttributeName,
    DuplicateAttribute(String),
    NotProtected(String),
    UndeclaredAttribute(String),
    DuplicateSchemaEntry(String),
}

impl Display for DeclarationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContainerType => write!(f, "container type must not be empty"),
            Self::EmptyAttributeName => write!(f, "attribute name must not be empty"),
            Self::DuplicateAttribute(name) => write!(f, "attribute is declared twice: {name}"),
            Self::NotProtected(name) => write!(
                f,
                "serializable protected attribute must start with `{PROTECTED_MARKER}`: {name}"
            ),
            Self::UndeclaredAttribute(name) => write!(f, "attribute is not declared: {name}"),
            Self::DuplicateSchemaEntry(name) => {
                write!(f, "schema entry is duplicated: {name}")
            }
        }
    }
}

impl Error for DeclarationError {}
