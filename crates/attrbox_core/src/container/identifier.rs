//! Attribute container identifier.
//!
//! # Responsibility
//! - Provide an opaque handle that can be attached to a container.
//! - Render the handle as a stable string for dedup and linking.
//!
//! # Invariants
//! - Allocated identifiers are backed by a random UUID and never collide
//!   with another allocated identifier in practice.
//! - A given identifier always renders the same string.
//! - Identifiers are immutable once created.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Separator between store name and sequence number.
const SEQUENCE_SEPARATOR: char = '.';

/// Opaque unique handle attached to an attribute container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    repr: IdentifierRepr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum IdentifierRepr {
    /// Generated on demand by this process.
    Allocated(Uuid),
    /// Assigned by an external store as `name.sequence_number`.
    Sequence { name: String, sequence_number: u64 },
}

impl Identifier {
    /// Allocates a fresh identifier.
    ///
    /// Safe to call concurrently from many producer threads.
    pub fn new() -> Self {
        let uuid = Uuid::new_v4();
        log::trace!("event=identifier_allocated module=container");
        Self {
            repr: IdentifierRepr::Allocated(uuid),
        }
    }

    /// Wraps an externally allocated UUID.
    ///
    /// Returns `None` for the nil UUID, which never identifies a container.
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        if uuid.is_nil() {
            return None;
        }
        Some(Self {
            repr: IdentifierRepr::Allocated(uuid),
        })
    }

    /// Creates a store-assigned identifier.
    ///
    /// Uniqueness is the responsibility of the store handing out
    /// `(name, sequence_number)` pairs.
    pub fn with_sequence(name: impl Into<String>, sequence_number: u64) -> Self {
        Self {
            repr: IdentifierRepr::Sequence {
                name: name.into(),
                sequence_number,
            },
        }
    }

    /// Store name for sequence identifiers.
    pub fn name(&self) -> Option<&str> {
        match &self.repr {
            IdentifierRepr::Sequence { name, .. } => Some(name.as_str()),
            IdentifierRepr::Allocated(_) => None,
        }
    }

    /// Sequence number for sequence identifiers.
    pub fn sequence_number(&self) -> Option<u64> {
        match &self.repr {
            IdentifierRepr::Sequence {
                sequence_number, ..
            } => Some(*sequence_number),
            IdentifierRepr::Allocated(_) => None,
        }
    }

    /// Returns the stable string form of this identifier.
    pub fn copy_to_string(&self) -> String {
        self.to_string()
    }

    /// Parses an identifier from its string form.
    ///
    /// Accepts both a hyphenated UUID and `name.sequence_number`.
    ///
    /// # Errors
    /// - `Empty` for blank input.
    /// - `NilUuid` for the all-zero UUID.
    /// - `InvalidSequence` when a `name.number` pair is malformed.
    /// - `Unrecognized` for anything else.
    pub fn copy_from_string(value: &str) -> Result<Self, IdentifierParseError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdentifierParseError::Empty);
        }

        if let Ok(uuid) = Uuid::parse_str(trimmed) {
            return Self::from_uuid(uuid).ok_or(IdentifierParseError::NilUuid);
        }

        let Some((name, number)) = trimmed.rsplit_once(SEQUENCE_SEPARATOR) else {
            return Err(IdentifierParseError::Unrecognized(trimmed.to_string()));
        };
        if name.is_empty() || number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdentifierParseError::InvalidSequence(trimmed.to_string()));
        }
        let sequence_number = number
            .parse::<u64>()
            .map_err(|_| IdentifierParseError::InvalidSequence(trimmed.to_string()))?;

        Ok(Self::with_sequence(name, sequence_number))
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            IdentifierRepr::Allocated(uuid) => write!(f, "{}", uuid.hyphenated()),
            IdentifierRepr::Sequence {
                name,
                sequence_number,
            } => write!(f, "{name}{SEQUENCE_SEPARATOR}{sequence_number}"),
        }
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.copy_to_string())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::copy_from_string(&raw).map_err(serde::de::Error::custom)
    }
}

/// Identifier string parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierParseError {
    Empty,
    NilUuid,
    InvalidSequence(String),
    Unrecognized(String),
}

impl Display for IdentifierParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier string must not be empty"),
            Self::NilUuid => write!(f, "identifier must not be the nil uuid"),
            Self::InvalidSequence(value) => write!(
                f,
                "identifier is invalid: {value} (expected name.sequence_number)"
            ),
            Self::Unrecognized(value) => write!(f, "identifier is unrecognized: {value}"),
        }
    }
}

impl Error for IdentifierParseError {}
