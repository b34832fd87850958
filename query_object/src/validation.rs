//! Validation module
//!
//! Identifier checks applied before a table, alias or column name is allowed
//! into rendered SQL. Quoting itself is done per dialect at render time, so
//! these checks only reject names no quoting style can carry.

use crate::errors::QueryError;
use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name is empty
    Empty,
    /// Name is too long
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    /// Name contains control characters
    InvalidCharacters(String),
    /// A dotted name has an empty part (e.g. `dbo..Users`)
    EmptyPart(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Empty => {
                write!(f, "Name cannot be empty")
            }
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            ValidationError::InvalidCharacters(name) => {
                write!(f, "Name '{}' contains control characters", name.escape_debug())
            }
            ValidationError::EmptyPart(name) => {
                write!(f, "Qualified name '{}' has an empty part", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validated identifier that is safe to quote into SQL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedIdentifier(String);

impl ValidatedIdentifier {
    /// SQL Server `sysname` length; PostgreSQL truncates earlier but quietly
    const MAX_LENGTH: usize = 128;

    /// Create a new validated identifier
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        Self::validate(name)?;
        Ok(Self(name.to_string()))
    }

    /// Validate a possibly schema-qualified name (`dbo.Users`), part by part
    pub fn new_qualified(name: &str) -> Result<Self, ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::Empty);
        }
        for part in name.split('.') {
            if part.is_empty() {
                return Err(ValidationError::EmptyPart(name.to_string()));
            }
            Self::validate(part)?;
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    fn validate(name: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::Empty);
        }

        let length = name.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(ValidationError::TooLong {
                name: name.to_string(),
                length,
                max_length: Self::MAX_LENGTH,
            });
        }

        if name.chars().any(char::is_control) {
            return Err(ValidationError::InvalidCharacters(name.to_string()));
        }

        Ok(())
    }
}

impl fmt::Display for ValidatedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a required identifier, reporting emptiness as an argument error
/// naming `what` (e.g. "table name")
pub(crate) fn require_identifier(what: &str, name: &str) -> Result<String, QueryError> {
    match ValidatedIdentifier::new(name) {
        Ok(valid) => Ok(valid.into_string()),
        Err(ValidationError::Empty) => Err(QueryError::invalid(format!("{} cannot be empty", what))),
        Err(e) => Err(e.into()),
    }
}

/// Same as [`require_identifier`] for dotted names
pub(crate) fn require_qualified(what: &str, name: &str) -> Result<String, QueryError> {
    match ValidatedIdentifier::new_qualified(name) {
        Ok(valid) => Ok(valid.into_string()),
        Err(ValidationError::Empty) => Err(QueryError::invalid(format!("{} cannot be empty", what))),
        Err(e) => Err(e.into()),
    }
}
