use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Alias '{alias}' is already used in this source")]
    AliasConflict { alias: String },

    #[error("Unsupported construct: {0}")]
    Unsupported(String),

    #[error("Configuration not found: {0}")]
    ConfigurationNotFound(String),

    #[error("Invalid identifier: {0}")]
    Validation(#[from] ValidationError),

    #[error("Registry error: {0}")]
    Registry(String),
}

impl QueryError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        QueryError::InvalidArgument(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        QueryError::Unsupported(message.into())
    }

    pub(crate) fn entity_not_found(entity: &str) -> Self {
        QueryError::ConfigurationNotFound(format!("entity '{}'", entity))
    }

    pub(crate) fn property_not_found(entity: &str, property: &str) -> Self {
        QueryError::ConfigurationNotFound(format!("property '{}' on entity '{}'", property, entity))
    }
}
