use thiserror::Error;

/// Business-rule violations raised while building or changing entities
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// One or more field validators failed; messages are kept in field order
    #[error("{}", .0.join(". "))]
    Validation(Vec<String>),

    /// A value could not be read as the type its field requires
    #[error("Invalid {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Invalid query field: {0}")]
    UnknownField(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(vec![message.into()])
    }

    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        DomainError::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Turns collected validator messages into a result
    pub fn check(messages: Vec<String>) -> Result<(), DomainError> {
        if messages.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(messages))
        }
    }
}
