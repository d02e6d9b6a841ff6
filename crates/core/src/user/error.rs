use thiserror::Error;

/// Errors that can occur when validating user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Email too long (max 255 characters)")]
    EmailTooLong,
    #[error("User name cannot be empty")]
    EmptyName,
    #[error("User name too long (max 100 characters)")]
    NameTooLong,
    #[error("Bio too long (max 500 characters)")]
    BioTooLong,
}
