use chrono::{DateTime, Utc};

use super::error::UserError;
use super::types::{User, UserCreate, UserUpdate};

const MAX_EMAIL_LEN: usize = 255;
const MAX_NAME_LEN: usize = 100;
const MAX_BIO_LEN: usize = 500;

/// Checks that `email` looks like `local@domain.tld`.
///
/// This is a shape check, not RFC 5322 parsing.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn validate_email(email: &str) -> Result<(), UserError> {
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(UserError::EmailTooLong);
    }
    if !is_valid_email(email) {
        return Err(UserError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), UserError> {
    if name.trim().is_empty() {
        return Err(UserError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(UserError::NameTooLong);
    }
    Ok(())
}

fn validate_bio(bio: &str) -> Result<(), UserError> {
    if bio.chars().count() > MAX_BIO_LEN {
        return Err(UserError::BioTooLong);
    }
    Ok(())
}

/// Validates a user before creation.
pub fn validate_user_create(input: &UserCreate) -> Result<(), UserError> {
    validate_email(&input.email)?;
    validate_name(&input.name)?;
    if let Some(bio) = &input.bio {
        validate_bio(bio)?;
    }
    Ok(())
}

/// Validates the present fields of an update.
pub fn validate_user_update(input: &UserUpdate) -> Result<(), UserError> {
    if let Some(email) = &input.email {
        validate_email(email)?;
    }
    if let Some(name) = &input.name {
        validate_name(name)?;
    }
    if let Some(bio) = &input.bio {
        validate_bio(bio)?;
    }
    Ok(())
}

/// Applies the present fields of `update` and bumps `updated_at`.
pub fn apply_user_update(user: &mut User, update: &UserUpdate, now: DateTime<Utc>) {
    if let Some(email) = &update.email {
        user.email = email.clone();
    }
    if let Some(name) = &update.name {
        user.name = name.clone();
    }
    if let Some(bio) = &update.bio {
        user.bio = Some(bio.clone());
    }
    if let Some(is_active) = update.is_active {
        user.is_active = is_active;
    }
    user.updated_at = now;
}
