//! Input validation for API requests.
//!
//! This module provides validation functions for API request data,
//! ensuring all inputs meet the required format and constraints.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating email addresses (pragmatic, not RFC 5322)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a password
///
/// No strength policy is enforced; only presence and a sanity cap on
/// length before the hash is computed.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() > 1024 {
        return Err("Password is too long (max 1024 characters)".to_string());
    }

    Ok(())
}

/// Validate a person name field (first or last name)
pub fn validate_name(name: &str, field_name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if name.len() > 100 {
        return Err(format!("{} is too long (max 100 characters)", field_name));
    }

    Ok(())
}

/// Validate a todo task description
pub fn validate_task(task: &str) -> Result<(), String> {
    if task.trim().is_empty() {
        return Err("Task is required".to_string());
    }

    if task.len() > 500 {
        return Err("Task is too long (max 500 characters)".to_string());
    }

    Ok(())
}
