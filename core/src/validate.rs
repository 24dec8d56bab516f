//! Client-side form checks run before any request is sent. They shape user
//! input; they are not a security boundary.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    /// Something@something.tld, no whitespace.
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();

    static ref IMAGE_DATA_URI: Regex =
        Regex::new(r"^data:image/[A-Za-z0-9.+-]+;base64,[A-Za-z0-9+/=\r\n]+$").unwrap();
}

pub fn name(value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation("name", "Full Name is required"));
    }
    Ok(())
}

pub fn email(value: &str) -> Result<(), ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation("email", "Email is required"));
    }
    if !EMAIL.is_match(value) {
        return Err(ApiError::validation("email", "email must be a valid email"));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::validation("password", "Password is required"));
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn registration(name_value: &str, email_value: &str, password_value: &str) -> Result<(), ApiError> {
    name(name_value)?;
    email(email_value)?;
    password(password_value)
}

pub fn login(email_value: &str, password_value: &str) -> Result<(), ApiError> {
    email(email_value)?;
    if password_value.is_empty() {
        return Err(ApiError::validation("password", "Password is required"));
    }
    Ok(())
}

/// The image must already be a base64 data URI; no encoding happens here.
pub fn image_data_uri(value: &str) -> Result<(), ApiError> {
    if !IMAGE_DATA_URI.is_match(value) {
        return Err(ApiError::validation(
            "image",
            "expected a data:image/...;base64, URI",
        ));
    }
    Ok(())
}
