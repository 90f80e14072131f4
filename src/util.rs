//! Extra utilties for use elsewhere in the API.

use std::sync::OnceLock;

use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::error::{NausError, NausResult};

pub const TEMPORARY_PASSWORD_LENGTH: usize = 12;
pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn current_time() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// A random password that is easy to type: letters and digits only.
pub fn temporary_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMPORARY_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// 32 random bytes, hex-encoded. Only ever emailed, never stored.
pub fn generate_reset_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// The one-way digest of a reset token that is kept in the database.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn validate_email(field: &str, email: &str) -> NausResult<()> {
    if email.trim().is_empty() {
        Err(NausError::validation(field, format!("{} is required", field)))
    } else if !email_regex().is_match(email.trim()) {
        Err(NausError::validation(field, "Invalid email format"))
    } else {
        Ok(())
    }
}

/// Fails if the value is empty after trimming.
pub fn require(field: &str, value: &str) -> NausResult<()> {
    if value.trim().is_empty() {
        Err(NausError::validation(field, format!("{} is required", field)))
    } else {
        Ok(())
    }
}

pub fn require_opt(field: &str, value: Option<&str>) -> NausResult<()> {
    require(field, value.unwrap_or_default())
}

pub fn validate_password(field: &str, password: &str) -> NausResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        Err(NausError::validation(
            field,
            format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ),
        ))
    } else {
        Ok(())
    }
}

/// Treats blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

pub fn page_count(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}
