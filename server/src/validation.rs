//! Input validation shared by handlers and services.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;
use zxcvbn::{zxcvbn, Score};

use crate::error::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Cap hashing work; Argon2id over unbounded input is a DoS vector.
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MIN_PASSWORD_SCORE: Score = Score::Two;

pub const MAX_REFERENCE_LENGTH: usize = 100;

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_\-\.]+$").expect("static regex"))
}

/// Merchant references: non-empty, bounded, and limited to the safe
/// identifier alphabet.
pub fn validate_reference(reference: &str) -> Result<(), ApiError> {
    if reference.is_empty() {
        return Err(ApiError::Validation("reference_id must not be empty".into()));
    }
    if reference.len() > MAX_REFERENCE_LENGTH {
        return Err(ApiError::Validation(format!(
            "reference_id must not exceed {MAX_REFERENCE_LENGTH} characters"
        )));
    }
    if !reference_re().is_match(reference) {
        return Err(ApiError::Validation(
            "reference_id may only contain letters, digits, '_', '-' and '.'".into(),
        ));
    }
    Ok(())
}

/// ISO-4217-shaped currency code: exactly three ASCII uppercase letters.
pub fn validate_currency(currency: &str) -> Result<(), ApiError> {
    if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ApiError::Validation(
            "currency must be a 3-letter uppercase code".into(),
        ));
    }
    Ok(())
}

/// Webhook endpoints must be absolute http(s) URLs.
pub fn validate_webhook_url(raw: &str) -> Result<(), ApiError> {
    let url =
        Url::parse(raw).map_err(|_| ApiError::Validation("webhook_url is not a valid URL".into()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ApiError::Validation(format!(
            "webhook_url scheme '{other}' is not allowed"
        ))),
    }
}

/// Length bounds plus a zxcvbn strength gate. `user_inputs` (username,
/// merchant name) are penalized when reused in the password.
pub fn validate_password(password: &str, user_inputs: &[&str]) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "password cannot exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    let entropy = zxcvbn(password, user_inputs);
    if entropy.score() < MIN_PASSWORD_SCORE {
        return Err(ApiError::Validation(
            "password is too weak; add length, numbers or symbols".into(),
        ));
    }
    Ok(())
}

/// Usernames share the reference alphabet with tighter length bounds.
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < 3 || username.len() > 50 {
        return Err(ApiError::Validation(
            "username must be between 3 and 50 characters".into(),
        ));
    }
    if !reference_re().is_match(username) {
        return Err(ApiError::Validation(
            "username may only contain letters, digits, '_', '-' and '.'".into(),
        ));
    }
    Ok(())
}
