//! Field rules for registration submissions.
//!
//! Validation never fails with an error: every rule runs and the outcome is
//! either a [`NewUser`] or the full list of field failures.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::users::{dto::RegisterRequest, repo_types::NewUser};

const MIN_NAME_LENGTH: usize = 2;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    TooShort,
    InvalidChars,
    InvalidFormat,
    WeakPassword,
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    #[serde(skip)]
    pub kind: FieldErrorKind,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    fn push(&mut self, field: &'static str, kind: FieldErrorKind, message: &'static str) {
        self.0.push(FieldError {
            field,
            kind,
            message,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    #[cfg(test)]
    pub fn has(&self, field: &str, kind: FieldErrorKind) -> bool {
        self.0.iter().any(|e| e.field == field && e.kind == kind)
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        // domain: dot-separated labels, no empty or hyphen-edged label, alphabetic TLD
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[^@\s]+@(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$"
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_name(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    too_short: &'static str,
    invalid: &'static str,
) {
    if value.chars().count() < MIN_NAME_LENGTH {
        errors.push(field, FieldErrorKind::TooShort, too_short);
    }
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == ' ' || c == '-');
    let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
    if !allowed || !has_letter {
        errors.push(field, FieldErrorKind::InvalidChars, invalid);
    }
}

fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(
            "password",
            FieldErrorKind::TooShort,
            "Password must be at least 6 characters long",
        );
    }
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if !(lower && upper && digit) {
        errors.push(
            "password",
            FieldErrorKind::WeakPassword,
            "Password must contain uppercase, lowercase, and number",
        );
    }
}

/// Checks every field of `req`, in field order, and normalizes the result.
pub fn validate(req: &RegisterRequest) -> Result<NewUser, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let first_name = req.first_name.as_deref().unwrap_or_default().trim();
    check_name(
        &mut errors,
        "firstName",
        first_name,
        "First name must be at least 2 characters long",
        "First name can only contain letters",
    );

    let last_name = req.last_name.as_deref().unwrap_or_default().trim();
    check_name(
        &mut errors,
        "lastName",
        last_name,
        "Last name must be at least 2 characters long",
        "Last name can only contain letters",
    );

    let email = req.email.as_deref().unwrap_or_default().trim();
    if !is_valid_email(email) {
        errors.push(
            "email",
            FieldErrorKind::InvalidFormat,
            "Please enter a valid email address",
        );
    }

    let password = req.password.as_deref().unwrap_or_default();
    check_password(&mut errors, password);

    // compared against the raw password, before any trimming
    let confirm = req.confirm_password.as_deref().unwrap_or_default();
    if confirm != password {
        errors.push(
            "confirmPassword",
            FieldErrorKind::Mismatch,
            "Passwords do not match",
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewUser {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_lowercase(),
        password: password.to_string(),
    })
}
