//! Login and password-recovery form rules.

use crate::database::Database;
use crate::error::Result;
use std::fmt;

/// Minimum password length, after trimming.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Domain every staff address must belong to.
pub const CORPORATE_DOMAIN: &str = "@swift.com";

/// Form field an error is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    InvalidEmail,
    NotCorporateEmail,
    TooShort { min: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub kind: FieldErrorKind,
}

impl FieldError {
    fn new(field: Field, kind: FieldErrorKind) -> Self {
        Self { field, kind }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.field, self.kind) {
            (Field::Email, FieldErrorKind::Required) => f.write_str("Email is required"),
            (Field::Password, FieldErrorKind::Required) => f.write_str("Password is required"),
            (_, FieldErrorKind::InvalidEmail) => f.write_str("Please enter a valid email"),
            (_, FieldErrorKind::NotCorporateEmail) => {
                write!(f, "Please use a corporate address ({CORPORATE_DOMAIN})")
            }
            (_, FieldErrorKind::TooShort { min }) => {
                write!(f, "Password must have at least {min} characters")
            }
        }
    }
}

/// Trimmed credentials that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the
/// domain with text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

pub fn is_corporate_email(email: &str) -> bool {
    email.to_lowercase().ends_with(CORPORATE_DOMAIN)
}

fn check_email(email: &str) -> Option<FieldError> {
    if email.is_empty() {
        Some(FieldError::new(Field::Email, FieldErrorKind::Required))
    } else if !is_valid_email(email) {
        Some(FieldError::new(Field::Email, FieldErrorKind::InvalidEmail))
    } else {
        None
    }
}

/// Validate the login form. Every failing field is reported.
pub fn validate_login(email: &str, password: &str) -> std::result::Result<Credentials, Vec<FieldError>> {
    let email = email.trim();
    let password = password.trim();
    let mut errors = Vec::new();

    if let Some(error) = check_email(email) {
        errors.push(error);
    }

    if password.is_empty() {
        errors.push(FieldError::new(Field::Password, FieldErrorKind::Required));
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            Field::Password,
            FieldErrorKind::TooShort {
                min: MIN_PASSWORD_LEN,
            },
        ));
    }

    if errors.is_empty() {
        Ok(Credentials {
            email: email.to_string(),
            password: password.to_string(),
        })
    } else {
        Err(errors)
    }
}

/// Validate the password-recovery form: a well-formed corporate address.
pub fn validate_recovery_email(email: &str) -> std::result::Result<String, FieldError> {
    let email = email.trim();

    if let Some(error) = check_email(email) {
        return Err(error);
    }
    if !is_corporate_email(email) {
        return Err(FieldError::new(Field::Email, FieldErrorKind::NotCorporateEmail));
    }

    Ok(email.to_string())
}

/// Outcome of a password-recovery request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Instructions would be sent to this address.
    Sent(String),

    /// No active user has this address.
    UnknownEmail,

    Invalid(FieldError),
}

/// Validate a recovery request and check the address against active users.
pub fn request_password_reset(db: &Database, email: &str) -> Result<RecoveryOutcome> {
    let email = match validate_recovery_email(email) {
        Ok(email) => email,
        Err(error) => return Ok(RecoveryOutcome::Invalid(error)),
    };

    if db.email_registered(&email)? {
        Ok(RecoveryOutcome::Sent(email))
    } else {
        Ok(RecoveryOutcome::UnknownEmail)
    }
}
