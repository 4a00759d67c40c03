use validator::{Validate, ValidateEmail};

use super::types::SignupFields;
use crate::error::{ApiError, Result};

/// Client-side gate before the signup request is sent. Failures surface as
/// field errors, the same shape the backend uses.
pub fn validate_signup(fields: &SignupFields) -> Result<()> {
    if let Err(errors) = fields.validate() {
        // Fixed field order; the derive's map has no stable iteration order.
        for field in ["email", "password"] {
            if let Some(err) = errors
                .field_errors()
                .get(field)
                .and_then(|errs| errs.first())
            {
                return Err(ApiError::Field {
                    field: field.to_string(),
                    message: err
                        .message
                        .as_deref()
                        .unwrap_or("Invalid value")
                        .to_string(),
                });
            }
        }
    }

    validate_password(&fields.password)?;

    if fields.confirm_password != fields.password {
        return Err(ApiError::Field {
            field: "confirm_password".to_string(),
            message: "Passwords do not match".to_string(),
        });
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if !email.validate_email() {
        return Err(ApiError::Field {
            field: "email".to_string(),
            message: "Enter a valid email address".to_string(),
        });
    }
    Ok(())
}

/// Composition rules on top of the minimum length.
pub fn validate_password(password: &str) -> Result<()> {
    let rules: [(&str, fn(char) -> bool); 3] = [
        ("Password must contain at least one lowercase letter", |c| {
            c.is_ascii_lowercase()
        }),
        ("Password must contain at least one uppercase letter", |c| {
            c.is_ascii_uppercase()
        }),
        ("Password must contain at least one number", |c| {
            c.is_ascii_digit()
        }),
    ];

    for (message, test) in rules {
        if !password.chars().any(test) {
            return Err(ApiError::Field {
                field: "password".to_string(),
                message: message.to_string(),
            });
        }
    }

    Ok(())
}
