//! Validation Utilities

use validator::{Validate, ValidationErrors};

use super::error::{AppError, FieldError};

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    field_errors.sort_by(|a, b| a.field.cmp(&b.field));

    let message = field_errors
        .first()
        .map(|e| format!("{}: {}", e.field, e.message))
        .unwrap_or_else(|| "Validation failed".into());

    AppError::Validation {
        message,
        errors: field_errors,
    }
}

/// Validate a request body, mapping failures to `AppError::Validation`.
pub fn validate<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate().map_err(validation_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Signup {
        #[validate(email(message = "Invalid email format"))]
        email: String,
        #[validate(length(min = 2, message = "Too short"))]
        name: String,
    }

    #[test]
    fn collects_every_field_error() {
        let signup = Signup {
            email: "nope".into(),
            name: "x".into(),
        };
        match validate(&signup) {
            Err(AppError::Validation { message, errors }) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(message, "email: Invalid email format");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_body_passes() {
        let signup = Signup {
            email: "a@b.co".into(),
            name: "Ann".into(),
        };
        assert!(validate(&signup).is_ok());
    }
}
