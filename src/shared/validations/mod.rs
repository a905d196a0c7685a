//! Client-side input validation
//!
//! Forms are checked with `validator` before any network call. Failures are
//! flattened into one `field: message` string for the UI.

use serde::Serialize;
use validator::{Validate, ValidationErrors};

use crate::shared::types::errors::{ClientError, ClientResult};

#[derive(Clone, Serialize, Validate)]
pub struct LoginForm {
    #[validate(
        length(min = 1, max = 254, message = "email is required"),
        email(message = "invalid email format")
    )]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "password is required"))]
    pub password: String,
}

impl LoginForm {
    /// Trim and normalize, then validate.
    pub fn new(email: &str, password: &str) -> ClientResult<Self> {
        let form = Self {
            email: sanitize_input(email).to_lowercase(),
            password: password.to_string(),
        };
        form.validate().map_err(validation_error)?;
        Ok(form)
    }
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Serialize, Validate)]
pub struct ChangePasswordForm {
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "new password must be 8–128 characters"
    ))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "passwords do not match"))]
    pub confirm_password: String,
}

impl ChangePasswordForm {
    pub fn new(current: &str, new: &str, confirm: &str) -> ClientResult<Self> {
        let form = Self {
            current_password: current.to_string(),
            new_password: new.to_string(),
            confirm_password: confirm.to_string(),
        };
        form.validate().map_err(validation_error)?;
        if form.new_password == form.current_password {
            return Err(ClientError::Validation(
                "new_password: must differ from the current password".to_string(),
            ));
        }
        Ok(form)
    }
}

impl std::fmt::Debug for ChangePasswordForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChangePasswordForm { .. }")
    }
}

/// Trim surrounding whitespace and drop control characters.
pub fn sanitize_input(raw: &str) -> String {
    raw.trim().chars().filter(|c| !c.is_control()).collect()
}

pub fn validation_error(errors: ValidationErrors) -> ClientError {
    let mut field_errors: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, msg)
            })
        })
        .collect();
    field_errors.sort();

    let message = if field_errors.is_empty() {
        "Validation failed".to_string()
    } else {
        field_errors.join("; ")
    };
    ClientError::Validation(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_form_normalizes_email() {
        let form = LoginForm::new("  Ops@Rail.CL \n", "secret").unwrap();
        assert_eq!(form.email, "ops@rail.cl");
    }

    #[test]
    fn login_form_rejects_empty_fields() {
        let err = LoginForm::new("", "").unwrap_err();
        match err {
            ClientError::Validation(msg) => {
                assert!(msg.contains("email"));
                assert!(msg.contains("password is required"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn login_form_rejects_malformed_email() {
        let err = LoginForm::new("not-an-email", "secret").unwrap_err();
        assert_eq!(
            err,
            ClientError::Validation("email: invalid email format".to_string())
        );
    }

    #[test]
    fn debug_hides_password() {
        let form = LoginForm::new("ops@rail.cl", "hunter22").unwrap();
        let rendered = format!("{:?}", form);
        assert!(!rendered.contains("hunter22"));
    }

    #[test]
    fn change_password_rules() {
        assert!(ChangePasswordForm::new("old-pass", "new-pass-1", "new-pass-1").is_ok());

        let mismatch = ChangePasswordForm::new("old-pass", "new-pass-1", "new-pass-2");
        assert!(matches!(mismatch, Err(ClientError::Validation(m)) if m.contains("do not match")));

        let short = ChangePasswordForm::new("old-pass", "short", "short");
        assert!(matches!(short, Err(ClientError::Validation(m)) if m.contains("8–128")));

        let same = ChangePasswordForm::new("same-pass-1", "same-pass-1", "same-pass-1");
        assert!(matches!(same, Err(ClientError::Validation(m)) if m.contains("must differ")));
    }

    #[test]
    fn sanitize_strips_control_characters() {
        assert_eq!(sanitize_input("\tadmin\u{0007}@rail.cl "), "admin@rail.cl");
    }
}
