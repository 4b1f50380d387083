use std::fmt;

use zeroize::Zeroizing;

use crate::domain::rbac::{
    NewPermission, NewRole, PermissionPatch, RolePatch,
};
use crate::domain::users::UserPatch;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 20;
pub const TEXT_MAX_LEN: usize = 255;
pub const RESOURCE_MAX_LEN: usize = 100;
pub const ACTION_MAX_LEN: usize = 50;

/// Errors raised for malformed input before it reaches a store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password too short: minimum 8 characters required")]
    PasswordTooShort,

    #[error("Password too long: maximum 20 characters allowed")]
    PasswordTooLong,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{field} too long: maximum {max} characters allowed")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Invalid capability '{0}': expected resource:action")]
    InvalidCapability(String),
}

/// Email value object: trimmed, lower-cased, `local@domain.tld`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let email = value.as_ref().trim().to_lowercase();

        if email.is_empty() {
            return Err(ValidationError::EmptyField("email"));
        }

        if email.chars().count() > TEXT_MAX_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "email",
                max: TEXT_MAX_LEN,
            });
        }

        let (local, domain) =
            email.split_once('@').ok_or(ValidationError::InvalidEmail)?;

        let domain_ok = !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains("..");

        if local.is_empty()
            || !domain_ok
            || email.chars().any(char::is_whitespace)
        {
            return Err(ValidationError::InvalidEmail);
        }

        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plaintext password within the accepted length bounds.
///
/// The buffer is zeroed on drop and `Debug` never prints it.
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = Zeroizing::new(value.into());
        let len = value.chars().count();

        if len < PASSWORD_MIN_LEN {
            return Err(ValidationError::PasswordTooShort);
        }

        if len > PASSWORD_MAX_LEN {
            return Err(ValidationError::PasswordTooLong);
        }

        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(**redacted**)")
    }
}

/// Validated registration payload
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: Password,
}

impl Registration {
    pub fn parse(
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", name, TEXT_MAX_LEN)?,
            email: Email::parse(email)?,
            password: Password::new(password)?,
        })
    }
}

/// Trim and bound a required text field.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }

    Ok(value.to_string())
}

fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    value.map(|v| required_text(field, v, max)).transpose()
}

fn description(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.chars().count() > TEXT_MAX_LEN {
        return Err(ValidationError::FieldTooLong {
            field: "description",
            max: TEXT_MAX_LEN,
        });
    }
    Ok(value.to_string())
}

impl UserPatch {
    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: optional_text("name", self.name.as_deref(), TEXT_MAX_LEN)?,
            email: self
                .email
                .as_deref()
                .map(Email::parse)
                .transpose()?
                .map(Email::into_string),
        })
    }
}

impl NewRole {
    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", &self.name, TEXT_MAX_LEN)?,
            description: description(&self.description)?,
        })
    }
}

impl RolePatch {
    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: optional_text("name", self.name.as_deref(), TEXT_MAX_LEN)?,
            description: self
                .description
                .as_deref()
                .map(description)
                .transpose()?,
        })
    }
}

impl NewPermission {
    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", &self.name, TEXT_MAX_LEN)?,
            description: description(&self.description)?,
            resource: required_text(
                "resource",
                &self.resource,
                RESOURCE_MAX_LEN,
            )?,
            action: required_text("action", &self.action, ACTION_MAX_LEN)?,
        })
    }
}

impl PermissionPatch {
    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: optional_text("name", self.name.as_deref(), TEXT_MAX_LEN)?,
            description: self
                .description
                .as_deref()
                .map(description)
                .transpose()?,
            resource: optional_text(
                "resource",
                self.resource.as_deref(),
                RESOURCE_MAX_LEN,
            )?,
            action: optional_text(
                "action",
                self.action.as_deref(),
                ACTION_MAX_LEN,
            )?,
        })
    }
}
