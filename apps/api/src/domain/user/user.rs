use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{Email, Role};
use crate::domain::entity::{Entity, Field, FieldKind};
use crate::domain::errors::DomainError;

pub const DEFAULT_PHOTO: &str = "default.jpg";
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Lifetime of an emailed password reset token
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// User account
///
/// Credentials and reset state are never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub photo: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_changed_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates an active `user`-role account from validated signup data
    pub fn register(registration: &Registration, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: registration.name.clone(),
            email: registration.email.clone(),
            role: Role::User,
            photo: DEFAULT_PHOTO.to_string(),
            password_hash,
            password_changed_at: now,
            password_reset_token: None,
            password_reset_expires: None,
            active: true,
            created_at: now,
        }
    }

    /// True if the password changed after a token issued at `issued_at` (unix seconds)
    pub fn changed_password_after(&self, issued_at: i64) -> bool {
        issued_at < self.password_changed_at.timestamp()
    }

    /// Stores the digest of a freshly issued reset token
    pub fn start_password_reset(&mut self, token_digest: String, now: DateTime<Utc>) {
        self.password_reset_token = Some(token_digest);
        self.password_reset_expires = Some(now + Duration::minutes(RESET_TOKEN_TTL_MINUTES));
    }

    pub fn clear_password_reset(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
    }

    pub fn reset_token_valid(&self, token_digest: &str, now: DateTime<Utc>) -> bool {
        self.password_reset_token.as_deref() == Some(token_digest)
            && self.password_reset_expires.map_or(false, |expires| expires > now)
    }

    /// Replaces the password hash
    ///
    /// The change timestamp is backdated one second so a token issued right
    /// after this call is still accepted.
    pub fn set_password(&mut self, password_hash: String, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.password_changed_at = now - Duration::seconds(1);
        self.clear_password_reset();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            photo: self.photo.clone(),
            role: self.role,
        }
    }

    pub fn author(&self) -> ReviewAuthor {
        ReviewAuthor {
            id: self.id,
            name: self.name.clone(),
            photo: self.photo.clone(),
        }
    }
}

const USER_FIELDS: &[Field] = &[
    Field::new("name", FieldKind::Text),
    Field::new("email", FieldKind::Text),
    Field::new("role", FieldKind::Text),
    Field::new("photo", FieldKind::Text),
    Field::new("createdAt", FieldKind::Timestamp),
];

impl Entity for User {
    type Patch = UserPatch;

    const NAME: &'static str = "user";
    const FIELDS: &'static [Field] = USER_FIELDS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, patch: UserPatch) -> Result<(), DomainError> {
        let mut messages = Vec::new();

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                messages.push("Please tell us your name".to_string());
            } else {
                self.name = name;
            }
        }

        if let Some(email) = patch.email {
            match Email::new(email) {
                Ok(email) => self.email = email,
                Err(message) => messages.push(message),
            }
        }

        if let Some(role) = patch.role {
            self.role = role;
        }

        if let Some(photo) = patch.photo {
            self.photo = photo;
        }

        DomainError::check(messages)
    }
}

/// Profile changes; passwords are changed only through dedicated flows
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub photo: Option<String>,
}

/// Signup request body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

/// Signup data that passed every validator
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: String,
}

impl NewUser {
    pub fn validate(self) -> Result<Registration, DomainError> {
        let mut messages = Vec::new();

        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            messages.push("Please tell us your name".to_string());
        }

        let email = match self.email.filter(|e| !e.trim().is_empty()) {
            None => {
                messages.push("Please tell us your email".to_string());
                None
            }
            Some(raw) => match Email::new(raw) {
                Ok(email) => Some(email),
                Err(message) => {
                    messages.push(message);
                    None
                }
            },
        };

        messages.extend(password_messages(
            self.password.as_deref(),
            self.password_confirm.as_deref(),
        ));

        match (email, self.password) {
            (Some(email), Some(password)) if messages.is_empty() => Ok(Registration {
                name,
                email,
                password,
            }),
            _ => Err(DomainError::Validation(messages)),
        }
    }
}

/// Validator messages for a new password and its confirmation
pub fn password_messages(password: Option<&str>, confirm: Option<&str>) -> Vec<String> {
    let mut messages = Vec::new();
    match password {
        None | Some("") => messages.push("Please enter a password".to_string()),
        Some(p) if p.chars().count() < MIN_PASSWORD_LENGTH => messages.push(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )),
        Some(_) => {}
    }
    match confirm {
        None | Some("") => messages.push("Please confirm your password".to_string()),
        Some(c) if Some(c) != password => messages.push("Password does not match".to_string()),
        Some(_) => {}
    }
    messages
}

/// Public guide card embedded in tour documents
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Email,
    pub photo: String,
    pub role: Role,
}

/// Author shown next to a review
#[derive(Debug, Clone, Serialize)]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub name: String,
    pub photo: String,
}
