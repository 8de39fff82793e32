//! User accounts for staff sign-in and role assignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Entity, UserId, patch};

use crate::password::{MIN_PASSWORD_LEN, hash_password};
use crate::Role;

/// Role assigned when a create request names none.
pub const DEFAULT_ROLE: Role = Role::Staff;

/// Trim and lowercase an email address.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// Stored user account.
///
/// # Invariants
/// - `email` is trimmed and lowercase (unique across users).
/// - `password_hash` is a PHC string, never a plaintext password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

impl User {
    /// Public view of the account (no password hash).
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// User as exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a user account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl NewUser {
    /// Validate the request and build the account with a hashed password.
    pub fn into_user(self, now: DateTime<Utc>) -> DomainResult<User> {
        let email = normalize_email(&self.email);
        if email.is_empty() || self.password.is_empty() {
            return Err(DomainError::validation("Email and password required"));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(User {
            id: UserId::new(),
            email,
            password_hash: hash_password(&self.password)?,
            name: self.name.filter(|n| !n.trim().is_empty()),
            role: self.role.unwrap_or(DEFAULT_ROLE),
            is_active: true,
            created_at: now,
        })
    }
}

/// Partial update of a user account.
///
/// `name` distinguishes absent (unchanged) from explicit `null` (cleared).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default, deserialize_with = "patch::explicit")]
    pub name: Option<Option<String>>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserUpdate {
    /// Apply the patch to `user`, re-hashing a new password if one is given.
    pub fn apply_to(self, user: &mut User) -> DomainResult<()> {
        let password_hash = match self.password.as_deref() {
            Some(p) if p.len() < MIN_PASSWORD_LEN => {
                return Err(DomainError::validation(format!(
                    "password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            Some(p) => Some(hash_password(p)?),
            None => None,
        };

        patch::apply(&mut user.name, self.name);
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: password.to_string(),
            name: None,
            role: None,
        }
    }

    #[test]
    fn create_normalizes_email_and_defaults_to_staff() {
        let user = new_user("  Admin@School.Local ", "secret1")
            .into_user(Utc::now())
            .unwrap();
        assert_eq!(user.email, "admin@school.local");
        assert_eq!(user.role, Role::Staff);
        assert!(user.is_active);
        assert!(verify_password("secret1", &user.password_hash));
    }

    #[test]
    fn create_requires_email_and_password() {
        assert!(matches!(
            new_user("   ", "secret1").into_user(Utc::now()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            new_user("a@b.c", "").into_user(Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn update_distinguishes_absent_from_null_name() {
        let mut user = NewUser {
            name: Some("Sales Staff".to_string()),
            ..new_user("staff@school.local", "staff123")
        }
        .into_user(Utc::now())
        .unwrap();

        let untouched: UserUpdate = serde_json::from_str(r#"{"role":"MANAGER"}"#).unwrap();
        untouched.apply_to(&mut user).unwrap();
        assert_eq!(user.name.as_deref(), Some("Sales Staff"));
        assert_eq!(user.role, Role::Manager);

        let cleared: UserUpdate = serde_json::from_str(r#"{"name":null}"#).unwrap();
        cleared.apply_to(&mut user).unwrap();
        assert_eq!(user.name, None);
    }

    #[test]
    fn update_rejects_short_password_without_changing_anything() {
        let mut user = new_user("a@b.c", "secret1").into_user(Utc::now()).unwrap();
        let before = user.clone();

        let update = UserUpdate {
            is_active: Some(false),
            password: Some("123".to_string()),
            ..Default::default()
        };
        assert!(update.apply_to(&mut user).is_err());
        assert_eq!(user, before);
    }
}
