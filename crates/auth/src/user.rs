//! User records and registration input validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroute_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

const MAX_USERNAME_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 100;

/// A registered user.
///
/// # Invariants
/// - `username` and `email` are each unique across users (enforced by the store).
/// - `password_hash` is never the plain credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// Hand-written so the credential hash never reaches logs.
impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Registration input, before hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> DomainResult<()> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(DomainError::validation(format!(
                "username cannot exceed {MAX_USERNAME_LEN} characters"
            )));
        }

        let email = self.email.trim();
        if !email.contains('@') {
            return Err(DomainError::validation("email must contain '@'"));
        }
        if email.chars().count() > MAX_EMAIL_LEN {
            return Err(DomainError::validation(format!(
                "email cannot exceed {MAX_EMAIL_LEN} characters"
            )));
        }

        if self.password.is_empty() {
            return Err(DomainError::validation("password cannot be empty"));
        }
        Ok(())
    }

    /// Build the stored record once the password has been hashed.
    pub fn into_user(self, password_hash: String, created_at: DateTime<Utc>) -> User {
        User {
            id: UserId::new(),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password_hash,
            role: self.role,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            username: "  maria ".to_string(),
            email: "maria@example.com".to_string(),
            password: "pw".to_string(),
            role: Role::WarehouseStaff,
        }
    }

    #[test]
    fn valid_registration_is_trimmed_into_a_user() {
        let input = new_user();
        input.validate().unwrap();

        let user = input.into_user("$argon2id$fake".to_string(), Utc::now());
        assert_eq!(user.username, "maria");
        assert_eq!(user.role, Role::WarehouseStaff);
    }

    #[test]
    fn rejects_blank_username() {
        let input = NewUser {
            username: "   ".to_string(),
            ..new_user()
        };
        assert!(matches!(input.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn rejects_email_without_at_sign() {
        let input = NewUser {
            email: "maria.example.com".to_string(),
            ..new_user()
        };
        assert!(matches!(input.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn username_limit_counts_characters_not_bytes() {
        let at_limit = NewUser {
            username: "ß".repeat(MAX_USERNAME_LEN),
            ..new_user()
        };
        at_limit.validate().unwrap();

        let over = NewUser {
            username: "ß".repeat(MAX_USERNAME_LEN + 1),
            ..new_user()
        };
        assert!(matches!(over.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn debug_output_omits_password_hash() {
        let user = new_user().into_user("$argon2id$secret-material".to_string(), Utc::now());
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("secret-material"));
        assert!(rendered.contains("maria"));
    }
}
