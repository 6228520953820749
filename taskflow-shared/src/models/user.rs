//! User model
//!
//! Users are created by the external identity service; TaskFlow only
//! references them. A user can own projects, hold memberships, be assigned
//! tasks and author comments.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     email VARCHAR(255) NOT NULL UNIQUE,
//!     display_name VARCHAR(255) NOT NULL DEFAULT '',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account known to TaskFlow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address, unique across all users
    pub email: String,

    /// Name shown in the UI
    pub display_name: String,

    /// When the user was first seen
    pub created_at: DateTime<Utc>,
}

/// Input for registering a user record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address
    pub email: String,

    /// Display name
    pub display_name: String,
}

impl CreateUser {
    /// Builds an input with the email normalized to lowercase
    pub fn new(email: impl AsRef<str>, display_name: impl Into<String>) -> Self {
        Self {
            email: normalize_email(email.as_ref()),
            display_name: display_name.into(),
        }
    }
}

/// Lowercases and trims an email for lookups and uniqueness checks
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_create_user_normalizes() {
        let input = CreateUser::new("Bob@Example.com", "Bob");
        assert_eq!(input.email, "bob@example.com");
        assert_eq!(input.display_name, "Bob");
    }
}
