//! User records
//!
//! Accounts are owned by the identity service. TaskFlow keeps a local row
//! per user so projects, tasks and comments can reference it.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::user::{normalize_email, CreateUser, User};
use crate::store::StoreTx;

/// Inserts a local user record
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for an empty email and
/// [`CoreError::Conflict`] if the email is already registered.
pub async fn register_user(tx: &mut dyn StoreTx, input: CreateUser) -> CoreResult<User> {
    let email = normalize_email(&input.email);
    if email.is_empty() {
        return Err(CoreError::Validation("email is required".to_string()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        display_name: input.display_name,
        created_at: Utc::now(),
    };
    tx.insert_user(&user).await?;

    info!(user_id = %user.id, "User registered");
    Ok(user)
}

/// Loads the user behind an authenticated request
pub async fn current_user(tx: &mut dyn StoreTx, user_id: Uuid) -> CoreResult<User> {
    tx.find_user(user_id)
        .await?
        .ok_or(CoreError::NotFound("user"))
}
