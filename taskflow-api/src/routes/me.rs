/// Current user endpoint
///
/// ```text
/// GET /v1/me
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use taskflow_shared::{auth::middleware::AuthContext, models::user::User, services::users};

/// Returns the user record behind the bearer token
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid JWT token
/// - `404 Not Found`: The identity service has not provisioned the user yet
pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let mut tx = state.store.begin().await?;
    let user = users::current_user(tx.as_mut(), auth.user_id).await?;
    Ok(Json(user))
}
