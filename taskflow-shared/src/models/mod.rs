/// Domain models for TaskFlow
///
/// Plain data types shared by the store, services and the HTTP layer.
/// Persistence lives behind [`crate::store`]; these types only derive
/// `sqlx::FromRow` / `sqlx::Type` so the PostgreSQL store can decode them.
///
/// # Models
///
/// - `user`: Users referenced by projects, tasks and comments
/// - `project`: Projects, the tenant boundary
/// - `membership`: User-project relationships with roles
/// - `task`: Kanban cards with dense column positions
/// - `comment`: Task comments
/// - `label`: Project-scoped labels
/// - `activity`: Append-only activity records

pub mod activity;
pub mod comment;
pub mod label;
pub mod membership;
pub mod project;
pub mod task;
pub mod user;
