/// Authentication and authorization
///
/// # Modules
///
/// - [`jwt`]: HS256 token validation (and minting for tests/tooling)
/// - [`middleware`]: Bearer header parsing into an `AuthContext`
/// - [`resolver`]: Effective role of a user in a project
/// - [`authorization`]: Action to policy table and predicate evaluation
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::auth::authorization::{authorize, Action, PolicyInput};
/// use taskflow_shared::auth::resolver::resolve_role;
/// use taskflow_shared::models::project::Project;
/// use taskflow_shared::store::StoreTx;
/// use uuid::Uuid;
///
/// # async fn example(tx: &mut dyn StoreTx, actor: Uuid, project: Project) -> Result<(), Box<dyn std::error::Error>> {
/// let role = resolve_role(tx, actor, &project).await?;
/// authorize(Action::InviteMember, &PolicyInput::new(actor, role))?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod resolver;
