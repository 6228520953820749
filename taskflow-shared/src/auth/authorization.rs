//! Authorization engine
//!
//! Every mutating (and reading) action maps to one [`Policy`], and every
//! policy is a pure predicate over a [`PolicyInput`]. Checks run after the
//! target has been loaded, so predicates can look at the task or comment in
//! question.
//!
//! # Outcome
//!
//! - actor has no role in the project: [`AuthzError::NotMember`], reported
//!   as not-found so the project's existence does not leak
//! - actor has a role but the predicate fails: [`AuthzError::Denied`]
//!
//! # Policy table
//!
//! | Policy | Rule |
//! |---|---|
//! | IsProjectMember | any role |
//! | IsProjectAdmin | owner or admin |
//! | IsProjectOwner | owner |
//! | IsProjectContributor | owner, admin or member |
//! | IsTaskProjectMember | any role in the task's project |
//! | CanAssignTask | owner or admin; a member only to themselves or nobody |
//! | CanChangeStatus | owner, admin or the task's assignee |
//! | CanRemoveMember | owner, admin, or the member leaving |
//! | IsCommentAuthor | the comment's author |
//! | CanDeleteComment | the comment's author, owner or admin |
//!
//! # Example
//!
//! ```
//! use taskflow_shared::auth::authorization::{authorize, Action, PolicyInput};
//! use taskflow_shared::models::membership::Role;
//! use uuid::Uuid;
//!
//! let actor = Uuid::new_v4();
//! let input = PolicyInput::new(actor, Some(Role::Member)).with_assignee(Some(actor));
//! assert!(authorize(Action::AssignTask, &input).is_ok());
//!
//! let other = PolicyInput::new(actor, Some(Role::Member)).with_assignee(Some(Uuid::new_v4()));
//! assert!(authorize(Action::AssignTask, &other).is_err());
//! ```

use uuid::Uuid;

use crate::models::comment::Comment;
use crate::models::membership::Role;
use crate::models::task::Task;

/// Authorization errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Actor has no role in the project
    #[error("Not a member of this project")]
    NotMember,

    /// Actor's role does not allow the action
    #[error("{role} may not {action}")]
    Denied { action: &'static str, role: &'static str },
}

/// Something an actor attempts inside a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewProject,
    ListMembers,
    ViewActivity,
    ViewSummary,
    UpdateProject,
    DeleteProject,
    InviteMember,
    ChangeMemberRole,
    RemoveMember,
    CreateTask,
    ViewTask,
    UpdateTask,
    DeleteTask,
    ReorderTask,
    AssignTask,
    ChangeStatus,
    TagTask,
    CommentOnTask,
    EditComment,
    DeleteComment,
    ManageLabels,
}

impl Action {
    /// Human-readable name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewProject => "view this project",
            Action::ListMembers => "list members",
            Action::ViewActivity => "view activity",
            Action::ViewSummary => "view the summary",
            Action::UpdateProject => "update this project",
            Action::DeleteProject => "delete this project",
            Action::InviteMember => "invite members",
            Action::ChangeMemberRole => "change member roles",
            Action::RemoveMember => "remove this member",
            Action::CreateTask => "create tasks",
            Action::ViewTask => "view this task",
            Action::UpdateTask => "update this task",
            Action::DeleteTask => "delete this task",
            Action::ReorderTask => "reorder this task",
            Action::AssignTask => "assign this task to that user",
            Action::ChangeStatus => "change the status of this task",
            Action::TagTask => "label this task",
            Action::CommentOnTask => "comment on this task",
            Action::EditComment => "edit this comment",
            Action::DeleteComment => "delete this comment",
            Action::ManageLabels => "manage labels",
        }
    }

    /// Policy guarding this action
    pub fn policy(&self) -> Policy {
        match self {
            Action::ViewProject | Action::ListMembers | Action::ViewActivity | Action::ViewSummary => {
                Policy::IsProjectMember
            }
            Action::UpdateProject | Action::InviteMember | Action::ChangeMemberRole => {
                Policy::IsProjectAdmin
            }
            Action::DeleteProject => Policy::IsProjectOwner,
            Action::RemoveMember => Policy::CanRemoveMember,
            Action::CreateTask
            | Action::UpdateTask
            | Action::DeleteTask
            | Action::ReorderTask
            | Action::TagTask
            | Action::ManageLabels => Policy::IsProjectContributor,
            Action::ViewTask | Action::CommentOnTask => Policy::IsTaskProjectMember,
            Action::AssignTask => Policy::CanAssignTask,
            Action::ChangeStatus => Policy::CanChangeStatus,
            Action::EditComment => Policy::IsCommentAuthor,
            Action::DeleteComment => Policy::CanDeleteComment,
        }
    }
}

/// Named access rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    IsProjectMember,
    IsProjectAdmin,
    IsProjectOwner,
    IsProjectContributor,
    IsTaskProjectMember,
    CanAssignTask,
    CanChangeStatus,
    CanRemoveMember,
    IsCommentAuthor,
    CanDeleteComment,
}

/// Predicate signature shared by every policy
pub type Predicate = fn(&PolicyInput<'_>, Role) -> bool;

impl Policy {
    /// The predicate implementing this policy
    ///
    /// Predicates only run once the actor is known to hold some role.
    pub fn predicate(&self) -> Predicate {
        match self {
            Policy::IsProjectMember => |_, _| true,
            Policy::IsProjectAdmin => |_, role| role.is_admin(),
            Policy::IsProjectOwner => |_, role| role == Role::Owner,
            Policy::IsProjectContributor => |_, role| role.can_contribute(),
            Policy::IsTaskProjectMember => |input, _| input.task.is_some(),
            Policy::CanAssignTask => |input, role| {
                role.is_admin()
                    || (role.can_contribute()
                        && input.assignee.map_or(true, |assignee| assignee == input.actor))
            },
            Policy::CanChangeStatus => |input, role| {
                role.is_admin()
                    || input
                        .task
                        .map_or(false, |task| task.assignee_id == Some(input.actor))
            },
            Policy::CanRemoveMember => |input, role| {
                role.is_admin() || input.target_user == Some(input.actor)
            },
            Policy::IsCommentAuthor => |input, _| {
                input.comment.map_or(false, |c| c.is_authored_by(input.actor))
            },
            Policy::CanDeleteComment => |input, role| {
                role.is_admin() || input.comment.map_or(false, |c| c.is_authored_by(input.actor))
            },
        }
    }
}

/// Facts a policy is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    /// Acting user
    pub actor: Uuid,

    /// Actor's effective role, `None` for non-members
    pub role: Option<Role>,

    /// Target task
    pub task: Option<&'a Task>,

    /// Requested assignee (assign action), `None` to unassign
    pub assignee: Option<Uuid>,

    /// Member being removed (remove action)
    pub target_user: Option<Uuid>,

    /// Target comment
    pub comment: Option<&'a Comment>,
}

impl<'a> PolicyInput<'a> {
    pub fn new(actor: Uuid, role: Option<Role>) -> Self {
        Self {
            actor,
            role,
            task: None,
            assignee: None,
            target_user: None,
            comment: None,
        }
    }

    pub fn with_task(mut self, task: &'a Task) -> Self {
        self.task = Some(task);
        self
    }

    pub fn with_assignee(mut self, assignee: Option<Uuid>) -> Self {
        self.assignee = assignee;
        self
    }

    pub fn with_target_user(mut self, user_id: Uuid) -> Self {
        self.target_user = Some(user_id);
        self
    }

    pub fn with_comment(mut self, comment: &'a Comment) -> Self {
        self.comment = Some(comment);
        self
    }
}

/// Checks whether `input.actor` may perform `action`
///
/// # Errors
///
/// Returns [`AuthzError::NotMember`] when the actor has no role, and
/// [`AuthzError::Denied`] when the action's policy rejects the actor.
pub fn authorize(action: Action, input: &PolicyInput<'_>) -> Result<(), AuthzError> {
    let role = input.role.ok_or(AuthzError::NotMember)?;

    if (action.policy().predicate())(input, role) {
        Ok(())
    } else {
        Err(AuthzError::Denied {
            action: action.as_str(),
            role: role.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;

    const ALL_ROLES: [Role; 4] = [Role::Owner, Role::Admin, Role::Member, Role::Viewer];

    fn task(assignee_id: Option<Uuid>) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Fix login".to_string(),
            description: String::new(),
            created_by: None,
            assignee_id,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            position: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn comment(user_id: Uuid) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            user_id,
            content: "LGTM".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_non_member_is_not_found_for_every_action() {
        let actor = Uuid::new_v4();
        let t = task(Some(actor));
        let c = comment(actor);
        let input = PolicyInput::new(actor, None)
            .with_task(&t)
            .with_comment(&c)
            .with_assignee(Some(actor))
            .with_target_user(actor);

        for action in [
            Action::ViewProject,
            Action::CreateTask,
            Action::UpdateTask,
            Action::AssignTask,
            Action::ChangeStatus,
            Action::RemoveMember,
            Action::EditComment,
        ] {
            assert_eq!(authorize(action, &input), Err(AuthzError::NotMember));
        }
    }

    #[test]
    fn test_admin_policies() {
        let actor = Uuid::new_v4();
        for role in ALL_ROLES {
            let input = PolicyInput::new(actor, Some(role));
            let allowed = authorize(Action::InviteMember, &input).is_ok();
            assert_eq!(allowed, matches!(role, Role::Owner | Role::Admin), "{:?}", role);
        }
    }

    #[test]
    fn test_only_owner_deletes_project() {
        let actor = Uuid::new_v4();
        assert!(authorize(Action::DeleteProject, &PolicyInput::new(actor, Some(Role::Owner))).is_ok());
        assert!(authorize(Action::DeleteProject, &PolicyInput::new(actor, Some(Role::Admin))).is_err());
    }

    #[test]
    fn test_viewer_is_read_only() {
        let actor = Uuid::new_v4();
        let t = task(None);
        let input = PolicyInput::new(actor, Some(Role::Viewer)).with_task(&t);

        assert!(authorize(Action::ViewProject, &input).is_ok());
        assert!(authorize(Action::ViewTask, &input).is_ok());
        assert!(authorize(Action::CommentOnTask, &input).is_ok());
        assert!(authorize(Action::CreateTask, &input).is_err());
        assert!(authorize(Action::ReorderTask, &input).is_err());
        assert!(authorize(Action::AssignTask, &input.with_assignee(Some(actor))).is_err());
    }

    #[test]
    fn test_member_may_only_self_assign() {
        let actor = Uuid::new_v4();
        let other = Uuid::new_v4();
        let t = task(None);
        let base = PolicyInput::new(actor, Some(Role::Member)).with_task(&t);

        assert!(authorize(Action::AssignTask, &base.with_assignee(Some(actor))).is_ok());
        assert!(authorize(Action::AssignTask, &base.with_assignee(None)).is_ok());
        assert_eq!(
            authorize(Action::AssignTask, &base.with_assignee(Some(other))),
            Err(AuthzError::Denied {
                action: "assign this task to that user",
                role: "member",
            })
        );

        for role in [Role::Owner, Role::Admin] {
            let input = PolicyInput::new(actor, Some(role))
                .with_task(&t)
                .with_assignee(Some(other));
            assert!(authorize(Action::AssignTask, &input).is_ok());
        }
    }

    #[test]
    fn test_status_change_requires_assignee_or_admin() {
        let actor = Uuid::new_v4();
        let mine = task(Some(actor));
        let theirs = task(Some(Uuid::new_v4()));
        let nobody = task(None);

        let member = |t| PolicyInput::new(actor, Some(Role::Member)).with_task(t);
        assert!(authorize(Action::ChangeStatus, &member(&mine)).is_ok());
        assert!(authorize(Action::ChangeStatus, &member(&theirs)).is_err());
        assert!(authorize(Action::ChangeStatus, &member(&nobody)).is_err());

        let admin = PolicyInput::new(actor, Some(Role::Admin)).with_task(&theirs);
        assert!(authorize(Action::ChangeStatus, &admin).is_ok());
    }

    #[test]
    fn test_remove_member_self_or_admin() {
        let actor = Uuid::new_v4();
        let other = Uuid::new_v4();

        let leave = PolicyInput::new(actor, Some(Role::Viewer)).with_target_user(actor);
        assert!(authorize(Action::RemoveMember, &leave).is_ok());

        let kick = PolicyInput::new(actor, Some(Role::Member)).with_target_user(other);
        assert!(authorize(Action::RemoveMember, &kick).is_err());

        let admin_kick = PolicyInput::new(actor, Some(Role::Admin)).with_target_user(other);
        assert!(authorize(Action::RemoveMember, &admin_kick).is_ok());
    }

    #[test]
    fn test_comment_policies() {
        let author = Uuid::new_v4();
        let c = comment(author);

        let as_author = PolicyInput::new(author, Some(Role::Viewer)).with_comment(&c);
        assert!(authorize(Action::EditComment, &as_author).is_ok());
        assert!(authorize(Action::DeleteComment, &as_author).is_ok());

        let as_admin = PolicyInput::new(Uuid::new_v4(), Some(Role::Admin)).with_comment(&c);
        assert!(authorize(Action::EditComment, &as_admin).is_err());
        assert!(authorize(Action::DeleteComment, &as_admin).is_ok());

        let as_member = PolicyInput::new(Uuid::new_v4(), Some(Role::Member)).with_comment(&c);
        assert!(authorize(Action::DeleteComment, &as_member).is_err());
    }
}
