/// Authorization policy
///
/// Pure decision functions mapping (actor role, actor id, resource ownership)
/// to allowed operations. Nothing in this module touches the database or the
/// network; the service layer calls these and translates `PolicyError` into a
/// 403 response. A missing actor never reaches this far; the authentication
/// middleware answers 401 first.
///
/// # Rules
///
/// - Task list: USER sees tasks they created or are assigned; MANAGER sees
///   tasks they created plus any task with an assignee; ADMIN sees all.
/// - Single-task read: no ownership check for any authenticated user. This is
///   intentional permissiveness, not an oversight; tasks are not secret.
/// - Task update: USER only as creator or assignee; MANAGER/ADMIN always.
/// - Task delete: creator or ADMIN only.
/// - Comment mutation: author only, regardless of role.
/// - User listing: MANAGER/ADMIN. User profile: self, or MANAGER/ADMIN.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::comment::Comment;
use crate::models::task::Task;
use crate::models::user::UserRole;

/// The resolved, authenticated caller of an operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

/// Error type for policy checks
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Actor is known but lacks the rights for this operation
    #[error("{0}")]
    Forbidden(&'static str),
}

/// Declarative list-visibility predicate, one variant per role
///
/// The task search composes this with user-supplied filters by conjunction,
/// so the scope cannot be accidentally omitted for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskVisibility {
    /// Tasks the user created or is assigned to (USER)
    CreatedOrAssigned(Uuid),

    /// Tasks the user created, plus any task that has an assignee (MANAGER)
    CreatedOrAnyAssigned(Uuid),

    /// Every task (ADMIN)
    All,
}

impl TaskVisibility {
    /// Builds the visibility scope for an actor
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            UserRole::User => TaskVisibility::CreatedOrAssigned(actor.id),
            UserRole::Manager => TaskVisibility::CreatedOrAnyAssigned(actor.id),
            UserRole::Admin => TaskVisibility::All,
        }
    }

    /// The user id the scope binds into the query, if any
    pub fn scoping_user(&self) -> Option<Uuid> {
        match self {
            TaskVisibility::CreatedOrAssigned(id) => Some(*id),
            TaskVisibility::CreatedOrAnyAssigned(id) => Some(*id),
            TaskVisibility::All => None,
        }
    }

    /// Whether a concrete task falls inside this scope
    ///
    /// The SQL rendering is the authoritative version; this mirror exists so
    /// the predicate itself is unit-testable without a database.
    pub fn includes(&self, task: &Task) -> bool {
        match self {
            TaskVisibility::CreatedOrAssigned(id) => {
                task.created_by == *id || task.assigned_to == Some(*id)
            }
            TaskVisibility::CreatedOrAnyAssigned(id) => {
                task.created_by == *id || task.assigned_to.is_some()
            }
            TaskVisibility::All => true,
        }
    }
}

/// USER may update only tasks they created or are assigned to;
/// MANAGER and ADMIN are unrestricted
pub fn can_update_task(actor: &Actor, task: &Task) -> Result<(), PolicyError> {
    match actor.role {
        UserRole::Manager | UserRole::Admin => Ok(()),
        UserRole::User => {
            if task.created_by == actor.id || task.assigned_to == Some(actor.id) {
                Ok(())
            } else {
                Err(PolicyError::Forbidden(
                    "You do not have permission to update this task",
                ))
            }
        }
    }
}

/// Only the creator or an ADMIN may delete a task
pub fn can_delete_task(actor: &Actor, task: &Task) -> Result<(), PolicyError> {
    if actor.role == UserRole::Admin || task.created_by == actor.id {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(
            "You do not have permission to delete this task",
        ))
    }
}

/// Only the author may edit or delete a comment, regardless of role
pub fn can_mutate_comment(actor: &Actor, comment: &Comment) -> Result<(), PolicyError> {
    if comment.user_id == actor.id {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(
            "You can only modify your own comments",
        ))
    }
}

/// MANAGER and ADMIN may list all users
pub fn can_list_users(actor: &Actor) -> Result<(), PolicyError> {
    if actor.role.is_elevated() {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(
            "You do not have permission to view users",
        ))
    }
}

/// Self, or MANAGER/ADMIN for anyone
pub fn can_view_user(actor: &Actor, target_id: Uuid) -> Result<(), PolicyError> {
    if actor.id == target_id || actor.role.is_elevated() {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(
            "You do not have permission to view this user",
        ))
    }
}
