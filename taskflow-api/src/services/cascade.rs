/// Side-effect dispatch for task mutations
///
/// Every mutating task operation fans out the same way: append to the
/// activity log, then deliver best-effort notifications (email to a new
/// assignee, realtime pushes to watchers). [`SideEffects`] owns that
/// fan-out so route handlers stay thin and the ordering lives in one
/// place.
///
/// Failure policy: activity log writes are part of the operation and
/// propagate; email and realtime delivery are best-effort, logged and
/// swallowed. There is no cross-step transaction, so a crash between
/// the primary write and the log can lose the log entry.

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use taskflow_shared::auth::policy::Actor;
use taskflow_shared::models::activity::{ActivityLog, ActivityType, CreateActivityLog};
use taskflow_shared::models::comment::Comment;
use taskflow_shared::models::task::Task;
use taskflow_shared::models::user::User;
use taskflow_shared::realtime::{Notification, Notifier};

use crate::clients::mailer::{assignment_email, DynMailer, OutgoingEmail};
use crate::services::diff::TaskDiff;

/// Dispatcher for post-mutation side effects
#[derive(Clone)]
pub struct SideEffects {
    db: PgPool,
    notifier: Notifier,
    mailer: DynMailer,
    frontend_url: String,
}

impl SideEffects {
    pub fn new(db: PgPool, notifier: Notifier, mailer: DynMailer, frontend_url: String) -> Self {
        Self {
            db,
            notifier,
            mailer,
            frontend_url,
        }
    }

    /// Cascade for a freshly created task
    pub async fn task_created(&self, actor: &Actor, task: &Task) -> Result<(), sqlx::Error> {
        ActivityLog::create(
            &self.db,
            CreateActivityLog {
                activity_type: ActivityType::TaskCreated,
                description: format!("Created task \"{}\"", task.title),
                metadata: None,
                user_id: actor.id,
                task_id: Some(task.id),
            },
        )
        .await?;

        if let Some(assignee) = task.assigned_to {
            self.announce_assignment(actor, task, assignee).await;
        }

        Ok(())
    }

    /// Cascade for a task update, driven by the computed diff
    pub async fn task_updated(
        &self,
        actor: &Actor,
        before: &Task,
        after: &Task,
    ) -> Result<(), sqlx::Error> {
        let diff = TaskDiff::compute(before, after);
        if diff.is_empty() {
            return Ok(());
        }

        for planned in diff.planned_activities(&after.title) {
            ActivityLog::create(
                &self.db,
                CreateActivityLog {
                    activity_type: planned.activity_type,
                    description: planned.description,
                    metadata: planned.metadata,
                    user_id: actor.id,
                    task_id: Some(after.id),
                },
            )
            .await?;
        }

        if let Some((from, to)) = &diff.status_change {
            let notification =
                Notification::new(ActivityType::TaskStatusChanged, "Task status changed")
                    .with_task(after.id, after.title.clone())
                    .with_metadata(serde_json::json!({ "oldStatus": from, "newStatus": to }));
            self.notifier
                .notify_task_watchers(after.id, &notification)
                .await;
        }

        if let Some(assignee) = diff.new_assignee() {
            self.announce_assignment(actor, after, assignee).await;
        }

        // A status-only update already broadcast above; one message per
        // change kind, never a blanket echo.
        if diff.assignee_change.is_some() || !diff.changed_fields.is_empty() {
            let notification = Notification::new(ActivityType::TaskUpdated, "Task updated")
                .with_task(after.id, after.title.clone());
            self.notifier
                .notify_task_watchers(after.id, &notification)
                .await;
        }

        Ok(())
    }

    /// Cascade for a deleted task
    ///
    /// The task row is already gone, so the log entry carries no task
    /// reference and preserves the title in its description. Deletion is
    /// log-only; the task channel has nobody left to notify.
    pub async fn task_deleted(&self, actor: &Actor, task: &Task) -> Result<(), sqlx::Error> {
        ActivityLog::create(
            &self.db,
            CreateActivityLog {
                activity_type: ActivityType::TaskDeleted,
                description: format!("Deleted task \"{}\"", task.title),
                metadata: Some(serde_json::json!({ "task_id": task.id })),
                user_id: actor.id,
                task_id: None,
            },
        )
        .await?;

        Ok(())
    }

    /// Cascade for a new comment
    pub async fn comment_added(
        &self,
        actor: &Actor,
        task: &Task,
        comment: &Comment,
    ) -> Result<(), sqlx::Error> {
        ActivityLog::create(
            &self.db,
            CreateActivityLog {
                activity_type: ActivityType::CommentAdded,
                description: format!("Commented on \"{}\"", task.title),
                metadata: Some(serde_json::json!({ "comment_id": comment.id })),
                user_id: actor.id,
                task_id: Some(task.id),
            },
        )
        .await?;

        let notification = Notification::new(ActivityType::CommentAdded, "New comment")
            .with_task(task.id, task.title.clone());
        self.notifier
            .notify_task_watchers(task.id, &notification)
            .await;

        Ok(())
    }

    /// Cascade for an uploaded attachment
    pub async fn file_uploaded(
        &self,
        actor: &Actor,
        task: &Task,
        filename: &str,
        size: i64,
    ) -> Result<(), sqlx::Error> {
        ActivityLog::create(
            &self.db,
            CreateActivityLog {
                activity_type: ActivityType::FileUploaded,
                description: format!("Uploaded \"{}\" to \"{}\"", filename, task.title),
                metadata: Some(serde_json::json!({ "filename": filename, "size": size })),
                user_id: actor.id,
                task_id: Some(task.id),
            },
        )
        .await?;

        let notification = Notification::new(ActivityType::FileUploaded, "File uploaded")
            .with_task(task.id, task.title.clone())
            .with_metadata(serde_json::json!({ "filename": filename }));
        self.notifier
            .notify_task_watchers(task.id, &notification)
            .await;

        Ok(())
    }

    /// Best-effort assignee announcement: personal realtime push plus an
    /// email, skipped when the actor assigned the task to themselves.
    async fn announce_assignment(&self, actor: &Actor, task: &Task, assignee: Uuid) {
        let notification = Notification::new(ActivityType::TaskAssigned, "You were assigned a task")
            .with_task(task.id, task.title.clone());
        self.notifier.notify_user(assignee, &notification).await;

        if assignee == actor.id {
            return;
        }

        let recipient = match User::find_active_by_id(&self.db, assignee).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Failed to load assignee for email");
                return;
            }
        };

        // The auth layer loaded the actor from this table a moment ago,
        // so a miss here is a deleted account mid-request at worst.
        let assigner_name = match User::find_by_id(&self.db, actor.id).await {
            Ok(Some(user)) => user.full_name(),
            _ => "A teammate".to_string(),
        };

        let (subject, html) = assignment_email(
            &self.frontend_url,
            &recipient.first_name,
            &assigner_name,
            &task.id.to_string(),
            &task.title,
        );

        if let Err(e) = self
            .mailer
            .send(OutgoingEmail {
                to: recipient.email.clone(),
                subject,
                html,
            })
            .await
        {
            warn!(task_id = %task.id, error = %e, "Failed to send assignment email");
        }
    }
}
