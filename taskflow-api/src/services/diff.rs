/// Pure change detection for task updates
///
/// Side effects of a task update (activity entries, emails, realtime
/// pushes) are driven by a [`TaskDiff`] computed from the row before
/// and after the write. Computing the diff is pure and fully unit
/// tested; dispatching it is the task service's job.

use serde_json::json;
use taskflow_shared::models::activity::ActivityType;
use taskflow_shared::models::task::{Task, TaskStatus};
use uuid::Uuid;

/// An assignee transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeChange {
    pub from: Option<Uuid>,
    pub to: Option<Uuid>,
}

/// What changed between two versions of a task
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDiff {
    /// Status transition, if any
    pub status_change: Option<(TaskStatus, TaskStatus)>,

    /// Assignee transition, if any
    pub assignee_change: Option<AssigneeChange>,

    /// Names of other fields that changed
    pub changed_fields: Vec<&'static str>,
}

/// One activity entry the diff calls for
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedActivity {
    pub activity_type: ActivityType,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
}

impl TaskDiff {
    /// Compares two versions of a task field by field
    pub fn compute(before: &Task, after: &Task) -> Self {
        let status_change = if before.status != after.status {
            Some((before.status, after.status))
        } else {
            None
        };

        let assignee_change = if before.assigned_to != after.assigned_to {
            Some(AssigneeChange {
                from: before.assigned_to,
                to: after.assigned_to,
            })
        } else {
            None
        };

        let mut changed_fields = Vec::new();
        if before.title != after.title {
            changed_fields.push("title");
        }
        if before.description != after.description {
            changed_fields.push("description");
        }
        if before.priority != after.priority {
            changed_fields.push("priority");
        }
        if before.deadline != after.deadline {
            changed_fields.push("deadline");
        }

        Self {
            status_change,
            assignee_change,
            changed_fields,
        }
    }

    /// True when nothing changed at all
    pub fn is_empty(&self) -> bool {
        self.status_change.is_none()
            && self.assignee_change.is_none()
            && self.changed_fields.is_empty()
    }

    /// The assignee to notify: only set when the task moved TO a user,
    /// never on unassignment.
    pub fn new_assignee(&self) -> Option<Uuid> {
        self.assignee_change.as_ref().and_then(|c| c.to)
    }

    /// Activity entries this diff calls for, in dispatch order.
    ///
    /// Each distinct kind of change gets its own entry: a status
    /// transition and an assignment in the same update produce two
    /// rows. Plain field edits collapse into a single TASK_UPDATED row.
    pub fn planned_activities(&self, task_title: &str) -> Vec<PlannedActivity> {
        let mut planned = Vec::new();

        if !self.changed_fields.is_empty() {
            planned.push(PlannedActivity {
                activity_type: ActivityType::TaskUpdated,
                description: format!("Updated task \"{}\"", task_title),
                metadata: Some(json!({ "fields": self.changed_fields })),
            });
        }

        if let Some((from, to)) = &self.status_change {
            planned.push(PlannedActivity {
                activity_type: ActivityType::TaskStatusChanged,
                description: format!("Changed status of \"{}\"", task_title),
                metadata: Some(json!({ "from": from, "to": to })),
            });
        }

        if let Some(change) = &self.assignee_change {
            let description = match change.to {
                Some(_) => format!("Assigned task \"{}\"", task_title),
                None => format!("Unassigned task \"{}\"", task_title),
            };
            planned.push(PlannedActivity {
                activity_type: ActivityType::TaskAssigned,
                description,
                metadata: Some(json!({ "assigned_to": change.to })),
            });
        }

        planned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taskflow_shared::models::task::TaskPriority;

    fn sample_task() -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Write report".to_string(),
            description: "Quarterly numbers".to_string(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            deadline: None,
            created_by: Uuid::new_v4(),
            assigned_to: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_identical_tasks_produce_empty_diff() {
        let task = sample_task();
        let diff = TaskDiff::compute(&task, &task.clone());
        assert!(diff.is_empty());
        assert!(diff.planned_activities(&task.title).is_empty());
    }

    #[test]
    fn test_status_change_detected_with_endpoints() {
        let before = sample_task();
        let mut after = before.clone();
        after.status = TaskStatus::InProgress;

        let diff = TaskDiff::compute(&before, &after);
        assert_eq!(
            diff.status_change,
            Some((TaskStatus::Todo, TaskStatus::InProgress))
        );
        assert!(diff.changed_fields.is_empty());

        let planned = diff.planned_activities(&after.title);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].activity_type, ActivityType::TaskStatusChanged);
        let meta = planned[0].metadata.as_ref().unwrap();
        assert_eq!(meta["from"], "todo");
        assert_eq!(meta["to"], "in-progress");
    }

    #[test]
    fn test_assignment_detected_and_notifies_new_assignee() {
        let before = sample_task();
        let assignee = Uuid::new_v4();
        let mut after = before.clone();
        after.assigned_to = Some(assignee);

        let diff = TaskDiff::compute(&before, &after);
        assert_eq!(diff.new_assignee(), Some(assignee));

        let planned = diff.planned_activities(&after.title);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].activity_type, ActivityType::TaskAssigned);
    }

    #[test]
    fn test_unassignment_logs_but_notifies_nobody() {
        let mut before = sample_task();
        before.assigned_to = Some(Uuid::new_v4());
        let mut after = before.clone();
        after.assigned_to = None;

        let diff = TaskDiff::compute(&before, &after);
        assert_eq!(diff.new_assignee(), None);

        let planned = diff.planned_activities(&after.title);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].activity_type, ActivityType::TaskAssigned);
        assert!(planned[0].description.starts_with("Unassigned"));
        let meta = planned[0].metadata.as_ref().unwrap();
        assert_eq!(meta["assigned_to"], serde_json::Value::Null);
    }

    #[test]
    fn test_combined_update_produces_one_entry_per_change_kind() {
        let before = sample_task();
        let mut after = before.clone();
        after.title = "Write final report".to_string();
        after.status = TaskStatus::Review;
        after.assigned_to = Some(Uuid::new_v4());

        let diff = TaskDiff::compute(&before, &after);
        let planned = diff.planned_activities(&after.title);
        let kinds: Vec<_> = planned.iter().map(|p| p.activity_type).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityType::TaskUpdated,
                ActivityType::TaskStatusChanged,
                ActivityType::TaskAssigned,
            ]
        );
    }

    #[test]
    fn test_field_edits_collapse_into_single_updated_entry() {
        let before = sample_task();
        let mut after = before.clone();
        after.title = "New title".to_string();
        after.description = String::new();
        after.priority = TaskPriority::High;

        let diff = TaskDiff::compute(&before, &after);
        let planned = diff.planned_activities(&after.title);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].activity_type, ActivityType::TaskUpdated);
        let meta = planned[0].metadata.as_ref().unwrap();
        assert_eq!(meta["fields"], json!(["title", "description", "priority"]));
    }
}
