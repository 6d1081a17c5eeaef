/// Realtime notification fan-out
///
/// Notifications are published to Redis pub/sub channels keyed by identity:
/// `user:{user_id}` for personal notifications and `task:{task_id}` for
/// everyone watching a task. The socket gateway subscribes sessions to those
/// channels; subscription management is out of scope here.
///
/// Delivery is fire-and-forget. Publish failures are logged and swallowed so
/// a realtime hiccup can never fail the primary operation. A `Notifier` can
/// also be constructed disabled (no connection), in which case every publish
/// is a silent no-op; tests and minimal deployments use that.
///
/// The notifier is an explicitly constructed dependency handed to each
/// service at startup, never a process-global.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::activity::ActivityType;
use crate::realtime::client::{RedisClient, RedisClientError};

/// Payload delivered to subscribed sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Event kind, mirroring the activity log taxonomy
    #[serde(rename = "type")]
    pub kind: ActivityType,

    /// Human-readable message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_title: Option<String>,

    /// Optional structured payload (e.g. old/new status)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

impl Notification {
    pub fn new(kind: ActivityType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            task_id: None,
            task_title: None,
            metadata: None,
        }
    }

    pub fn with_task(mut self, task_id: Uuid, task_title: impl Into<String>) -> Self {
        self.task_id = Some(task_id);
        self.task_title = Some(task_title.into());
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Transport a notifier publishes through
///
/// Production uses Redis; tests substitute a recording implementation.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_raw(&self, channel: &str, payload: &str) -> Result<(), RedisClientError>;
}

#[async_trait]
impl Publisher for RedisClient {
    async fn publish_raw(&self, channel: &str, payload: &str) -> Result<(), RedisClientError> {
        self.publish(channel, payload).await?;
        Ok(())
    }
}

/// Publisher handle for realtime notifications
#[derive(Clone)]
pub struct Notifier {
    publisher: Option<Arc<dyn Publisher>>,
}

impl Notifier {
    /// Creates a notifier backed by a Redis connection
    pub fn new(client: RedisClient) -> Self {
        Self {
            publisher: Some(Arc::new(client)),
        }
    }

    /// Creates a notifier over an arbitrary transport
    pub fn with_publisher(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            publisher: Some(publisher),
        }
    }

    /// Creates a disabled notifier whose publishes are no-ops
    pub fn disabled() -> Self {
        Self { publisher: None }
    }

    /// Channel for a user's personal notifications
    pub fn user_channel(user_id: Uuid) -> String {
        format!("user:{}", user_id)
    }

    /// Channel for sessions watching a task
    pub fn task_channel(task_id: Uuid) -> String {
        format!("task:{}", task_id)
    }

    /// Delivers a notification to the user's personal channel
    ///
    /// Fire-and-forget: failures are logged, never returned.
    pub async fn notify_user(&self, user_id: Uuid, notification: &Notification) {
        self.publish(&Self::user_channel(user_id), notification).await;
    }

    /// Broadcasts a notification to everyone watching a task
    pub async fn notify_task_watchers(&self, task_id: Uuid, notification: &Notification) {
        self.publish(&Self::task_channel(task_id), notification).await;
    }

    async fn publish(&self, channel: &str, notification: &Notification) {
        let Some(ref publisher) = self.publisher else {
            debug!(channel, "Realtime notifier disabled, dropping notification");
            return;
        };

        let payload = match serde_json::to_string(notification) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(channel, error = %e, "Failed to serialize notification");
                return;
            }
        };

        if let Err(e) = publisher.publish_raw(channel, &payload).await {
            warn!(channel, error = %e, "Failed to publish realtime notification");
        }
    }
}
