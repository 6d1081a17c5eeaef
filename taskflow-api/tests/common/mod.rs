/// Common test utilities for integration tests
///
/// Provides a TestContext that wires the app with a real database and
/// recording doubles for email, object storage and realtime publishing,
/// plus helpers for users, tokens and request building.
///
/// Integration tests need PostgreSQL; when DATABASE_URL is not set,
/// `TestContext::try_new` returns None and tests skip themselves.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use taskflow_api::app::{build_router, AppState};
use taskflow_api::clients::{
    Mailer, MailerError, ObjectStore, OutgoingEmail, StorageError, StoredObject,
};
use taskflow_api::config::{
    ApiConfig, Config, DatabaseConfig, EmailConfig, JwtConfig, RedisConfig, StorageConfig,
};
use taskflow_shared::auth::jwt::{create_token, Claims, TokenType};
use taskflow_shared::auth::password::hash_password;
use taskflow_shared::models::user::{CreateUser, User, UserRole};
use taskflow_shared::realtime::{Notifier, Publisher, RedisClientError};
use uuid::Uuid;

/// Records every sent email for assertions
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailerError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// In-memory object store recording uploads and deletes
#[derive(Default)]
pub struct RecordingStore {
    pub uploads: Mutex<Vec<(String, String, usize)>>,
    pub deletes: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put(
        &self,
        filename: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        let key = format!("test-{}-{}", Uuid::new_v4(), filename);
        self.uploads.lock().unwrap().push((
            filename.to_string(),
            mime_type.to_string(),
            data.len(),
        ));
        Ok(StoredObject {
            url: format!("http://store.test/{}", key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.deletes.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

/// Records every realtime publish as (channel, payload)
#[derive(Default)]
pub struct RecordingPublisher {
    pub messages: Mutex<Vec<(String, serde_json::Value)>>,
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish_raw(&self, channel: &str, payload: &str) -> Result<(), RedisClientError> {
        let value = serde_json::from_str(payload)
            .map_err(|e| RedisClientError::CommandError(e.to_string()))?;
        self.messages
            .lock()
            .unwrap()
            .push((channel.to_string(), value));
        Ok(())
    }
}

impl RecordingPublisher {
    /// Messages published to the given channel
    pub fn on_channel(&self, channel: &str) -> Vec<serde_json::Value> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

/// Test context wiring the router to a real database and doubles
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<RecordingStore>,
    pub realtime: Arc<RecordingPublisher>,
    created_users: Mutex<Vec<Uuid>>,
}

const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

fn test_config(database_url: String) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 5,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        },
        redis: RedisConfig { url: None },
        email: EmailConfig {
            api_url: None,
            api_key: None,
            from: "noreply@taskflow.test".to_string(),
            frontend_url: "http://frontend.test".to_string(),
        },
        storage: StorageConfig {
            endpoint: "http://store.test".to_string(),
            bucket: "taskflow".to_string(),
            api_token: None,
        },
    }
}

impl TestContext {
    /// Builds a context, or None when DATABASE_URL is not set
    pub async fn try_new() -> Option<Self> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("DATABASE_URL not set, skipping integration test");
                return None;
            }
        };

        let config = test_config(database_url);
        let db = PgPool::connect(&config.database.url)
            .await
            .expect("failed to connect to test database");

        sqlx::migrate!("../migrations")
            .run(&db)
            .await
            .expect("failed to run migrations");

        let mailer = Arc::new(RecordingMailer::default());
        let storage = Arc::new(RecordingStore::default());
        let realtime = Arc::new(RecordingPublisher::default());

        let state = AppState::new(
            db.clone(),
            config.clone(),
            mailer.clone(),
            storage.clone(),
            Notifier::with_publisher(realtime.clone()),
        );
        let app = build_router(state);

        Some(TestContext {
            db,
            app,
            config,
            mailer,
            storage,
            realtime,
            created_users: Mutex::new(Vec::new()),
        })
    }

    /// Creates a user with the given role directly in the database
    pub async fn create_user(&self, role: UserRole) -> User {
        let user = User::create(
            &self.db,
            CreateUser {
                email: format!("test-{}@example.com", Uuid::new_v4()),
                password_hash: hash_password("Passw0rd!").unwrap(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role,
                email_verification_token: None,
                email_verification_expires: None,
            },
        )
        .await
        .expect("failed to create test user");

        self.created_users.lock().unwrap().push(user.id);
        user
    }

    /// Issues an access token for a user
    pub fn token_for(&self, user: &User) -> String {
        let claims = Claims::new(user.id, user.role, TokenType::Access);
        create_token(&claims, TEST_JWT_SECRET).unwrap()
    }

    /// Sends a JSON request through the router
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// Sends a prebuilt request (used for multipart uploads)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        use tower::ServiceExt;

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    /// Deletes everything this context created, children first
    pub async fn cleanup(&self) {
        let user_ids: Vec<Uuid> = self.created_users.lock().unwrap().clone();
        if user_ids.is_empty() {
            return;
        }

        // Tasks cascade to comments, attachments, favorites and
        // task-linked activity rows
        sqlx::query("DELETE FROM tasks WHERE created_by = ANY($1)")
            .bind(&user_ids)
            .execute(&self.db)
            .await
            .ok();
        sqlx::query("DELETE FROM activity_logs WHERE user_id = ANY($1)")
            .bind(&user_ids)
            .execute(&self.db)
            .await
            .ok();
        sqlx::query("DELETE FROM task_favorites WHERE user_id = ANY($1)")
            .bind(&user_ids)
            .execute(&self.db)
            .await
            .ok();
        sqlx::query("DELETE FROM comments WHERE user_id = ANY($1)")
            .bind(&user_ids)
            .execute(&self.db)
            .await
            .ok();
        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(&user_ids)
            .execute(&self.db)
            .await
            .ok();
    }
}

/// Builds a multipart upload request body for the file endpoints
pub fn multipart_upload(
    uri: &str,
    token: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let boundary = "----taskflow-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}
