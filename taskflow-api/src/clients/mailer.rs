/// Transactional email client
///
/// Email delivery goes through an HTTP mail provider. The `Mailer` trait
/// abstracts the provider so services can be tested with a recording
/// double, and so the server can boot with email disabled in development.
///
/// Email sends on business flows are best-effort: callers log failures
/// and continue, they never roll back the triggering operation.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors from the email provider
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("email request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("email provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

/// An outgoing email
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Abstraction over the mail provider
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailerError>;
}

/// Shared handle to the configured mailer
pub type DynMailer = Arc<dyn Mailer>;

/// HTTP mailer talking to a JSON mail API
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailerError> {
        let mut request = self.client.post(&self.api_url).json(&SendRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        });

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// No-op mailer used when email is not configured
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailerError> {
        tracing::info!(to = %email.to, subject = %email.subject, "email disabled, dropping message");
        Ok(())
    }
}

/// Builds a mailer from configuration, falling back to the no-op
/// implementation when no provider endpoint is set.
pub fn mailer_from_config(config: &EmailConfig) -> DynMailer {
    match &config.api_url {
        Some(api_url) => Arc::new(HttpMailer::new(
            api_url.clone(),
            config.api_key.clone(),
            config.from.clone(),
        )),
        None => {
            tracing::warn!("EMAIL_API_URL not set, email sending disabled");
            Arc::new(NoopMailer)
        }
    }
}

/// Renders the email-verification message body
pub fn verification_email(frontend_url: &str, first_name: &str, token: &str) -> (String, String) {
    let link = format!("{}/verify-email?token={}", frontend_url, token);
    let subject = "Verify your TaskFlow account".to_string();
    let html = format!(
        "<p>Hi {first_name},</p>\
         <p>Welcome to TaskFlow. Please confirm your email address:</p>\
         <p><a href=\"{link}\">Verify email</a></p>\
         <p>If you did not create this account, you can ignore this message.</p>"
    );
    (subject, html)
}

/// Renders the task-assignment notification body
pub fn assignment_email(
    frontend_url: &str,
    first_name: &str,
    assigner_name: &str,
    task_id: &str,
    task_title: &str,
) -> (String, String) {
    let link = format!("{}/tasks/{}", frontend_url, task_id);
    let subject = format!("You were assigned: {}", task_title);
    let html = format!(
        "<p>Hi {first_name},</p>\
         <p>{assigner_name} assigned you to <strong>{task_title}</strong>.</p>\
         <p><a href=\"{link}\">Open the task</a></p>"
    );
    (subject, html)
}
