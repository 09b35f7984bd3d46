// Transactional email: message rendering plus SendGrid and log-only transports

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

use super::http::{provider_client, PROVIDER_TIMEOUT};
use crate::config::Config;
use crate::domain::user::User;

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

pub const WELCOME_SUBJECT: &str = "Welcome to the Natours Family!";
pub const PASSWORD_RESET_SUBJECT: &str = "Your password reset token (valid for only 10 minutes)";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Failed to render email: {0}")]
    Render(#[from] askama::Error),

    #[error("Email transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Template)]
#[template(path = "emails/welcome.html")]
struct WelcomeHtml<'a> {
    subject: &'a str,
    first_name: &'a str,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/welcome.txt")]
struct WelcomeText<'a> {
    first_name: &'a str,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/password_reset.html")]
struct PasswordResetHtml<'a> {
    subject: &'a str,
    first_name: &'a str,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/password_reset.txt")]
struct PasswordResetText<'a> {
    first_name: &'a str,
    url: &'a str,
}

impl EmailMessage {
    /// Welcome message pointing at the account page
    pub fn welcome(user: &User, url: &str) -> Result<Self, MailError> {
        let first_name = user.first_name();
        Ok(Self {
            to: user.email.to_string(),
            to_name: user.name.clone(),
            subject: WELCOME_SUBJECT.to_string(),
            html: WelcomeHtml { subject: WELCOME_SUBJECT, first_name, url }.render()?,
            text: WelcomeText { first_name, url }.render()?,
        })
    }

    /// Password reset message carrying the one-time reset link
    pub fn password_reset(user: &User, url: &str) -> Result<Self, MailError> {
        let first_name = user.first_name();
        Ok(Self {
            to: user.email.to_string(),
            to_name: user.name.clone(),
            subject: PASSWORD_RESET_SUBJECT.to_string(),
            html: PasswordResetHtml { subject: PASSWORD_RESET_SUBJECT, first_name, url }.render()?,
            text: PasswordResetText { first_name, url }.render()?,
        })
    }
}

/// Outbound email port
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Delivers mail through the SendGrid v3 HTTP API
pub struct SendGridMailer {
    client: Client,
    api_key: String,
    from: String,
    from_name: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, from: String, from_name: String) -> Self {
        Self {
            client: provider_client(PROVIDER_TIMEOUT),
            api_key,
            from,
            from_name,
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let body = json!({
            "personalizations": [{
                "to": [{ "email": message.to, "name": message.to_name }]
            }],
            "from": { "email": self.from, "name": self.from_name },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html }
            ]
        });

        let response = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "SendGrid rejected email: {}", body);
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Development transport: logs the message instead of sending it
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "Email not sent (log mailer)");
        tracing::debug!("{}", message.text);
        Ok(())
    }
}

/// SendGrid when an API key is configured, otherwise the log mailer
pub fn mailer_from_config(config: &Config) -> Arc<dyn Mailer> {
    match &config.sendgrid_api_key {
        Some(key) => Arc::new(SendGridMailer::new(
            key.clone(),
            config.email_from.clone(),
            config.email_from_name.clone(),
        )),
        None => {
            tracing::warn!("SENDGRID_API_KEY not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}
