// Email transports
// The workflow only sees `MailTransport`; which provider sits behind it is decided at startup

use super::types::{EmailError, EmailMessage, ResendEmailPayload};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Delivers a rendered message or reports why it could not
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Resend HTTP API transport; one attempt per message, failures go straight to the caller
#[derive(Clone)]
pub struct ResendTransport {
    client: Arc<Client>,
    api_key: String,
    api_url: String,
}

impl ResendTransport {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            api_key,
            api_url,
        }
    }

    /// One POST to the Resend API
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    async fn post(&self, message: EmailMessage) -> Result<(), EmailError> {
        let payload: ResendEmailPayload = message.into();

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(res) if res.status().is_success() => {
                info!("Email sent successfully");
                Ok(())
            },
            Ok(res) => {
                let status = res.status();
                let error_text = res
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                error!(
                    "Failed to send email. Status: {}, Error: {}",
                    status, error_text
                );

                if status.as_u16() == 429 {
                    Err(EmailError::RateLimitExceeded)
                } else if status.is_server_error() {
                    Err(EmailError::ServiceUnavailable)
                } else {
                    Err(EmailError::SendError(format!(
                        "Email send failed with status {}: {}",
                        status, error_text
                    )))
                }
            },
            Err(e) => {
                error!("Network error while sending email: {:?}", e);
                Err(EmailError::SendError(format!("Network error: {}", e)))
            },
        }
    }
}

#[async_trait]
impl MailTransport for ResendTransport {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        self.post(message).await
    }
}

/// Development transport: writes the message to the log and reports success
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = ?message.to,
            subject = %message.subject,
            "Email (log transport): {}",
            message.text.as_deref().unwrap_or(&message.html)
        );
        Ok(())
    }
}
