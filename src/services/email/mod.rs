// Email Service Module
// Renders messages from templates and hands them to the configured transport

pub mod builders;
pub mod sender;
pub mod types;

use self::types::EmailBuilder;
use crate::app_config::{EmailConfig, EmailProvider};
use builders::{NotificationEmailBuilder, OtpEmailBuilder};
use handlebars::Handlebars;
use std::sync::Arc;
use tracing::{info, instrument};

pub use sender::{LogTransport, MailTransport, ResendTransport};
pub use types::{EmailError, EmailMessage};

/// Email service shared by the registrars and the notifier
#[derive(Clone)]
pub struct EmailService {
    transport: Arc<dyn MailTransport>,
    config: EmailConfig,
    templates: Arc<Handlebars<'static>>,
}

impl EmailService {
    /// Build the service with the transport selected by `config.provider`
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let transport: Arc<dyn MailTransport> = match config.provider {
            EmailProvider::Resend => Arc::new(ResendTransport::new(
                config.resend_api_key.clone(),
                config.resend_api_url.clone(),
            )),
            EmailProvider::Log => Arc::new(LogTransport),
        };

        Self::with_transport(config, transport)
    }

    /// Build the service around an explicit transport
    pub fn with_transport(
        config: EmailConfig,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self, EmailError> {
        let mut templates = Handlebars::new();
        Self::register_templates(&mut templates)?;

        Ok(Self {
            transport,
            config,
            templates: Arc::new(templates),
        })
    }

    fn register_templates(templates: &mut Handlebars) -> Result<(), EmailError> {
        let otp_template = include_str!("../../../templates/email/otp_code.html");
        templates
            .register_template_string("otp_code", otp_template)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let notification_template = include_str!("../../../templates/email/notification.html");
        templates
            .register_template_string("notification", notification_template)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        Ok(())
    }

    /// Send a registration code
    #[instrument(skip(self, code))]
    pub async fn send_otp(
        &self,
        to_email: &str,
        user_name: &str,
        code: &str,
        ttl_seconds: i64,
    ) -> Result<(), EmailError> {
        info!("Sending verification code to {}", to_email);

        let message = OtpEmailBuilder::new(
            to_email,
            user_name,
            code,
            ttl_seconds,
            &self.config,
            &self.templates,
        )
        .build()?;

        self.transport.send(message).await
    }

    /// Send a workflow notification
    #[instrument(skip(self, lines))]
    pub async fn send_notification(
        &self,
        to_email: &str,
        user_name: &str,
        subject: &str,
        headline: &str,
        lines: &[String],
    ) -> Result<(), EmailError> {
        let message = NotificationEmailBuilder::new(
            to_email,
            user_name,
            subject,
            headline,
            lines,
            &self.config,
            &self.templates,
        )
        .build()?;

        self.transport.send(message).await
    }
}
