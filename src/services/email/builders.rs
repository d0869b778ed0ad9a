// Email Builders - one builder per message kind

use super::types::{EmailBuilder, EmailError, EmailMessage, NotificationEmailData, OtpEmailData};
use crate::app_config::EmailConfig;
use handlebars::Handlebars;
use tracing::instrument;

fn sender_address(config: &EmailConfig) -> String {
    format!("{} <{}>", config.from_name, config.from_email)
}

/// Builder for one-time registration codes
pub struct OtpEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    code: &'a str,
    ttl_seconds: i64,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> OtpEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        code: &'a str,
        ttl_seconds: i64,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            code,
            ttl_seconds,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for OtpEmailBuilder<'a> {
    #[instrument(skip(self), fields(to = %self.to_email))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = OtpEmailData {
            code: self.code.to_string(),
            user_name: self.user_name.to_string(),
            user_email: self.to_email.to_string(),
            app_name: self.config.from_name.clone(),
            app_url: self.config.frontend_url.clone(),
            support_email: self.config.support_email.clone(),
            // Round up so a 90 second code never reads as "1 minute"
            expiry_minutes: (self.ttl_seconds + 59) / 60,
        };

        let html = self
            .templates
            .render("otp_code", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            Your verification code is: {}\n\n\
            This code will expire in {} minutes. A wrong or expired code cancels the registration.\n\n\
            If you didn't request this code, please ignore this email.\n\n\
            Best regards,\n\
            The {} Team",
            self.user_name, self.code, data.expiry_minutes, self.config.from_name
        );

        Ok(EmailMessage::new(
            sender_address(self.config),
            vec![self.to_email.to_string()],
            format!("Your {} verification code", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}

/// Builder for workflow notifications
pub struct NotificationEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    subject: &'a str,
    headline: &'a str,
    lines: &'a [String],
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> NotificationEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        subject: &'a str,
        headline: &'a str,
        lines: &'a [String],
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            subject,
            headline,
            lines,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for NotificationEmailBuilder<'a> {
    #[instrument(skip(self), fields(to = %self.to_email, subject = %self.subject))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = NotificationEmailData {
            user_name: self.user_name.to_string(),
            headline: self.headline.to_string(),
            lines: self.lines.to_vec(),
            app_name: self.config.from_name.clone(),
            app_url: self.config.frontend_url.clone(),
            support_email: self.config.support_email.clone(),
        };

        let html = self
            .templates
            .render("notification", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n{}\n\n{}\n\nBest regards,\nThe {} Team",
            self.user_name,
            self.headline,
            self.lines.join("\n"),
            self.config.from_name
        );

        Ok(EmailMessage::new(
            sender_address(self.config),
            vec![self.to_email.to_string()],
            self.subject.to_string(),
            html,
        )
        .with_reply_to(self.config.support_email.clone())
        .with_text(text))
    }
}
