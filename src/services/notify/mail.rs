use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};

use super::NotifyError;
use crate::config::Config;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Logs messages instead of sending them.
#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        tracing::info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            body = %message.body,
            "email sent (console)"
        );
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, user: Option<String>, pass: Option<String>) -> Self {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
        if let (Some(user), Some(pass)) = (user, pass) {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        Self {
            transport: builder.build(),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let from: Mailbox = message
            .from
            .parse()
            .map_err(|e| NotifyError::Config(format!("invalid from address '{}': {e}", message.from)))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| NotifyError::Delivery(format!("invalid recipient '{}': {e}", message.to)))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| NotifyError::Delivery(format!("failed to build message: {e}")))?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::Delivery(format!("SMTP send failed: {e}")))
    }
}

pub fn from_config(config: &Config) -> Result<Arc<dyn Mailer>, NotifyError> {
    match config.mail_adapter.as_str() {
        "console" => Ok(Arc::new(ConsoleMailer)),
        "smtp" => {
            let host = config.smtp_host.as_deref().ok_or_else(|| {
                NotifyError::Config("SMTP_HOST is required for the smtp adapter".to_string())
            })?;
            Ok(Arc::new(SmtpMailer::new(
                host,
                config.smtp_port,
                config.smtp_user.clone(),
                config.smtp_pass.clone(),
            )))
        }
        other => Err(NotifyError::Config(format!("unknown MAIL_ADAPTER: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_adapter_requires_host() {
        let mut config = Config::for_tests();
        config.mail_adapter = "smtp".to_string();
        assert!(matches!(from_config(&config), Err(NotifyError::Config(_))));
    }

    #[test]
    fn unknown_adapter_is_rejected() {
        let mut config = Config::for_tests();
        config.mail_adapter = "pigeon".to_string();
        assert!(from_config(&config).is_err());
    }

    #[tokio::test]
    async fn console_mailer_always_succeeds() {
        let message = EmailMessage {
            to: "ops@example.com".to_string(),
            from: "no-reply@example.com".to_string(),
            subject: "hello".to_string(),
            body: "body".to_string(),
        };
        assert!(ConsoleMailer.send(&message).await.is_ok());
    }
}
