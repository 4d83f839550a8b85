//! Outbound side-effecting channels. Callers treat failures as non-fatal and
//! never roll back the business transaction they follow.

pub mod mail;
pub mod sms;

pub use mail::{ConsoleMailer, EmailMessage, Mailer, SmtpMailer};
pub use sms::{ConsoleSms, SmsSender};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}
