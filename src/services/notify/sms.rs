use std::sync::Arc;

use async_trait::async_trait;

use super::NotifyError;
use crate::config::Config;

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, text: &str) -> Result<(), NotifyError>;
}

/// Logs messages instead of sending them.
#[derive(Debug, Default)]
pub struct ConsoleSms;

#[async_trait]
impl SmsSender for ConsoleSms {
    async fn send(&self, phone: &str, text: &str) -> Result<(), NotifyError> {
        tracing::info!(to = %phone, text = %text, "sms sent (console)");
        Ok(())
    }
}

pub fn from_config(config: &Config) -> Result<Arc<dyn SmsSender>, NotifyError> {
    match config.sms_adapter.as_str() {
        "console" => Ok(Arc::new(ConsoleSms)),
        other => Err(NotifyError::Config(format!("unknown SMS_ADAPTER: {other}"))),
    }
}
