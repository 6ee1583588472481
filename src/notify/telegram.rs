// Telegram Bot API: POST /bot<token>/sendMessage

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Alert, Notifier, NotifyError};
use crate::config::TelegramSettings;

const PLACEHOLDER_PREFIX: &str = "REPLACE";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
    dry_run: bool,
}

impl TelegramNotifier {
    pub fn new(settings: &TelegramSettings, dry_run: bool) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            chat_id: settings.chat_id.clone(),
            dry_run,
        })
    }

    /// Token and chat id are set and are not the template placeholders
    pub fn is_configured(&self) -> bool {
        let set = |s: &str| !s.trim().is_empty() && !s.starts_with(PLACEHOLDER_PREFIX);
        set(&self.token) && set(&self.chat_id)
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        if self.dry_run {
            info!(source = %alert.source, "[DRY-RUN] Telegram message would be:\n{}", alert.text);
            return Ok(());
        }
        if !self.is_configured() {
            warn!(source = %alert.source, "Telegram token/chat-id not set, skipping send:\n{}", alert.text);
            return Ok(());
        }

        let payload = SendMessage { chat_id: &self.chat_id, text: &alert.text };
        let response = self.client.post(self.endpoint()).json(&payload).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status: status.as_u16(), body });
        }
        debug!(source = %alert.source, "Telegram message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::AlertSource;

    fn settings(token: &str, chat_id: &str) -> TelegramSettings {
        TelegramSettings {
            token: token.to_string(),
            chat_id: chat_id.to_string(),
            // nothing listens here, a real request would fail
            api_base: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_placeholder_credentials_are_not_configured() {
        assert!(!TelegramNotifier::new(&settings("", "1"), false).unwrap().is_configured());
        assert!(!TelegramNotifier::new(&settings("REPLACE_WITH_YOUR_TELEGRAM_BOT_TOKEN", "1"), false)
            .unwrap()
            .is_configured());
        assert!(!TelegramNotifier::new(&settings("123:abc", "REPLACE_WITH_YOUR_CHAT_ID"), false)
            .unwrap()
            .is_configured());
        assert!(TelegramNotifier::new(&settings("123:abc", "42"), false).unwrap().is_configured());
    }

    #[test]
    fn test_endpoint() {
        let notifier = TelegramNotifier::new(&settings("123:abc", "42"), false).unwrap();
        assert_eq!(notifier.endpoint(), "http://127.0.0.1:9/bot123:abc/sendMessage");
    }

    #[tokio::test]
    async fn test_dry_run_and_unconfigured_skip_network() {
        let alert = Alert::new(AlertSource::Tape, "BTCUSDT", "hello");
        let dry = TelegramNotifier::new(&settings("123:abc", "42"), true).unwrap();
        assert!(dry.send(&alert).await.is_ok());
        let unset = TelegramNotifier::new(&settings("", ""), false).unwrap();
        assert!(unset.send(&alert).await.is_ok());
    }
}
