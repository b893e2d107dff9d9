//! Telegram Bot API sink

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    errors::{GridError, GridResult},
    notify::Notifier,
};

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: reqwest::Client,
    endpoint: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str) -> GridResult<Self> {
        Self::with_base_url(TELEGRAM_API_URL, bot_token)
    }

    pub fn with_base_url(base_url: &str, bot_token: &str) -> GridResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GridError::Http {
                message: "Failed to build HTTP client".to_string(),
                source: Some(e.into()),
            })?;

        Ok(Self {
            http,
            endpoint: format!("{}/bot{}/sendMessage", base_url.trim_end_matches('/'), bot_token),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, user_id: i64, text: &str) -> GridResult<()> {
        let body = SendMessage {
            chat_id: user_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| GridError::Http {
                message: "sendMessage failed".to_string(),
                source: Some(e.into()),
            })?;

        let status = response.status();
        let reply: ApiResponse = response
            .json()
            .await
            .map_err(|e| GridError::parsing("telegram sendMessage response", e))?;

        if !reply.ok {
            return Err(GridError::UpstreamApi {
                status: reply.error_code.unwrap_or(status.as_u16()),
                message: reply.description.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn posts_markdown_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "chat_id": 42,
                "text": "🟢 filled",
                "parse_mode": "Markdown"
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{}}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::with_base_url(&server.url(), "123:abc").unwrap();
        notifier.notify(42, "🟢 filled").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_errors_surface() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::with_base_url(&server.url(), "123:abc").unwrap();
        let err = notifier.notify(42, "hi").await.unwrap_err();
        assert!(matches!(err, GridError::UpstreamApi { status: 403, .. }));
    }
}
