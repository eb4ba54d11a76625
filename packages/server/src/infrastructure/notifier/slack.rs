//! Slack Web API を使った SlackNotifier 実装
//!
//! Slack は失敗時も HTTP 200 で `{"ok": false, "error": "..."}` を返すので、
//! ステータスコードではなく `ok` を見る。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{NotifyError, SlackNotifier};

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    unfurl_links: bool,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackApiNotifier {
    client: reqwest::Client,
    api_base: String,
}

impl SlackApiNotifier {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// タイムアウト付きのクライアントを作る
    pub fn with_timeout(api_base: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self::new(client, api_base))
    }
}

#[async_trait]
impl SlackNotifier for SlackApiNotifier {
    async fn post_message(
        &self,
        bot_access_token: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(bot_access_token)
            .json(&PostMessageRequest {
                channel: channel_id,
                text,
                unfurl_links: false,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        if body.ok {
            tracing::debug!("Posted Slack message to channel '{}'", channel_id);
            Ok(())
        } else {
            Err(NotifyError::Rejected(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::notifier::test_server::serve;
    use axum::{Json, Router, http::HeaderMap, routing::post};
    use serde_json::{Value, json};

    async fn fake_post_message(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let authorized = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some("Bearer xoxb-good");
        if !authorized {
            return Json(json!({"ok": false, "error": "invalid_auth"}));
        }
        if body["channel"] != "C123" {
            return Json(json!({"ok": false, "error": "channel_not_found"}));
        }
        Json(json!({"ok": true}))
    }

    async fn notifier() -> SlackApiNotifier {
        let base = serve(Router::new().route("/chat.postMessage", post(fake_post_message))).await;
        SlackApiNotifier::with_timeout(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_ok_response_is_success() {
        // テスト項目: ok: true なら成功
        // given (前提条件):
        let notifier = notifier().await;

        // when (操作):
        let result = notifier.post_message("xoxb-good", "C123", "hello").await;

        // then (期待する結果):
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_ok_false_is_rejected() {
        // テスト項目: HTTP 200 でも ok: false なら Rejected
        // given (前提条件):
        let notifier = notifier().await;

        // when (操作):
        let result = notifier.post_message("xoxb-good", "C999", "hello").await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(NotifyError::Rejected("channel_not_found".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        // テスト項目: 接続できなければ Transport エラー
        // given (前提条件):
        let notifier =
            SlackApiNotifier::with_timeout("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();

        // when (操作):
        let result = notifier.post_message("xoxb-good", "C123", "hello").await;

        // then (期待する結果):
        assert!(matches!(result, Err(NotifyError::Transport(_))));
    }
}
