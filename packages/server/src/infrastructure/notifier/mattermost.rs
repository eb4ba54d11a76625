//! Mattermost の incoming webhook を使った MattermostNotifier 実装

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{MattermostNotifier, NotifyError};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

pub struct MattermostWebhookNotifier {
    client: reqwest::Client,
}

impl MattermostWebhookNotifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl MattermostNotifier for MattermostWebhookNotifier {
    async fn post_webhook(&self, webhook_url: &str, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(webhook_url)
            .json(&WebhookPayload { text })
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected(format!("HTTP {}", status.as_u16())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::notifier::test_server::serve;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::Value;

    async fn fake_webhook(Json(body): Json<Value>) -> StatusCode {
        if body["text"].as_str().is_some_and(|text| !text.is_empty()) {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    #[tokio::test]
    async fn test_webhook_status_decides_result() {
        // テスト項目: 2xx は成功、それ以外は Rejected
        // given (前提条件):
        let base = serve(Router::new().route("/hooks/abc", post(fake_webhook))).await;
        let notifier = MattermostWebhookNotifier::with_timeout(Duration::from_secs(5)).unwrap();
        let url = format!("{}/hooks/abc", base);

        // when (操作):
        let ok = notifier.post_webhook(&url, "Time’s up!").await;
        let rejected = notifier.post_webhook(&url, "").await;

        // then (期待する結果):
        assert_eq!(ok, Ok(()));
        assert_eq!(rejected, Err(NotifyError::Rejected("HTTP 400".to_string())));
    }
}
