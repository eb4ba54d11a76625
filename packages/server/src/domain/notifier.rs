//! 外部チャット連携の送信インターフェース

use async_trait::async_trait;

use super::error::NotifyError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlackNotifier: Send + Sync {
    /// bot トークンでチャンネルに投稿する。`ok: false` は `NotifyError::Rejected`。
    async fn post_message(
        &self,
        bot_access_token: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), NotifyError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MattermostNotifier: Send + Sync {
    /// incoming webhook に投稿する。非 2xx は `NotifyError::Rejected`。
    async fn post_webhook(&self, webhook_url: &str, text: &str) -> Result<(), NotifyError>;
}
