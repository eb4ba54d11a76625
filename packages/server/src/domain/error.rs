//! Domain errors.

use thiserror::Error;

use super::subscription::Topic;

/// 値オブジェクト生成時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record '{0}' already exists")]
    Duplicate(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// 外部チャット連携（Slack / Mattermost）への送信エラー
///
/// いずれもソフトエラーとして扱われ、次の配信手段へフォールバックする。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// ネットワークエラーなど、レスポンスが得られなかった
    #[error("Transport error: {0}")]
    Transport(String),

    /// レスポンスは得られたが、成功ではなかった（ok: false, 非 2xx）
    #[error("Rejected by integration: {0}")]
    Rejected(String),
}

/// GraphQL オペレーション実行のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("No GraphQL executor is configured")]
    Unavailable,

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Upstream returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// subscription 開始時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("Subscription variables must name a channel and key: {0}")]
    InvalidTopic(String),

    #[error("Viewer may not subscribe to {0}")]
    Forbidden(Topic),
}
