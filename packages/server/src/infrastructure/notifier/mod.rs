//! 外部チャット連携の送信実装
//!
//! - `slack`: Slack Web API（`chat.postMessage`）
//! - `mattermost`: Mattermost の incoming webhook

pub mod mattermost;
pub mod slack;

pub use mattermost::MattermostWebhookNotifier;
pub use slack::SlackApiNotifier;

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use tokio::net::TcpListener;

    /// テスト用の HTTP サーバーを起動し、ベース URL を返す
    pub(crate) async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
