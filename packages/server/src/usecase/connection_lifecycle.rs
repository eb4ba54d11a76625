//! UseCase: 接続のライフサイクル
//!
//! ソケットが開くと ConnectionContext を作り、ハンドシェイクで viewer を確定して
//! ready にする。ready 前に届いたリクエストはここで FIFO 順に流される。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectionLifecycleUseCase の open() / handshake() / teardown() メソッド
//!
//! ### なぜこのテストが必要か
//! - ハンドシェイク前に積まれたリクエストが失われないことを保証
//! - 切断時に購読と再送キューが破棄されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：open → handshake → teardown
//! - 異常系：二重のハンドシェイク、切断済みの接続へのハンドシェイク
//! - エッジケース：二重の teardown

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::domain::{ConnectionContext, ConnectionId, OutboundSender, ReliableConfig, Viewer};

use super::error::ConnectError;

/// 接続ライフサイクルのユースケース
pub struct ConnectionLifecycleUseCase {
    /// 新しい接続に適用する reliable 再送の設定
    reliable_config: ReliableConfig,
    /// 開いている接続の ID
    open: Mutex<HashSet<ConnectionId>>,
}

impl ConnectionLifecycleUseCase {
    /// 新しい ConnectionLifecycleUseCase を作成
    pub fn new(reliable_config: ReliableConfig) -> Self {
        Self {
            reliable_config,
            open: Mutex::new(HashSet::new()),
        }
    }

    /// ソケットに対応する ConnectionContext を作成する（まだ ready ではない）
    pub fn open(&self, outbound: OutboundSender) -> Arc<ConnectionContext> {
        let context = Arc::new(ConnectionContext::new(outbound, self.reliable_config));
        let open = {
            let mut ids = self.open_ids();
            ids.insert(context.id().clone());
            ids.len()
        };
        tracing::info!("Connection '{}' opened ({} open)", context.id(), open);
        context
    }

    /// viewer を確定して ready にする
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - ready 前に積まれていて、いま流されたアクションの数
    /// * `Err(ConnectError)` - 切断済み、またはハンドシェイク済み
    pub fn handshake(
        &self,
        context: &ConnectionContext,
        viewer: Viewer,
    ) -> Result<usize, ConnectError> {
        if context.is_closed() {
            return Err(ConnectError::Closed(context.id().to_string()));
        }
        if !context.set_viewer(viewer) {
            return Err(ConnectError::AlreadyIdentified(context.id().to_string()));
        }

        let drained = context.mark_ready();
        tracing::info!(
            "Connection '{}' is ready ({} queued requests drained)",
            context.id(),
            drained
        );
        Ok(drained)
    }

    /// 接続を閉じ、購読と再送待ちを破棄する。2 回目以降は何もしない。
    ///
    /// connection_terminate で既に閉じられていても、ここで登録を外す。
    pub fn teardown(&self, context: &ConnectionContext) {
        let open = {
            let mut ids = self.open_ids();
            if !ids.remove(context.id()) {
                return;
            }
            ids.len()
        };
        let subscriptions = context.subscription_count();
        let pending = context.pending_reliable();
        context.close();
        tracing::info!(
            "Connection '{}' closed: {} subscriptions, {} unacknowledged messages dropped ({} open)",
            context.id(),
            subscriptions,
            pending,
            open
        );
    }

    pub fn open_connections(&self) -> usize {
        self.open_ids().len()
    }

    fn open_ids(&self) -> MutexGuard<'_, HashSet<ConnectionId>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OperationId, OutboundFrame, TeamId, UserId};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    fn viewer() -> Viewer {
        Viewer::new(
            UserId::new("u1".to_string()).unwrap(),
            vec![TeamId::new("t1".to_string()).unwrap()],
        )
    }

    #[tokio::test]
    async fn test_handshake_drains_queued_actions_in_order() {
        // テスト項目: ハンドシェイク前に積まれたアクションが FIFO 順に実行される
        // given (前提条件):
        let usecase = ConnectionLifecycleUseCase::new(ReliableConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let context = usecase.open(tx);
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            context.enqueue_or_run(Box::new(move || order.lock().unwrap().push(i)));
        }

        // when (操作):
        let drained = usecase.handshake(&context, viewer()).unwrap();

        // then (期待する結果):
        assert_eq!(drained, 3);
        assert!(context.is_ready());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(context.viewer(), Some(&viewer()));
    }

    #[tokio::test]
    async fn test_second_handshake_is_rejected() {
        // テスト項目: 二重のハンドシェイクはエラー
        // given (前提条件):
        let usecase = ConnectionLifecycleUseCase::new(ReliableConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let context = usecase.open(tx);
        usecase.handshake(&context, viewer()).unwrap();

        // when (操作):
        let result = usecase.handshake(&context, viewer());

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ConnectError::AlreadyIdentified(context.id().to_string()))
        );
    }

    #[tokio::test]
    async fn test_teardown_closes_once() {
        // テスト項目: teardown で購読が破棄され Close が 1 回だけ送られる
        // given (前提条件):
        let usecase = ConnectionLifecycleUseCase::new(ReliableConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let context = usecase.open(tx);
        let forwarder = tokio::spawn(std::future::pending::<()>());
        context.track_subscription(
            OperationId::new("sub1".to_string()).unwrap(),
            forwarder.abort_handle(),
        );

        // when (操作):
        usecase.teardown(&context);
        usecase.teardown(&context);

        // then (期待する結果):
        assert_eq!(usecase.open_connections(), 0);
        assert_eq!(context.subscription_count(), 0);
        assert!(forwarder.await.unwrap_err().is_cancelled());
        assert_eq!(rx.recv().await, Some(OutboundFrame::Close));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handshake_after_teardown_fails() {
        // テスト項目: 切断済みの接続にはハンドシェイクできない
        // given (前提条件):
        let usecase = ConnectionLifecycleUseCase::new(ReliableConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let context = usecase.open(tx);
        usecase.teardown(&context);

        // when (操作):
        let result = usecase.handshake(&context, viewer());

        // then (期待する結果):
        assert_eq!(result, Err(ConnectError::Closed(context.id().to_string())));
    }

    #[tokio::test]
    async fn test_teardown_after_client_terminate_releases_connection() {
        // テスト項目: クライアントが先に閉じた接続も teardown で登録が外れる
        // given (前提条件):
        let usecase = ConnectionLifecycleUseCase::new(ReliableConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let context = usecase.open(tx);
        context.close();

        // when (操作):
        usecase.teardown(&context);

        // then (期待する結果):
        assert_eq!(usecase.open_connections(), 0);
    }
}
