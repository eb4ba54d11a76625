//! UseCase: 受信メッセージの処理（MessageDispatcher）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MessageDispatcher::dispatch() メソッド
//! - フレームの分類（PONG / 制御フレーム / JSON）とルーティング
//!
//! ### なぜこのテストが必要か
//! - PONG や制御フレームが GraphQL 処理に流れないことを保証
//! - 不正な入力で接続が落ちない・何も送信されないことを保証
//! - ハンドシェイク前のリクエストが失われないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：ready 後の単体リクエスト、バッチリクエスト
//! - 異常系：不正な JSON、ハンドラーの panic
//! - エッジケース：ready 前のリクエスト、id の無いリクエスト

use std::{
    convert::Infallible,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tokio::time::Instant;

use crate::domain::{
    ConnectionContext, ErrorReporter, InboundFrame, ReliableControl, RequestHandler,
    TrebuchetRequest, classify,
};

use super::{send_gql_message::send_gql_message, task::panic_message, task::spawn_reported};

/// 分類結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Pong,
    ReliableControl,
    /// パースできたリクエスト数（ready 前なら保留された）
    Requests(usize),
    Discarded,
    /// 分類・ルーティング中に panic した（reporter に報告済み）
    Failed,
}

/// 受信メッセージのディスパッチャー
pub struct MessageDispatcher {
    /// RequestHandler（GraphQL リクエスト処理の抽象化）
    handler: Arc<dyn RequestHandler>,
    /// ErrorReporter（障害報告先）
    reporter: Arc<dyn ErrorReporter>,
}

impl MessageDispatcher {
    /// 新しい MessageDispatcher を作成
    pub fn new(handler: Arc<dyn RequestHandler>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { handler, reporter }
    }

    /// 受信フレームを 1 つ処理する
    ///
    /// 分類は到着順に同期的に行い、GraphQL リクエストは 1 件ずつ独立したタスクとして処理する。
    /// ここで起きた panic は報告されるだけで、接続は維持される。
    pub fn dispatch(&self, context: &Arc<ConnectionContext>, bytes: &[u8]) -> DispatchOutcome {
        match catch_unwind(AssertUnwindSafe(|| self.route(context, bytes))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                self.reporter
                    .report("handle_message", &panic_message(panic.as_ref()));
                DispatchOutcome::Failed
            }
        }
    }

    fn route(&self, context: &Arc<ConnectionContext>, bytes: &[u8]) -> DispatchOutcome {
        match classify(bytes) {
            InboundFrame::Pong => {
                context.keep_alive().touch(Instant::now());
                DispatchOutcome::Pong
            }
            InboundFrame::ReliableControl(control) => {
                handle_reliable_control(context, control);
                DispatchOutcome::ReliableControl
            }
            InboundFrame::Requests(requests) => {
                let count = requests.len();
                let handler = self.handler.clone();
                let reporter = self.reporter.clone();
                let connection = context.clone();
                context.enqueue_or_run(Box::new(move || {
                    handle_parsed_requests(handler, reporter, connection, requests);
                }));
                DispatchOutcome::Requests(count)
            }
            InboundFrame::Discarded => DispatchOutcome::Discarded,
        }
    }
}

fn handle_reliable_control(context: &ConnectionContext, control: ReliableControl) {
    match control {
        ReliableControl::Ack(mid) => {
            if !context.acknowledge(mid) {
                tracing::debug!("ACK for unknown mid {} on '{}'", mid, context.id());
            }
        }
        ReliableControl::Request(mid) => {
            if !context.resend(mid) {
                tracing::debug!("Resend requested for unknown mid {} on '{}'", mid, context.id());
            }
        }
    }
}

/// リクエストごとに独立したタスクを起動する。レスポンスは id がある場合のみ送る。
fn handle_parsed_requests(
    handler: Arc<dyn RequestHandler>,
    reporter: Arc<dyn ErrorReporter>,
    context: Arc<ConnectionContext>,
    requests: Vec<TrebuchetRequest>,
) {
    for request in requests {
        let handler = handler.clone();
        let context = context.clone();
        spawn_reported(reporter.clone(), "handle_graphql_request", async move {
            let response = handler.handle(request, context.clone()).await;
            // no id = no sink on the client
            if let Some(response) = response
                && let Some(op_id) = response.id.as_ref()
            {
                send_gql_message(&context, Some(op_id), response.kind, false, response.payload);
            }
            Ok::<(), Infallible>(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{OutboundFrame, PONG, ReliableConfig, TrebuchetResponse},
        usecase::task::tests::RecordingReporter,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::{sync::Mutex, time::Duration};
    use tokio::sync::mpsc;

    /// リクエストを記録し、id をそのまま返すハンドラー
    #[derive(Default)]
    struct EchoHandler {
        seen: Mutex<Vec<TrebuchetRequest>>,
    }

    #[async_trait]
    impl RequestHandler for EchoHandler {
        async fn handle(
            &self,
            request: TrebuchetRequest,
            _context: Arc<ConnectionContext>,
        ) -> Option<TrebuchetResponse> {
            self.seen.lock().unwrap().push(request.clone());
            match request {
                TrebuchetRequest::Start { id, .. } => {
                    Some(TrebuchetResponse::data(id, json!({"data": {"echo": true}})))
                }
                _ => None,
            }
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl RequestHandler for PanickingHandler {
        async fn handle(
            &self,
            _request: TrebuchetRequest,
            _context: Arc<ConnectionContext>,
        ) -> Option<TrebuchetResponse> {
            panic!("handler exploded")
        }
    }

    struct Fixture {
        handler: Arc<EchoHandler>,
        reporter: Arc<RecordingReporter>,
        dispatcher: MessageDispatcher,
        context: Arc<ConnectionContext>,
        rx: mpsc::UnboundedReceiver<OutboundFrame>,
    }

    fn fixture() -> Fixture {
        let handler = Arc::new(EchoHandler::default());
        let reporter = Arc::new(RecordingReporter::default());
        let dispatcher = MessageDispatcher::new(handler.clone(), reporter.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let context = Arc::new(ConnectionContext::new(tx, ReliableConfig::default()));
        Fixture {
            handler,
            reporter,
            dispatcher,
            context,
            rx,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    fn start(id: &str) -> Vec<u8> {
        format!(r#"{{"type":"start","id":"{}","payload":{{"query":"query {{ x }}"}}}}"#, id)
            .into_bytes()
    }

    #[tokio::test]
    async fn test_pong_resets_keep_alive_without_routing() {
        // テスト項目: PONG は keep-alive をリセットし、GraphQL 処理には渡らない
        // given (前提条件):
        let mut f = fixture();
        f.context.mark_ready();

        // when (操作):
        let outcome = f.dispatcher.dispatch(&f.context, &[PONG]);
        settle().await;

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::Pong);
        assert_eq!(f.context.keep_alive().pong_count(), 1);
        assert!(f.handler.seen.lock().unwrap().is_empty());
        assert!(f.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_four_byte_frame_is_reliable_control() {
        // テスト項目: 4 バイトのフレームは JSON として妥当でも ACK として処理される
        // given (前提条件):
        let mut f = fixture();
        f.context.mark_ready();
        f.context.send_reliable(r#"{"type":"data"}"#);
        let _ = f.rx.recv().await;
        assert_eq!(f.context.pending_reliable(), 1);

        // when (操作): mid 0 の ACK は 0u32、"[{}]" は JSON としても妥当な 4 バイト
        let ack = f.dispatcher.dispatch(&f.context, &ReliableControl::Ack(0).encode());
        let json_like = f.dispatcher.dispatch(&f.context, b"[{}]");
        settle().await;

        // then (期待する結果):
        assert_eq!(ack, DispatchOutcome::ReliableControl);
        assert_eq!(json_like, DispatchOutcome::ReliableControl);
        assert_eq!(f.context.pending_reliable(), 0);
        assert!(f.handler.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resend_request_sends_frame_again() {
        // テスト項目: REQ 制御フレームで保持中のメッセージが再送される
        // given (前提条件):
        let mut f = fixture();
        f.context.send_reliable(r#"{"type":"data"}"#);
        let original = f.rx.recv().await.unwrap();

        // when (操作):
        let outcome = f
            .dispatcher
            .dispatch(&f.context, &ReliableControl::Request(0).encode());

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::ReliableControl);
        assert_eq!(f.rx.recv().await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_malformed_json_is_silently_dropped() {
        // テスト項目: 不正な JSON は例外も送信も発生させない
        // given (前提条件):
        let mut f = fixture();
        f.context.mark_ready();

        // when (操作):
        let outcome = f.dispatcher.dispatch(&f.context, b"{not json at all");
        settle().await;

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::Discarded);
        assert!(f.rx.try_recv().is_err());
        assert!(f.reporter.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_with_id_gets_response() {
        // テスト項目: id 付きリクエストにはレスポンスが返る
        // given (前提条件):
        let mut f = fixture();
        f.context.mark_ready();

        // when (操作):
        let outcome = f.dispatcher.dispatch(&f.context, &start("42"));

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::Requests(1));
        match f.rx.recv().await.unwrap() {
            OutboundFrame::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["id"], "42");
                assert_eq!(value["type"], "data");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_without_id_is_fire_and_forget() {
        // テスト項目: id の無いリクエストは処理されるがレスポンスは送られない
        // given (前提条件):
        let mut f = fixture();
        f.context.mark_ready();

        // when (操作):
        f.dispatcher.dispatch(
            &f.context,
            br#"{"type":"start","payload":{"query":"mutation { x }"}}"#,
        );
        settle().await;

        // then (期待する結果):
        assert_eq!(f.handler.seen.lock().unwrap().len(), 1);
        assert!(f.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_requests_before_ready_are_queued_then_drained() {
        // テスト項目: ready 前のリクエストは保留され、ready 後に全件処理される
        // given (前提条件):
        let f = fixture();
        f.dispatcher.dispatch(&f.context, &start("1"));
        f.dispatcher.dispatch(&f.context, &start("2"));
        f.dispatcher.dispatch(&f.context, &start("3"));
        settle().await;
        assert_eq!(f.context.queued(), 3);
        assert!(f.handler.seen.lock().unwrap().is_empty());

        // when (操作):
        let drained = f.context.mark_ready();
        settle().await;

        // then (期待する結果):
        assert_eq!(drained, 3);
        let seen = f.handler.seen.lock().unwrap();
        let ids: Vec<String> = seen
            .iter()
            .filter_map(|request| match request {
                TrebuchetRequest::Start { id: Some(id), .. } => Some(id.as_str().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_batch_is_dispatched_per_request() {
        // テスト項目: バッチの各リクエストが独立して処理される
        // given (前提条件):
        let mut f = fixture();
        f.context.mark_ready();
        let batch = br#"[{"type":"start","id":"a","payload":{}},{"type":"start","id":"b","payload":{}}]"#;

        // when (操作):
        let outcome = f.dispatcher.dispatch(&f.context, batch);

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::Requests(2));
        let mut ids = Vec::new();
        for _ in 0..2 {
            if let Some(OutboundFrame::Text(text)) = f.rx.recv().await {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                ids.push(value["id"].as_str().unwrap().to_string());
            }
        }
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_handler_panic_is_reported_and_connection_survives() {
        // テスト項目: ハンドラーの panic は報告され、接続は使い続けられる
        // given (前提条件):
        let reporter = Arc::new(RecordingReporter::default());
        let dispatcher = MessageDispatcher::new(Arc::new(PanickingHandler), reporter.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let context = Arc::new(ConnectionContext::new(tx, ReliableConfig::default()));
        context.mark_ready();

        // when (操作):
        dispatcher.dispatch(&context, &start("1"));
        settle().await;
        let after = dispatcher.dispatch(&context, &[PONG]);

        // then (期待する結果):
        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "handle_graphql_request");
        assert_eq!(after, DispatchOutcome::Pong);
        assert!(!context.is_closed());
    }
}
