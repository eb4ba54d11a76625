//! UseCase: trebuchet リクエストの処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - TrebuchetRequestHandler::handle() メソッド
//!
//! ### なぜこのテストが必要か
//! - subscription の開始・停止でトピック購読が正しく管理されることを保証
//! - publish されたイベントが reliable な data メッセージとして届くことを保証
//! - 購読権限の無いトピックが拒否されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：query の実行、subscription の開始と停止
//! - 異常系：権限の無いトピック、executor の失敗
//! - エッジケース：id の無い subscription、connection_terminate

use std::{
    convert::Infallible,
    sync::{Arc, Weak},
};

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{Map, Value};

use crate::domain::{
    ConnectionContext, ErrorReporter, GqlMessageType, OperationExecutor, OperationId, OperationPayload,
    RequestHandler, SubscribeError, SubscriberRegistry, Subscription, TrebuchetRequest,
    TrebuchetResponse,
};

use super::{send_gql_message::send_gql_message, task::spawn_reported};

/// 既定の RequestHandler
///
/// subscription はこの層で Pub/Sub に接続し、query / mutation は OperationExecutor に委譲する。
pub struct TrebuchetRequestHandler {
    /// SubscriberRegistry（購読者インデックス）
    registry: Arc<dyn SubscriberRegistry>,
    /// OperationExecutor（query / mutation の実行）
    executor: Arc<dyn OperationExecutor>,
    /// 購読転送タスクの失敗の報告先
    reporter: Arc<dyn ErrorReporter>,
}

impl TrebuchetRequestHandler {
    /// 新しい TrebuchetRequestHandler を作成
    pub fn new(
        registry: Arc<dyn SubscriberRegistry>,
        executor: Arc<dyn OperationExecutor>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            registry,
            executor,
            reporter,
        }
    }

    fn start_subscription(
        &self,
        id: Option<OperationId>,
        payload: &OperationPayload,
        context: &Arc<ConnectionContext>,
    ) -> Option<TrebuchetResponse> {
        let Some(op_id) = id else {
            tracing::warn!(
                "Subscription without an id on '{}' has no sink; ignoring",
                context.id()
            );
            return None;
        };

        let topic = match payload.subscription_topic() {
            Ok(topic) => topic,
            Err(e) => return Some(TrebuchetResponse::error(Some(op_id), e.to_string())),
        };
        let allowed = context
            .viewer()
            .map(|viewer| viewer.can_subscribe(&topic))
            .unwrap_or(false);
        if !allowed {
            let error = SubscribeError::Forbidden(topic);
            tracing::warn!("Rejected subscription on '{}': {}", context.id(), error);
            return Some(TrebuchetResponse::error(Some(op_id), error.to_string()));
        }

        tracing::info!("Connection '{}' subscribed to {} as {}", context.id(), topic, op_id);
        let subscription = Subscription::open(self.registry.clone(), topic);
        let forwarder = spawn_reported(
            self.reporter.clone(),
            "subscription.forward",
            forward_events(subscription, Arc::downgrade(context), op_id.clone()),
        );
        context.track_subscription(op_id, forwarder.abort_handle());
        None
    }

    async fn execute_operation(
        &self,
        id: Option<OperationId>,
        payload: &OperationPayload,
        context: &ConnectionContext,
    ) -> Option<TrebuchetResponse> {
        match self.executor.execute(payload, context.viewer()).await {
            Ok(result) => Some(TrebuchetResponse::data(id, result)),
            Err(e) => {
                tracing::warn!("Operation failed on '{}': {}", context.id(), e);
                Some(TrebuchetResponse::error(id, e.to_string()))
            }
        }
    }
}

#[async_trait]
impl RequestHandler for TrebuchetRequestHandler {
    async fn handle(
        &self,
        request: TrebuchetRequest,
        context: Arc<ConnectionContext>,
    ) -> Option<TrebuchetResponse> {
        match request {
            TrebuchetRequest::Start { id, payload } if payload.is_subscription() => {
                self.start_subscription(id, &payload, &context)
            }
            TrebuchetRequest::Start { id, payload } => {
                self.execute_operation(id, &payload, &context).await
            }
            TrebuchetRequest::Stop { id } => {
                if !context.cancel_subscription(&id) {
                    tracing::debug!("Stop for unknown subscription {} on '{}'", id, context.id());
                }
                Some(TrebuchetResponse::complete(id))
            }
            TrebuchetRequest::ConnectionTerminate => {
                tracing::info!("Connection '{}' requested termination", context.id());
                context.close();
                None
            }
        }
    }
}

/// 購読イベントを reliable な data メッセージとして転送する
async fn forward_events(
    mut subscription: Subscription,
    context: Weak<ConnectionContext>,
    op_id: OperationId,
) -> Result<(), Infallible> {
    while let Some(event) = subscription.next().await {
        let Some(context) = context.upgrade() else {
            break;
        };

        let mut payload = Map::new();
        payload.insert("data".to_string(), event.data.clone());
        let mut extensions = Map::new();
        if let Some(operation_id) = &event.operation_id {
            extensions.insert("operationId".to_string(), Value::String(operation_id.clone()));
        }
        if let Some(mutator_id) = &event.mutator_id {
            extensions.insert(
                "mutatorId".to_string(),
                Value::String(mutator_id.as_str().to_string()),
            );
        }
        if !extensions.is_empty() {
            payload.insert("extensions".to_string(), Value::Object(extensions));
        }

        if !send_gql_message(
            &context,
            Some(&op_id),
            GqlMessageType::Data,
            true,
            Some(Value::Object(payload)),
        ) {
            break;
        }
    }
    tracing::debug!("Subscription forwarder for {} stopped", op_id);
    Ok(())
}
