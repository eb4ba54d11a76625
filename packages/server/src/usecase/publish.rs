//! UseCase: Pub/Sub のファンアウト
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - Publisher::publish() メソッド
//!
//! ### なぜこのテストが必要か
//! - 同じトピックの購読者全員に届き、別トピックには届かないことを保証
//! - 切断済みの購読者がいてもエラーにならないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数購読者への配信
//! - エッジケース：購読者なし、受信側が drop 済み

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::{
    ConnectionId, PublishedEvent, SubscriberRegistry, SubscriptionChannel, Topic,
};

/// 発行元クライアントが自分のミューテーションのエコーを識別するためのタグ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub operation_id: Option<String>,
    pub mutator_id: Option<ConnectionId>,
}

/// Pub/Sub Publisher
pub struct Publisher {
    /// SubscriberRegistry（購読者インデックス、参照のみ）
    registry: Arc<dyn SubscriberRegistry>,
}

impl Publisher {
    /// 新しい Publisher を作成
    pub fn new(registry: Arc<dyn SubscriberRegistry>) -> Self {
        Self { registry }
    }

    /// `channel:key` の購読者全員にイベントを配る
    ///
    /// 送信キューに積むだけで、配信完了は待たない。
    /// 戻り値はイベントを積めた購読者の数（切断済みの購読者は数えない）。
    pub fn publish(
        &self,
        channel: SubscriptionChannel,
        key: &str,
        type_name: &str,
        data: Value,
        options: PublishOptions,
    ) -> usize {
        let topic = Topic::new(channel, key);
        let senders = self.registry.senders(&topic);
        if senders.is_empty() {
            tracing::debug!("No subscribers on {} for {}", topic, type_name);
            return 0;
        }

        let event = Arc::new(PublishedEvent {
            data: root_value(channel, type_name, data),
            operation_id: options.operation_id,
            mutator_id: options.mutator_id,
        });

        let delivered = senders
            .iter()
            .filter(|sender| sender.send(event.clone()).is_ok())
            .count();
        tracing::debug!(
            "Published {} on {} to {}/{} subscribers",
            type_name,
            topic,
            delivered,
            senders.len()
        );
        delivered
    }
}

/// `{ "<channel>Subscription": { "fieldName": type, "<type>": data } }`
fn root_value(channel: SubscriptionChannel, type_name: &str, data: Value) -> Value {
    let mut payload = Map::new();
    payload.insert("fieldName".to_string(), Value::String(type_name.to_string()));
    payload.insert(type_name.to_string(), data);

    let mut root = Map::new();
    root.insert(
        channel.subscription_field().to_string(),
        Value::Object(payload),
    );
    Value::Object(root)
}
