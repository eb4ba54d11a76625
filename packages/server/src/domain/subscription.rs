//! Pub/Sub のトピックと購読
//!
//! `SubscriberRegistry` はプロセス全体の購読者インデックス。Publisher はここから送信先を引くだけで、
//! 登録・解除は `Subscription` の生成と drop が行う。

use std::{
    fmt,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use super::value_object::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionChannel {
    Team,
    Notification,
    Meeting,
    Organization,
    Task,
}

impl SubscriptionChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Team => "TEAM",
            Self::Notification => "NOTIFICATION",
            Self::Meeting => "MEETING",
            Self::Organization => "ORGANIZATION",
            Self::Task => "TASK",
        }
    }

    /// クライアントに返すルートフィールド名（例: `teamSubscription`）
    pub fn subscription_field(&self) -> &'static str {
        match self {
            Self::Team => "teamSubscription",
            Self::Notification => "notificationSubscription",
            Self::Meeting => "meetingSubscription",
            Self::Organization => "organizationSubscription",
            Self::Task => "taskSubscription",
        }
    }
}

/// `CHANNEL:key` で識別されるトピック
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    pub channel: SubscriptionChannel,
    pub key: String,
}

impl Topic {
    pub fn new(channel: SubscriptionChannel, key: impl Into<String>) -> Self {
        Self {
            channel,
            key: key.into(),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel.as_str(), self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// 購読者に配られるイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedEvent {
    /// `{ "<channel>Subscription": { "fieldName": type, "<type>": data } }`
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutator_id: Option<ConnectionId>,
}

pub type EventSender = mpsc::UnboundedSender<Arc<PublishedEvent>>;
pub type EventReceiver = mpsc::UnboundedReceiver<Arc<PublishedEvent>>;

/// 購読者インデックス
pub trait SubscriberRegistry: Send + Sync {
    /// トピックに購読者を追加し、イベントの受信口を返す
    fn subscribe(&self, topic: &Topic) -> (SubscriptionId, EventReceiver);

    /// 購読者を削除する。存在しなければ false。
    fn unsubscribe(&self, topic: &Topic, id: SubscriptionId) -> bool;

    /// トピックの現在の購読者への送信口（参照のみ）
    fn senders(&self, topic: &Topic) -> Vec<EventSender>;

    fn subscriber_count(&self, topic: &Topic) -> usize;
}

/// キャンセル可能なイベントストリーム。drop されると購読解除される。
pub struct Subscription {
    topic: Topic,
    id: SubscriptionId,
    receiver: EventReceiver,
    registry: Arc<dyn SubscriberRegistry>,
}

impl Subscription {
    pub fn open(registry: Arc<dyn SubscriberRegistry>, topic: Topic) -> Self {
        let (id, receiver) = registry.subscribe(&topic);
        tracing::debug!("Subscription {:?} opened on {}", id, topic);
        Self {
            topic,
            id,
            receiver,
            registry,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl Stream for Subscription {
    type Item = Arc<PublishedEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.topic, self.id);
        tracing::debug!("Subscription {:?} closed on {}", self.id, self.topic);
    }
}
