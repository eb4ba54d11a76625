//! インメモリの SubscriberRegistry 実装
//!
//! `Subscription` の drop から同期的に解除されるため、`std::sync::Mutex` を使う。
//! ロックの中では送信しない（Publisher は送信口の複製を受け取ってから送る）。

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc;

use crate::domain::{EventReceiver, EventSender, SubscriberRegistry, SubscriptionId, Topic};

/// トピックごとの購読者の送信口
pub struct InMemorySubscriberRegistry {
    topics: Mutex<HashMap<Topic, HashMap<SubscriptionId, EventSender>>>,
    next_id: AtomicU64,
}

impl InMemorySubscriberRegistry {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 購読者が 1 人以上いるトピックの数
    pub fn topic_count(&self) -> usize {
        self.topics().len()
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<Topic, HashMap<SubscriptionId, EventSender>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemorySubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberRegistry for InMemorySubscriberRegistry {
    fn subscribe(&self, topic: &Topic) -> (SubscriptionId, EventReceiver) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.topics().entry(topic.clone()).or_default().insert(id, tx);
        (id, rx)
    }

    fn unsubscribe(&self, topic: &Topic, id: SubscriptionId) -> bool {
        let mut topics = self.topics();
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };
        let removed = subscribers.remove(&id).is_some();
        if subscribers.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    fn senders(&self, topic: &Topic) -> Vec<EventSender> {
        self.topics()
            .get(topic)
            .map(|subscribers| {
                subscribers
                    .values()
                    .filter(|sender| !sender.is_closed())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics().get(topic).map(HashMap::len).unwrap_or(0)
    }
}
