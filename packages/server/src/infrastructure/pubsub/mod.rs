//! Pub/Sub の購読者インデックス実装
//!
//! - `inmemory`: 単一プロセス内の HashMap 実装
//! - 将来的に: `redis` などプロセス間のブローカー

pub mod inmemory;

pub use inmemory::InMemorySubscriberRegistry;
