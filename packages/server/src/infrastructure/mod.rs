//! Infrastructure layer
//!
//! ドメイン層が定義する trait の具体的な実装。
//!
//! - `pubsub`: プロセス内の購読者インデックス
//! - `repository`: インメモリのストレージとフィクスチャ読み込み
//! - `notifier`: Slack / Mattermost への HTTP 送信
//! - `executor`: query / mutation の上流 GraphQL への転送
//! - `reporter`: tracing への障害報告
//! - `dto`: 管理 HTTP API の入出力

pub mod dto;
pub mod executor;
pub mod notifier;
pub mod pubsub;
pub mod reporter;
pub mod repository;
