//! Repository 実装
//!
//! - `inmemory`: `tokio::sync::Mutex` で保護したインメモリ実装
//! - `fixtures`: JSON フィクスチャからの初期データ投入

pub mod fixtures;
pub mod inmemory;

pub use fixtures::{FixtureError, Fixtures, InMemoryRepositories};
pub use inmemory::{
    InMemoryIntegrationRepository, InMemoryMeetingRepository, InMemoryNotificationRepository,
    InMemoryScheduledJobRepository,
};
