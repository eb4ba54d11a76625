//! InMemory Repository 実装
//!
//! ドメインモデルをそのままストレージとして保持する。
//! 永続化が必要になったら、各 trait の DB 実装を横に追加する。

pub mod integration;
pub mod meeting;
pub mod notification;
pub mod scheduled_job;

pub use integration::InMemoryIntegrationRepository;
pub use meeting::InMemoryMeetingRepository;
pub use notification::InMemoryNotificationRepository;
pub use scheduled_job::InMemoryScheduledJobRepository;
