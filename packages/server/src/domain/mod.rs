//! Domain layer
//!
//! 外部 I/O に依存しない型と、ドメインが必要とするインターフェース（trait）を定義します。
//!
//! - `value_object`: ID などの値オブジェクト
//! - `entity`: ScheduledJob / Meeting / Notification などのエンティティ
//! - `message`: trebuchet プロトコルのリクエスト・レスポンス
//! - `frame`: 受信フレームの分類
//! - `reliable`: Reliable Message Protocol（ACK / 再送）
//! - `connection`: ソケット単位の ConnectionContext
//! - `subscription`: Pub/Sub のトピックと購読ストリーム
//! - `repository`, `notifier`, `executor`, `reporter`: 外部コラボレーターの trait

pub mod connection;
pub mod entity;
pub mod error;
pub mod executor;
pub mod frame;
pub mod message;
pub mod notifier;
pub mod reliable;
pub mod reporter;
pub mod repository;
pub mod subscription;
pub mod value_object;

pub use connection::{ConnectionContext, KeepAlive, ReadyAction, ReadyGate, Viewer};
pub use entity::{
    JobKind, MattermostAuth, Meeting, Notification, NotificationEvent, NotificationKind,
    NotificationStatus, ScheduledJob, SlackAuth, SlackNotification,
};
pub use error::{ExecutorError, NotifyError, RepositoryError, SubscribeError, ValueObjectError};
pub use executor::{OperationExecutor, RequestHandler};
pub use frame::{InboundFrame, PING, PONG, classify};
pub use message::{
    GqlMessageType, OperationPayload, OutboundFrame, OutboundSender, TrebuchetRequest,
    TrebuchetResponse,
};
pub use notifier::{MattermostNotifier, SlackNotifier};
#[cfg(test)]
pub use notifier::{MockMattermostNotifier, MockSlackNotifier};
pub use reliable::{ReliableConfig, ReliableControl, ReliableOutbox};
pub use reporter::ErrorReporter;
pub use repository::{
    IntegrationRepository, MeetingRepository, NotificationRepository, ScheduledJobRepository,
};
pub use subscription::{
    EventReceiver, EventSender, PublishedEvent, SubscriberRegistry, Subscription, SubscriptionChannel,
    SubscriptionId, Topic,
};
pub use value_object::{
    ConnectionId, JobId, MeetingId, NotificationId, OperationId, TeamId, Timestamp, UserId,
};
