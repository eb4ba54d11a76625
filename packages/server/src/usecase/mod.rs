//! UseCase layer
//!
//! - `handle_message`: 受信フレームの分類とルーティング（MessageDispatcher）
//! - `request_handler`: trebuchet リクエストの処理（start / stop / connection_terminate）
//! - `send_gql_message`: クライアントへの送信
//! - `publish`: Pub/Sub のファンアウト
//! - `run_scheduled_jobs`: スケジュールジョブのディスパッチ
//! - `process_stage_time_limit`: MEETING_STAGE_TIME_LIMIT_END の処理
//! - `connection_lifecycle`: ハンドシェイクと切断処理

mod connection_lifecycle;
mod data_loader;
mod error;
mod handle_message;
mod process_stage_time_limit;
mod publish;
mod request_handler;
mod run_scheduled_jobs;
mod send_gql_message;
mod task;

pub use connection_lifecycle::ConnectionLifecycleUseCase;
pub use data_loader::DataLoader;
pub use error::{ConnectError, ProcessJobError, RunScheduledJobsError};
pub use handle_message::{DispatchOutcome, MessageDispatcher};
pub use process_stage_time_limit::{
    DeliveryTier, MEETING_STAGE_TIME_LIMIT_PAYLOAD, MeetingStageTimeLimitProcessor,
};
pub use publish::{PublishOptions, Publisher};
pub use request_handler::TrebuchetRequestHandler;
pub use run_scheduled_jobs::{JobOutcome, RunScheduledJobsUseCase, spawn_poll_loop};
pub use send_gql_message::send_gql_message;
pub use task::spawn_reported;
