//! Shared application state.

use std::{sync::Arc, time::Duration};

use crate::usecase::{ConnectionLifecycleUseCase, MessageDispatcher, RunScheduledJobsUseCase};

pub struct AppState {
    /// ConnectionLifecycleUseCase（接続の作成・ハンドシェイク・後始末）
    pub lifecycle: Arc<ConnectionLifecycleUseCase>,
    /// MessageDispatcher（受信フレームの処理）
    pub dispatcher: Arc<MessageDispatcher>,
    /// RunScheduledJobsUseCase（スケジュールジョブのディスパッチ）
    pub scheduled_jobs: Arc<RunScheduledJobsUseCase>,
    /// `/intranet` の Bearer トークン。None なら 503。
    pub admin_token: Option<String>,
    pub keep_alive_interval: Duration,
    pub reliable_retry_interval: Duration,
}
