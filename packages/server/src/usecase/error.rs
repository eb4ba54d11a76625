//! UseCase errors.

use thiserror::Error;

use crate::domain::{MeetingId, RepositoryError};

/// ハンドシェイクのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("Connection '{0}' already completed its handshake")]
    AlreadyIdentified(String),

    #[error("Connection '{0}' is closed")]
    Closed(String),
}

/// ジョブ処理のエラー（claim 後なので再試行はしない）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessJobError {
    #[error("Meeting '{0}' not found")]
    MeetingNotFound(MeetingId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// runScheduledJobs のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunScheduledJobsError {
    #[error("Horizon must be zero or positive, got {0}")]
    InvalidHorizon(i64),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
