//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{
    JobId, MattermostAuth, Meeting, MeetingId, Notification, NotificationEvent, RepositoryError,
    ScheduledJob, SlackAuth, SlackNotification, TeamId, Timestamp, UserId,
};

/// ScheduledJob Repository trait
///
/// `claim` はストレージ側で原子的な条件付き削除でなければならない。
/// 複数のディスパッチャー（サーバーレプリカ）が同じジョブを取り合っても、
/// 削除件数 1 を観測するのはちょうど 1 つだけ。
#[async_trait]
pub trait ScheduledJobRepository: Send + Sync {
    /// ジョブを追加
    async fn insert(&self, job: ScheduledJob) -> Result<(), RepositoryError>;

    /// `run_at <= before` のジョブを `run_at` 昇順で取得
    async fn load_due_before(&self, before: Timestamp) -> Result<Vec<ScheduledJob>, RepositoryError>;

    /// ジョブを削除して claim する。戻り値は削除件数（0 または 1）
    async fn claim(&self, id: &JobId) -> Result<u64, RepositoryError>;
}

/// Meeting Repository trait（DataLoader の裏側）
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    async fn get_meeting(&self, id: &MeetingId) -> Result<Option<Meeting>, RepositoryError>;
}

/// チャット連携設定の Repository trait
#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    async fn slack_auth(
        &self,
        user_id: &UserId,
        team_id: &TeamId,
    ) -> Result<Option<SlackAuth>, RepositoryError>;

    async fn slack_notification(
        &self,
        user_id: &UserId,
        team_id: &TeamId,
        event: NotificationEvent,
    ) -> Result<Option<SlackNotification>, RepositoryError>;

    async fn mattermost_auth(
        &self,
        user_id: &UserId,
        team_id: &TeamId,
    ) -> Result<Option<MattermostAuth>, RepositoryError>;
}

/// アプリ内通知の Repository trait
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<(), RepositoryError>;

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Notification>, RepositoryError>;
}
