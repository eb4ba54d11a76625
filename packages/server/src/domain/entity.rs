//! Entities
//!
//! スケジュールジョブ、ミーティング、チャット連携設定、アプリ内通知。
//! JSON 表現は camelCase（フィクスチャ・管理 API と共通）。

use serde::{Deserialize, Serialize};

use super::value_object::{JobId, MeetingId, NotificationId, TeamId, Timestamp, UserId};

/// 時刻指定で実行されるジョブ
///
/// `run_at` 以降にディスパッチャーが claim（削除）し、`kind` に応じた処理を 1 回だけ実行する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub id: JobId,
    pub run_at: Timestamp,
    #[serde(flatten)]
    pub kind: JobKind,
}

/// ジョブ種別とその種別固有のペイロード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    /// ミーティングのステージ制限時間の終了
    #[serde(rename_all = "camelCase")]
    MeetingStageTimeLimitEnd { meeting_id: MeetingId },
}

impl JobKind {
    /// ワイヤ表現の種別名
    pub fn type_name(&self) -> &'static str {
        match self {
            JobKind::MeetingStageTimeLimitEnd { .. } => "MEETING_STAGE_TIME_LIMIT_END",
        }
    }
}

impl ScheduledJob {
    pub fn meeting_stage_time_limit_end(id: JobId, meeting_id: MeetingId, run_at: Timestamp) -> Self {
        Self {
            id,
            run_at,
            kind: JobKind::MeetingStageTimeLimitEnd { meeting_id },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: MeetingId,
    pub team_id: TeamId,
    pub facilitator_user_id: UserId,
}

/// Slack の bot 認証情報（ユーザー × チーム）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackAuth {
    pub user_id: UserId,
    pub team_id: TeamId,
    #[serde(default)]
    pub bot_access_token: Option<String>,
}

/// 通知イベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    MeetingStageTimeLimitEnd,
    MeetingEnd,
}

/// Slack の通知先設定（イベントごと）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackNotification {
    pub user_id: UserId,
    pub team_id: TeamId,
    pub event: NotificationEvent,
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Mattermost の incoming webhook 設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MattermostAuth {
    pub user_id: UserId,
    pub team_id: TeamId,
    pub webhook_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Unread,
    Read,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    #[serde(rename_all = "camelCase")]
    MeetingStageTimeLimitEnd { meeting_id: MeetingId },
}

/// アプリ内通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub status: NotificationStatus,
    pub created_at: Timestamp,
    #[serde(flatten)]
    pub kind: NotificationKind,
}

impl Notification {
    pub fn meeting_stage_time_limit_end(
        meeting_id: MeetingId,
        user_id: UserId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            user_id,
            status: NotificationStatus::Unread,
            created_at,
            kind: NotificationKind::MeetingStageTimeLimitEnd { meeting_id },
        }
    }
}
