//! UseCase: MEETING_STAGE_TIME_LIMIT_END ジョブの処理
//!
//! ファシリテーターにステージの制限時間終了を知らせる。
//! Slack → Mattermost → アプリ内通知 の順に配信を試みる。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MeetingStageTimeLimitProcessor::process() メソッド
//!
//! ### なぜこのテストが必要か
//! - 連携が設定されていれば外部チャットに届き、アプリ内通知は作られないことを保証
//! - 外部チャットが失敗した場合にアプリ内通知へフォールバックすることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：Slack のみ、Mattermost のみ、連携なし
//! - 異常系：Slack の送信失敗、ミーティングが存在しない
//! - エッジケース：Slack と Mattermost の両方が設定されている

use std::sync::Arc;

use serde_json::json;
use trebuchet_shared::time::Clock;

use crate::domain::{
    IntegrationRepository, MattermostNotifier, Meeting, MeetingId, Notification,
    NotificationEvent, NotificationRepository, SlackNotifier, SubscriptionChannel, Timestamp,
};

use super::{
    data_loader::DataLoader,
    error::ProcessJobError,
    publish::{PublishOptions, Publisher},
};

/// アプリ内通知を publish するときの型名
pub const MEETING_STAGE_TIME_LIMIT_PAYLOAD: &str = "MeetingStageTimeLimitPayload";

/// 通知が最終的に届いた経路
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTier {
    Slack,
    Mattermost,
    InApp,
}

/// MEETING_STAGE_TIME_LIMIT_END の処理
pub struct MeetingStageTimeLimitProcessor {
    /// IntegrationRepository（Slack / Mattermost の設定）
    integrations: Arc<dyn IntegrationRepository>,
    slack: Arc<dyn SlackNotifier>,
    mattermost: Arc<dyn MattermostNotifier>,
    /// NotificationRepository（アプリ内通知の保存先）
    notifications: Arc<dyn NotificationRepository>,
    publisher: Arc<Publisher>,
    clock: Arc<dyn Clock>,
    /// ミーティング URL の組み立てに使うオリジン（例: `https://action.example.com`）
    app_origin: String,
}

impl MeetingStageTimeLimitProcessor {
    /// 新しい MeetingStageTimeLimitProcessor を作成
    pub fn new(
        integrations: Arc<dyn IntegrationRepository>,
        slack: Arc<dyn SlackNotifier>,
        mattermost: Arc<dyn MattermostNotifier>,
        notifications: Arc<dyn NotificationRepository>,
        publisher: Arc<Publisher>,
        clock: Arc<dyn Clock>,
        app_origin: impl Into<String>,
    ) -> Self {
        Self {
            integrations,
            slack,
            mattermost,
            notifications,
            publisher,
            clock,
            app_origin: app_origin.into().trim_end_matches('/').to_string(),
        }
    }

    /// ミーティングの URL（`<origin>/meet/<meetingId>`）
    pub fn meeting_url(&self, meeting_id: &MeetingId) -> String {
        format!("{}/meet/{}", self.app_origin, meeting_id)
    }

    /// ファシリテーターに制限時間終了を通知する
    ///
    /// Slack が成功し Mattermost が未設定ならそこで終了。
    /// Mattermost が設定されていれば送信し、成功すれば終了。
    /// どちらでも届かなければアプリ内通知を作成して publish する。
    pub async fn process(
        &self,
        meeting_id: &MeetingId,
        loader: &DataLoader,
    ) -> Result<DeliveryTier, ProcessJobError> {
        let meeting = loader
            .load_meeting(meeting_id)
            .await?
            .ok_or_else(|| ProcessJobError::MeetingNotFound(meeting_id.clone()))?;
        let Meeting {
            team_id,
            facilitator_user_id,
            ..
        } = &meeting;

        let (slack_auth, slack_notification, mattermost_auth) = tokio::try_join!(
            self.integrations.slack_auth(facilitator_user_id, team_id),
            self.integrations.slack_notification(
                facilitator_user_id,
                team_id,
                NotificationEvent::MeetingStageTimeLimitEnd
            ),
            self.integrations.mattermost_auth(facilitator_user_id, team_id),
        )?;
        let text = format!(
            "Time’s up! Advance your meeting to the next phase: {}",
            self.meeting_url(meeting_id)
        );

        let bot_token = slack_auth.and_then(|auth| auth.bot_access_token);
        let channel_id = slack_notification.and_then(|notification| notification.channel_id);
        if let (Some(token), Some(channel)) = (bot_token, channel_id) {
            match self.slack.post_message(&token, &channel, &text).await {
                Ok(()) if mattermost_auth.is_none() => {
                    tracing::info!("Stage time limit for '{}' sent via Slack", meeting_id);
                    return Ok(DeliveryTier::Slack);
                }
                Ok(()) => {}
                Err(e) => tracing::warn!("Slack notification for '{}' failed: {}", meeting_id, e),
            }
        }

        if let Some(auth) = mattermost_auth {
            match self.mattermost.post_webhook(&auth.webhook_url, &text).await {
                Ok(()) => {
                    tracing::info!("Stage time limit for '{}' sent via Mattermost", meeting_id);
                    return Ok(DeliveryTier::Mattermost);
                }
                Err(e) => {
                    tracing::warn!("Mattermost notification for '{}' failed: {}", meeting_id, e)
                }
            }
        }

        let notification = Notification::meeting_stage_time_limit_end(
            meeting_id.clone(),
            facilitator_user_id.clone(),
            Timestamp::new(self.clock.now_millis()),
        );
        self.notifications.insert(notification.clone()).await?;
        let delivered = self.publisher.publish(
            SubscriptionChannel::Notification,
            facilitator_user_id.as_str(),
            MEETING_STAGE_TIME_LIMIT_PAYLOAD,
            json!({ "notification": notification }),
            PublishOptions {
                operation_id: Some(loader.share().to_string()),
                mutator_id: None,
            },
        );
        tracing::info!(
            "Stage time limit for '{}' stored as notification '{}' ({} live subscribers)",
            meeting_id,
            notification.id,
            delivered
        );
        Ok(DeliveryTier::InApp)
    }
}
