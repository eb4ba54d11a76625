//! InMemory Integration Repository 実装
//!
//! Slack / Mattermost の連携設定。ユーザー × チームごとに最初に登録されたものを返す。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    IntegrationRepository, MattermostAuth, NotificationEvent, RepositoryError, SlackAuth,
    SlackNotification, TeamId, UserId,
};

#[derive(Default)]
struct Integrations {
    slack_auths: Vec<SlackAuth>,
    slack_notifications: Vec<SlackNotification>,
    mattermost_auths: Vec<MattermostAuth>,
}

#[derive(Default)]
pub struct InMemoryIntegrationRepository {
    integrations: Mutex<Integrations>,
}

impl InMemoryIntegrationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_slack_auth(&self, auth: SlackAuth) {
        self.integrations.lock().await.slack_auths.push(auth);
    }

    pub async fn add_slack_notification(&self, notification: SlackNotification) {
        self.integrations
            .lock()
            .await
            .slack_notifications
            .push(notification);
    }

    pub async fn add_mattermost_auth(&self, auth: MattermostAuth) {
        self.integrations.lock().await.mattermost_auths.push(auth);
    }
}

#[async_trait]
impl IntegrationRepository for InMemoryIntegrationRepository {
    async fn slack_auth(
        &self,
        user_id: &UserId,
        team_id: &TeamId,
    ) -> Result<Option<SlackAuth>, RepositoryError> {
        let integrations = self.integrations.lock().await;
        Ok(integrations
            .slack_auths
            .iter()
            .find(|auth| &auth.user_id == user_id && &auth.team_id == team_id)
            .cloned())
    }

    async fn slack_notification(
        &self,
        user_id: &UserId,
        team_id: &TeamId,
        event: NotificationEvent,
    ) -> Result<Option<SlackNotification>, RepositoryError> {
        let integrations = self.integrations.lock().await;
        Ok(integrations
            .slack_notifications
            .iter()
            .find(|n| &n.user_id == user_id && &n.team_id == team_id && n.event == event)
            .cloned())
    }

    async fn mattermost_auth(
        &self,
        user_id: &UserId,
        team_id: &TeamId,
    ) -> Result<Option<MattermostAuth>, RepositoryError> {
        let integrations = self.integrations.lock().await;
        Ok(integrations
            .mattermost_auths
            .iter()
            .find(|auth| &auth.user_id == user_id && &auth.team_id == team_id)
            .cloned())
    }
}
