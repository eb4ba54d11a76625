//! JSON フィクスチャからの初期データ投入
//!
//! ```json
//! {
//!   "meetings": [{"id": "m1", "teamId": "t1", "facilitatorUserId": "u1"}],
//!   "scheduledJobs": [{"id": "j1", "type": "MEETING_STAGE_TIME_LIMIT_END", "meetingId": "m1", "runAt": 1700000000000}],
//!   "slackAuths": [],
//!   "slackNotifications": [],
//!   "mattermostAuths": []
//! }
//! ```

use std::{path::Path, sync::Arc};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{MattermostAuth, Meeting, ScheduledJob, SlackAuth, SlackNotification};

use super::inmemory::{
    InMemoryIntegrationRepository, InMemoryMeetingRepository, InMemoryNotificationRepository,
    InMemoryScheduledJobRepository,
};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixtures from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixtures: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fixtures {
    pub meetings: Vec<Meeting>,
    pub scheduled_jobs: Vec<ScheduledJob>,
    pub slack_auths: Vec<SlackAuth>,
    pub slack_notifications: Vec<SlackNotification>,
    pub mattermost_auths: Vec<MattermostAuth>,
}

impl Fixtures {
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> Result<Self, FixtureError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FixtureError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&json)
    }
}

/// サーバーが使うインメモリ Repository 一式
pub struct InMemoryRepositories {
    pub scheduled_jobs: Arc<InMemoryScheduledJobRepository>,
    pub meetings: Arc<InMemoryMeetingRepository>,
    pub integrations: Arc<InMemoryIntegrationRepository>,
    pub notifications: Arc<InMemoryNotificationRepository>,
}

impl InMemoryRepositories {
    pub fn empty() -> Self {
        Self {
            scheduled_jobs: Arc::new(InMemoryScheduledJobRepository::new()),
            meetings: Arc::new(InMemoryMeetingRepository::new()),
            integrations: Arc::new(InMemoryIntegrationRepository::new()),
            notifications: Arc::new(InMemoryNotificationRepository::new()),
        }
    }

    pub async fn seeded(fixtures: Fixtures) -> Self {
        let integrations = InMemoryIntegrationRepository::new();
        for auth in fixtures.slack_auths {
            integrations.add_slack_auth(auth).await;
        }
        for notification in fixtures.slack_notifications {
            integrations.add_slack_notification(notification).await;
        }
        for auth in fixtures.mattermost_auths {
            integrations.add_mattermost_auth(auth).await;
        }
        tracing::info!(
            "Seeded {} meetings and {} scheduled jobs",
            fixtures.meetings.len(),
            fixtures.scheduled_jobs.len()
        );

        Self {
            scheduled_jobs: Arc::new(InMemoryScheduledJobRepository::with_jobs(
                fixtures.scheduled_jobs,
            )),
            meetings: Arc::new(InMemoryMeetingRepository::with_meetings(fixtures.meetings)),
            integrations: Arc::new(integrations),
            notifications: Arc::new(InMemoryNotificationRepository::new()),
        }
    }
}
