//! InMemory Meeting Repository 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Meeting, MeetingId, MeetingRepository, RepositoryError};

pub struct InMemoryMeetingRepository {
    meetings: Mutex<HashMap<MeetingId, Meeting>>,
}

impl InMemoryMeetingRepository {
    pub fn new() -> Self {
        Self::with_meetings(Vec::new())
    }

    pub fn with_meetings(meetings: Vec<Meeting>) -> Self {
        Self {
            meetings: Mutex::new(
                meetings
                    .into_iter()
                    .map(|meeting| (meeting.id.clone(), meeting))
                    .collect(),
            ),
        }
    }

    /// ミーティングを追加または更新
    pub async fn upsert(&self, meeting: Meeting) {
        self.meetings.lock().await.insert(meeting.id.clone(), meeting);
    }
}

impl Default for InMemoryMeetingRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeetingRepository for InMemoryMeetingRepository {
    async fn get_meeting(&self, id: &MeetingId) -> Result<Option<Meeting>, RepositoryError> {
        Ok(self.meetings.lock().await.get(id).cloned())
    }
}
