//! Per-run entity loader.
//!
//! Caches lookups for the lifetime of one request or scheduler run. `share()`
//! exposes the loader's id so events published during the run can be
//! correlated by clients (sent as `operationId`).

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Meeting, MeetingId, MeetingRepository, RepositoryError};

pub struct DataLoader {
    id: String,
    meetings: Arc<dyn MeetingRepository>,
    meeting_cache: Mutex<HashMap<MeetingId, Option<Meeting>>>,
}

impl DataLoader {
    pub fn new(meetings: Arc<dyn MeetingRepository>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            meetings,
            meeting_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn share(&self) -> &str {
        &self.id
    }

    pub async fn load_meeting(&self, id: &MeetingId) -> Result<Option<Meeting>, RepositoryError> {
        let mut cache = self.meeting_cache.lock().await;
        if let Some(cached) = cache.get(id) {
            return Ok(cached.clone());
        }
        let meeting = self.meetings.get_meeting(id).await?;
        cache.insert(id.clone(), meeting.clone());
        Ok(meeting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TeamId, UserId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingMeetings {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MeetingRepository for CountingMeetings {
        async fn get_meeting(&self, id: &MeetingId) -> Result<Option<Meeting>, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Meeting {
                id: id.clone(),
                team_id: TeamId::new("t1".to_string()).unwrap(),
                facilitator_user_id: UserId::new("u1".to_string()).unwrap(),
            }))
        }
    }

    #[tokio::test]
    async fn test_load_meeting_is_cached() {
        // テスト項目: 同じミーティングは 1 度だけ Repository から読まれる
        // given (前提条件):
        let repository = Arc::new(CountingMeetings::default());
        let loader = DataLoader::new(repository.clone());
        let id = MeetingId::new("m1".to_string()).unwrap();

        // when (操作):
        let first = loader.load_meeting(&id).await.unwrap();
        let second = loader.load_meeting(&id).await.unwrap();

        // then (期待する結果):
        assert_eq!(first, second);
        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_share_ids_differ_per_loader() {
        // テスト項目: share() の ID はローダーごとに異なる
        // given (前提条件):
        let repository = Arc::new(CountingMeetings::default());

        // when (操作):
        let a = DataLoader::new(repository.clone());
        let b = DataLoader::new(repository);

        // then (期待する結果):
        assert_ne!(a.share(), b.share());
    }
}
