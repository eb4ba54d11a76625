//! InMemory ScheduledJob Repository 実装
//!
//! `claim` はロック内での remove なので、同じジョブへの並行 claim のうち
//! 削除件数 1 を観測するのは 1 つだけになる。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{JobId, RepositoryError, ScheduledJob, ScheduledJobRepository, Timestamp};

/// インメモリ ScheduledJob Repository 実装
pub struct InMemoryScheduledJobRepository {
    /// ジョブ ID → ジョブ
    jobs: Mutex<HashMap<JobId, ScheduledJob>>,
}

impl InMemoryScheduledJobRepository {
    pub fn new() -> Self {
        Self::with_jobs(Vec::new())
    }

    /// 初期データ付きで作成（同じ ID は後勝ち）
    pub fn with_jobs(jobs: Vec<ScheduledJob>) -> Self {
        Self {
            jobs: Mutex::new(jobs.into_iter().map(|job| (job.id.clone(), job)).collect()),
        }
    }
}

impl Default for InMemoryScheduledJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduledJobRepository for InMemoryScheduledJobRepository {
    async fn insert(&self, job: ScheduledJob) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job.id) {
            return Err(RepositoryError::Duplicate(job.id.to_string()));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn load_due_before(&self, before: Timestamp) -> Result<Vec<ScheduledJob>, RepositoryError> {
        let jobs = self.jobs.lock().await;
        let mut due: Vec<ScheduledJob> = jobs
            .values()
            .filter(|job| job.run_at <= before)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.run_at.cmp(&b.run_at).then_with(|| a.id.cmp(&b.id)));
        Ok(due)
    }

    async fn claim(&self, id: &JobId) -> Result<u64, RepositoryError> {
        let mut jobs = self.jobs.lock().await;
        Ok(u64::from(jobs.remove(id).is_some()))
    }
}
