//! UseCase: スケジュールジョブのディスパッチ
//!
//! `runAt <= now + horizon` のジョブを読み込み、ジョブごとに 1 回限りのタイマーを張る。
//! タイマーが発火したらジョブを削除（claim）し、削除件数が 1 のときだけ処理する。
//! claim 後にプロセスが落ちたジョブは失われる（at-most-once）。再試行はしない。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RunScheduledJobsUseCase::execute() / arm() / process_job() メソッド
//!
//! ### なぜこのテストが必要か
//! - 同じジョブに対する複数のタイマー（レプリカ）があっても処理が 1 回だけであることを保証
//! - タイマーの遅延が `max(0, runAt - now)` であることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：horizon 内のジョブの実行
//! - 異常系：負の horizon、処理中のエラー
//! - エッジケース：claim の競合、過去の runAt、horizon 外のジョブ

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use trebuchet_shared::time::{Clock, millis_until, timestamp_to_rfc3339};

use crate::domain::{
    ErrorReporter, JobKind, MeetingRepository, ScheduledJob, ScheduledJobRepository, Timestamp,
};

use super::{
    data_loader::DataLoader,
    error::RunScheduledJobsError,
    process_stage_time_limit::{DeliveryTier, MeetingStageTimeLimitProcessor},
    task::panic_message,
};

/// タイマー発火後のジョブの結末
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// claim に成功し、処理が完了した
    Processed(DeliveryTier),
    /// 他のディスパッチャーが先に claim していた
    Dropped,
    /// claim 後の処理が失敗した（再試行しない）
    Failed(String),
}

/// スケジュールジョブのディスパッチャー
pub struct RunScheduledJobsUseCase {
    /// ScheduledJobRepository（ジョブの保存先、claim の原子性を担う）
    jobs: Arc<dyn ScheduledJobRepository>,
    /// MeetingRepository（実行ごとの DataLoader の裏側）
    meetings: Arc<dyn MeetingRepository>,
    stage_time_limit: Arc<MeetingStageTimeLimitProcessor>,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn ErrorReporter>,
}

impl RunScheduledJobsUseCase {
    /// 新しい RunScheduledJobsUseCase を作成
    pub fn new(
        jobs: Arc<dyn ScheduledJobRepository>,
        meetings: Arc<dyn MeetingRepository>,
        stage_time_limit: Arc<MeetingStageTimeLimitProcessor>,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            jobs,
            meetings,
            stage_time_limit,
            clock,
            reporter,
        }
    }

    /// `horizon_seconds` 以内に実行予定のジョブすべてにタイマーを張る
    ///
    /// # Returns
    ///
    /// タイマーを張ったジョブの数
    pub async fn execute(self: &Arc<Self>, horizon_seconds: i64) -> Result<usize, RunScheduledJobsError> {
        if horizon_seconds < 0 {
            return Err(RunScheduledJobsError::InvalidHorizon(horizon_seconds));
        }

        let now = self.clock.now_millis();
        let before = Timestamp::new(now.saturating_add(horizon_seconds.saturating_mul(1000)));
        let upcoming = self.jobs.load_due_before(before).await?;

        let loader = Arc::new(DataLoader::new(self.meetings.clone()));
        for job in &upcoming {
            self.arm(job.clone(), now, loader.clone());
        }
        tracing::info!(
            "Armed {} scheduled jobs within {}s (loader {})",
            upcoming.len(),
            horizon_seconds,
            loader.share()
        );
        Ok(upcoming.len())
    }

    /// 1 回限りのタイマーを張る。遅延は `max(0, runAt - now)`。
    pub fn arm(
        self: &Arc<Self>,
        job: ScheduledJob,
        now: i64,
        loader: Arc<DataLoader>,
    ) -> JoinHandle<JobOutcome> {
        let delay = millis_until(job.run_at.value(), now);
        tracing::debug!("Job '{}' ({}) fires in {}ms", job.id, job.kind.type_name(), delay);

        let usecase = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            match AssertUnwindSafe(usecase.process_job(&job, &loader))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    usecase.reporter.report(job.kind.type_name(), &message);
                    JobOutcome::Failed(message)
                }
            }
        })
    }

    /// claim してから種別ごとの処理を実行する
    pub async fn process_job(&self, job: &ScheduledJob, loader: &DataLoader) -> JobOutcome {
        match self.jobs.claim(&job.id).await {
            Ok(1) => {}
            Ok(_) => {
                tracing::debug!("Job '{}' already claimed elsewhere", job.id);
                return JobOutcome::Dropped;
            }
            Err(e) => {
                self.reporter.report("scheduled_job.claim", &e.to_string());
                return JobOutcome::Failed(e.to_string());
            }
        }

        let result = match &job.kind {
            JobKind::MeetingStageTimeLimitEnd { meeting_id } => {
                self.stage_time_limit.process(meeting_id, loader).await
            }
        };
        match result {
            Ok(tier) => JobOutcome::Processed(tier),
            Err(e) => {
                self.reporter.report(job.kind.type_name(), &e.to_string());
                JobOutcome::Failed(e.to_string())
            }
        }
    }

    /// ジョブを登録する（外部のミューテーションや管理 API から）
    pub async fn schedule(&self, job: ScheduledJob) -> Result<(), RunScheduledJobsError> {
        let run_at = job.run_at.value();
        tracing::info!(
            "Scheduling job '{}' ({}) at {}",
            job.id,
            job.kind.type_name(),
            timestamp_to_rfc3339(run_at).unwrap_or_else(|| run_at.to_string())
        );
        self.jobs.insert(job).await?;
        Ok(())
    }
}

/// 定期的に `execute(horizon)` を呼ぶ自己ポーリング
///
/// 重複して張られたタイマーは claim で落ちるので、間隔と horizon が重なっていても問題ない。
pub fn spawn_poll_loop(
    usecase: Arc<RunScheduledJobsUseCase>,
    interval: Duration,
    horizon_seconds: i64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = usecase.execute(horizon_seconds).await {
                usecase.reporter.report("scheduled_job.poll", &e.to_string());
            }
        }
    })
}
