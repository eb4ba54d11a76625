//! Fire-and-forget task spawning with a mandatory error sink.

use std::{fmt::Display, future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures_util::FutureExt;
use tokio::task::JoinHandle;

use crate::domain::ErrorReporter;

/// Spawn `future` without awaiting it. Errors and panics go to `reporter`.
pub fn spawn_reported<F, E>(
    reporter: Arc<dyn ErrorReporter>,
    context: &'static str,
    future: F,
) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => reporter.report(context, &e.to_string()),
            Err(panic) => reporter.report(context, &panic_message(panic.as_ref())),
        }
    })
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Reporter that keeps every report in memory
    #[derive(Default)]
    pub(crate) struct RecordingReporter {
        pub(crate) reports: Mutex<Vec<(String, String)>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, context: &str, message: &str) {
            self.reports
                .lock()
                .unwrap()
                .push((context.to_string(), message.to_string()));
        }
    }

    #[tokio::test]
    async fn test_error_is_reported() {
        // テスト項目: spawn したタスクのエラーが reporter に届く
        // given (前提条件):
        let reporter = Arc::new(RecordingReporter::default());

        // when (操作):
        spawn_reported(reporter.clone(), "job", async { Err::<(), _>("bad input") })
            .await
            .unwrap();

        // then (期待する結果):
        let reports = reporter.reports.lock().unwrap();
        assert_eq!(*reports, vec![("job".to_string(), "bad input".to_string())]);
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        // テスト項目: spawn したタスクの panic も reporter に届く
        // given (前提条件):
        let reporter = Arc::new(RecordingReporter::default());

        // when (操作):
        let exploding = async {
            panic!("exploded");
        };
        let handle = spawn_reported(reporter.clone(), "handler", async move {
            exploding.await;
            Ok::<(), String>(())
        });
        handle.await.unwrap();

        // then (期待する結果):
        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "handler");
        assert!(reports[0].1.contains("exploded"));
    }
}
