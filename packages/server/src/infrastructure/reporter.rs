//! tracing に出力する ErrorReporter 実装

use crate::domain::ErrorReporter;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, context: &str, message: &str) {
        tracing::error!(context = context, "{}", message);
    }
}
