//! Observability sink for failures that must not crash a connection or the dispatcher.

pub trait ErrorReporter: Send + Sync {
    /// `context` names the boundary where the failure was caught.
    fn report(&self, context: &str, message: &str);
}
