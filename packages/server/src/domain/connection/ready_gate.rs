//! Readiness gate for a single connection.
//!
//! Clients may send requests before the handshake has established who they
//! are. Those requests are parked here and submitted in arrival order once the
//! connection turns ready.

use std::{
    collections::VecDeque,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Deferred work. Typically it only spawns the real (async) handling.
pub type ReadyAction = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct GateState {
    ready: bool,
    draining: bool,
    queue: VecDeque<ReadyAction>,
}

#[derive(Default)]
pub struct ReadyGate {
    state: Mutex<GateState>,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    /// Number of actions waiting for readiness
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    /// Run `action` now if the connection is ready, otherwise park it.
    ///
    /// Actions arriving while the queue is being drained are appended to it,
    /// so they still run after everything enqueued before them.
    pub fn enqueue_or_run(&self, action: ReadyAction) {
        {
            let mut state = self.lock();
            if !state.ready {
                state.queue.push_back(action);
                return;
            }
        }
        run_guarded(action);
    }

    /// Flip to ready and drain the queue in FIFO order.
    ///
    /// Returns how many parked actions were run. Calling it again is a no-op.
    pub fn mark_ready(&self) -> usize {
        {
            let mut state = self.lock();
            if state.ready || state.draining {
                return 0;
            }
            state.draining = true;
        }

        let mut drained = 0;
        loop {
            let next = {
                let mut state = self.lock();
                match state.queue.pop_front() {
                    Some(action) => action,
                    None => {
                        state.draining = false;
                        state.ready = true;
                        break;
                    }
                }
            };
            run_guarded(next);
            drained += 1;
        }
        drained
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A panicking action must not stop the rest of the queue.
fn run_guarded(action: ReadyAction) -> bool {
    match catch_unwind(AssertUnwindSafe(action)) {
        Ok(()) => true,
        Err(_) => {
            tracing::error!("Deferred connection action panicked; continuing with the queue");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<usize>>>, impl Fn(usize) -> ReadyAction) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for_action = log.clone();
        let make = move |n: usize| -> ReadyAction {
            let log = log_for_action.clone();
            Box::new(move || log.lock().unwrap().push(n))
        };
        (log, make)
    }

    #[test]
    fn test_actions_wait_until_ready() {
        // テスト項目: ready になるまでアクションは実行されない
        // given (前提条件):
        let gate = ReadyGate::new();
        let (log, make) = recorder();

        // when (操作):
        gate.enqueue_or_run(make(1));
        gate.enqueue_or_run(make(2));

        // then (期待する結果):
        assert!(!gate.is_ready());
        assert_eq!(gate.queued(), 2);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drain_preserves_fifo_order() {
        // テスト項目: ready への遷移時、投入順にちょうど 1 回ずつ実行される
        // given (前提条件):
        let gate = ReadyGate::new();
        let (log, make) = recorder();
        for n in 0..5 {
            gate.enqueue_or_run(make(n));
        }

        // when (操作):
        let drained = gate.mark_ready();
        let drained_again = gate.mark_ready();

        // then (期待する結果):
        assert_eq!(drained, 5);
        assert_eq!(drained_again, 0);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(gate.queued(), 0);
    }

    #[test]
    fn test_ready_runs_immediately() {
        // テスト項目: ready 後のアクションは即座に実行される
        // given (前提条件):
        let gate = ReadyGate::new();
        let (log, make) = recorder();
        gate.mark_ready();

        // when (操作):
        gate.enqueue_or_run(make(9));

        // then (期待する結果):
        assert_eq!(*log.lock().unwrap(), vec![9]);
    }

    #[test]
    fn test_panicking_action_does_not_block_queue() {
        // テスト項目: 途中のアクションが panic しても残りは実行される
        // given (前提条件):
        let gate = ReadyGate::new();
        let (log, make) = recorder();
        gate.enqueue_or_run(make(1));
        gate.enqueue_or_run(Box::new(|| panic!("boom")));
        gate.enqueue_or_run(make(3));

        // when (操作):
        let drained = gate.mark_ready();

        // then (期待する結果):
        assert_eq!(drained, 3);
        assert_eq!(*log.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_enqueue_during_drain_keeps_order() {
        // テスト項目: drain 中に投入されたアクションも後ろに並んで実行される
        // given (前提条件):
        let gate = Arc::new(ReadyGate::new());
        let (log, make) = recorder();
        let make = Arc::new(make);
        gate.enqueue_or_run(make(1));
        {
            let gate_inner = gate.clone();
            let make_inner = make.clone();
            let log_inner = log.clone();
            gate.enqueue_or_run(Box::new(move || {
                log_inner.lock().unwrap().push(2);
                gate_inner.enqueue_or_run(make_inner(4));
            }));
        }
        gate.enqueue_or_run(make(3));

        // when (操作):
        gate.mark_ready();

        // then (期待する結果):
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4]);
    }
}
