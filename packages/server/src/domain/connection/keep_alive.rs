//! Keep-alive bookkeeping: the socket layer pings, clients answer with PONG.

use std::{
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;

#[derive(Debug)]
pub struct KeepAlive {
    last_pong: Mutex<Instant>,
    pongs: AtomicU64,
}

impl KeepAlive {
    pub fn new(now: Instant) -> Self {
        Self {
            last_pong: Mutex::new(now),
            pongs: AtomicU64::new(0),
        }
    }

    /// Reset the timer (called on every inbound PONG)
    pub fn touch(&self, now: Instant) {
        *self.last_pong.lock().unwrap_or_else(PoisonError::into_inner) = now;
        self.pongs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_pong(&self) -> Instant {
        *self.last_pong.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pong_count(&self) -> u64 {
        self.pongs.load(Ordering::Relaxed)
    }

    /// No PONG within `timeout` of `now`
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_pong()) > timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_resets_expiry() {
        // テスト項目: PONG を受けるとタイマーがリセットされる
        // given (前提条件):
        let start = Instant::now();
        let keep_alive = KeepAlive::new(start);
        let timeout = Duration::from_secs(20);

        // when (操作):
        let expired_before = keep_alive.is_expired(start + Duration::from_secs(21), timeout);
        keep_alive.touch(start + Duration::from_secs(15));
        let expired_after = keep_alive.is_expired(start + Duration::from_secs(21), timeout);

        // then (期待する結果):
        assert!(expired_before);
        assert!(!expired_after);
        assert_eq!(keep_alive.pong_count(), 1);
    }
}
