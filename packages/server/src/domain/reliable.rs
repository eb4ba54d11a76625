//! Reliable Message Protocol
//!
//! サーバーからの reliable メッセージは `mid`（4 バイト LE）+ UTF-8 JSON のバイナリフレームで送る。
//! クライアントは 4 バイトの制御フレームで応答する:
//!
//! ```text
//! u32 (LE) = (mid << 1) | kind      kind: 0 = ACK, 1 = REQ（再送要求）
//! ```
//!
//! ACK されるまで `ReliableOutbox` に保持し、`retry_interval` ごとに再送する。
//! `max_attempts` 回送っても ACK が無ければ破棄する。

use std::{collections::BTreeMap, time::Duration};

use tokio::time::Instant;

/// 制御フレームのバイト長
pub const CONTROL_FRAME_LEN: usize = 4;

const MID_MASK: u32 = u32::MAX >> 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliableControl {
    /// mid を受信した
    Ack(u32),
    /// mid を再送してほしい
    Request(u32),
}

impl ReliableControl {
    /// 4 バイトちょうどのときだけ制御フレームとして解釈する
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; CONTROL_FRAME_LEN] = bytes.try_into().ok()?;
        let value = u32::from_le_bytes(raw);
        let mid = value >> 1;
        if value & 1 == 0 {
            Some(Self::Ack(mid))
        } else {
            Some(Self::Request(mid))
        }
    }

    pub fn encode(&self) -> [u8; CONTROL_FRAME_LEN] {
        let value = match *self {
            Self::Ack(mid) => (mid & MID_MASK) << 1,
            Self::Request(mid) => ((mid & MID_MASK) << 1) | 1,
        };
        value.to_le_bytes()
    }

    pub fn mid(&self) -> u32 {
        match *self {
            Self::Ack(mid) | Self::Request(mid) => mid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReliableConfig {
    pub retry_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReliableConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(5),
            max_attempts: 5,
        }
    }
}

#[derive(Debug)]
struct PendingMessage {
    frame: Vec<u8>,
    attempts: u32,
    next_retry_at: Instant,
}

/// ACK 待ちメッセージのキュー（接続ごと）
#[derive(Debug)]
pub struct ReliableOutbox {
    config: ReliableConfig,
    next_mid: u32,
    pending: BTreeMap<u32, PendingMessage>,
}

impl ReliableOutbox {
    pub fn new(config: ReliableConfig) -> Self {
        Self {
            config,
            next_mid: 0,
            pending: BTreeMap::new(),
        }
    }

    /// JSON を reliable フレームに包み、ACK 待ちとして保持する
    pub fn enqueue(&mut self, json: &str, now: Instant) -> Vec<u8> {
        let mid = self.next_mid;
        self.next_mid = (self.next_mid + 1) & MID_MASK;

        let mut frame = Vec::with_capacity(CONTROL_FRAME_LEN + json.len());
        frame.extend_from_slice(&mid.to_le_bytes());
        frame.extend_from_slice(json.as_bytes());

        self.pending.insert(
            mid,
            PendingMessage {
                frame: frame.clone(),
                attempts: 1,
                next_retry_at: now + self.config.retry_interval,
            },
        );
        frame
    }

    /// ACK を受け取ったメッセージを破棄する。未知の mid なら false。
    pub fn acknowledge(&mut self, mid: u32) -> bool {
        self.pending.remove(&mid).is_some()
    }

    /// クライアントからの再送要求。保持していればフレームを返す。
    pub fn resend(&mut self, mid: u32, now: Instant) -> Option<Vec<u8>> {
        let retry_interval = self.config.retry_interval;
        let message = self.pending.get_mut(&mid)?;
        message.next_retry_at = now + retry_interval;
        Some(message.frame.clone())
    }

    /// 再送期限を過ぎたフレームを返す。試行回数を使い切ったものは破棄する。
    pub fn due(&mut self, now: Instant) -> Vec<Vec<u8>> {
        let max_attempts = self.config.max_attempts;
        let retry_interval = self.config.retry_interval;
        let mut exhausted = Vec::new();
        let mut frames = Vec::new();

        for (mid, message) in self.pending.iter_mut() {
            if message.next_retry_at > now {
                continue;
            }
            if message.attempts >= max_attempts {
                exhausted.push(*mid);
                continue;
            }
            message.attempts += 1;
            message.next_retry_at = now + retry_interval;
            frames.push(message.frame.clone());
        }

        for mid in exhausted {
            self.pending.remove(&mid);
            tracing::warn!(
                "Dropping reliable message {} after {} unacknowledged attempts",
                mid,
                max_attempts
            );
        }

        frames
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
