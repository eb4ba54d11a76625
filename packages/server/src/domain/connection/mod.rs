//! ConnectionContext
//!
//! ソケット 1 本分の状態。接続が所有し、切断時に破棄される。
//!
//! - `ReadyGate`: ハンドシェイク完了前のリクエストを FIFO で保留する
//! - `KeepAlive`: PONG の受信時刻
//! - `ReliableOutbox`: ACK 待ちの reliable メッセージ
//! - 購読中の subscription（オペレーション ID ごとの転送タスク）

mod keep_alive;
mod ready_gate;

pub use keep_alive::KeepAlive;
pub use ready_gate::{ReadyAction, ReadyGate};

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, OnceLock, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::{task::AbortHandle, time::Instant};

use super::{
    message::{OutboundFrame, OutboundSender},
    reliable::{ReliableConfig, ReliableOutbox},
    subscription::{SubscriptionChannel, Topic},
    value_object::{ConnectionId, OperationId, TeamId, UserId},
};

/// ハンドシェイクで確定する接続ユーザー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: UserId,
    pub team_ids: Vec<TeamId>,
}

impl Viewer {
    pub fn new(user_id: UserId, team_ids: Vec<TeamId>) -> Self {
        Self { user_id, team_ids }
    }

    /// 個人チャンネルは本人のみ、チームチャンネルは所属チームのみ購読できる
    pub fn can_subscribe(&self, topic: &Topic) -> bool {
        match topic.channel {
            SubscriptionChannel::Notification => topic.key == self.user_id.as_str(),
            SubscriptionChannel::Team => self.team_ids.iter().any(|id| id.as_str() == topic.key),
            SubscriptionChannel::Meeting
            | SubscriptionChannel::Organization
            | SubscriptionChannel::Task => true,
        }
    }
}

pub struct ConnectionContext {
    id: ConnectionId,
    ready_gate: ReadyGate,
    keep_alive: KeepAlive,
    outbound: OutboundSender,
    reliable: Mutex<ReliableOutbox>,
    viewer: OnceLock<Viewer>,
    subscriptions: Mutex<HashMap<OperationId, AbortHandle>>,
    closed: AtomicBool,
}

impl ConnectionContext {
    pub fn new(outbound: OutboundSender, reliable_config: ReliableConfig) -> Self {
        Self {
            id: ConnectionId::generate(),
            ready_gate: ReadyGate::new(),
            keep_alive: KeepAlive::new(Instant::now()),
            outbound,
            reliable: Mutex::new(ReliableOutbox::new(reliable_config)),
            viewer: OnceLock::new(),
            subscriptions: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn is_ready(&self) -> bool {
        self.ready_gate.is_ready()
    }

    pub fn queued(&self) -> usize {
        self.ready_gate.queued()
    }

    pub fn enqueue_or_run(&self, action: ReadyAction) {
        self.ready_gate.enqueue_or_run(action);
    }

    pub fn mark_ready(&self) -> usize {
        self.ready_gate.mark_ready()
    }

    pub fn keep_alive(&self) -> &KeepAlive {
        &self.keep_alive
    }

    /// 1 回だけ設定できる。2 回目以降は false。
    pub fn set_viewer(&self, viewer: Viewer) -> bool {
        self.viewer.set(viewer).is_ok()
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.get()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 送信キューに積む。ソケットが既に閉じていれば false。
    pub fn send_frame(&self, frame: OutboundFrame) -> bool {
        if self.is_closed() {
            return false;
        }
        self.outbound.send(frame).is_ok()
    }

    /// Reliable Message Protocol で包んで送る
    pub fn send_reliable(&self, json: &str) -> bool {
        if self.is_closed() {
            return false;
        }
        let frame = self.reliable().enqueue(json, Instant::now());
        self.send_frame(OutboundFrame::Binary(frame))
    }

    pub fn acknowledge(&self, mid: u32) -> bool {
        self.reliable().acknowledge(mid)
    }

    /// 再送要求に応える。保持していない mid なら何もしない。
    pub fn resend(&self, mid: u32) -> bool {
        let frame = self.reliable().resend(mid, Instant::now());
        match frame {
            Some(frame) => self.send_frame(OutboundFrame::Binary(frame)),
            None => false,
        }
    }

    /// 再送期限を過ぎたフレームを送り直し、送った数を返す
    pub fn flush_due_reliable(&self) -> usize {
        let frames = self.reliable().due(Instant::now());
        frames
            .into_iter()
            .filter(|frame| self.send_frame(OutboundFrame::Binary(frame.clone())))
            .count()
    }

    pub fn pending_reliable(&self) -> usize {
        self.reliable().pending_len()
    }

    /// 同じ ID の subscription が既にあれば置き換える（古い方は中断）
    pub fn track_subscription(&self, op_id: OperationId, handle: AbortHandle) {
        if self.is_closed() {
            handle.abort();
            return;
        }
        if let Some(previous) = self.subscriptions().insert(op_id, handle) {
            previous.abort();
        }
    }

    pub fn cancel_subscription(&self, op_id: &OperationId) -> bool {
        match self.subscriptions().remove(op_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions().len()
    }

    /// 接続の後始末。購読を中断し、ACK 待ちを破棄し、ソケットに close を要求する。
    ///
    /// 2 回目以降の呼び出しは何もしない。
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let handles: Vec<AbortHandle> = self.subscriptions().drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.abort();
        }
        self.reliable().clear();
        let _ = self.outbound.send(OutboundFrame::Close);
    }

    fn reliable(&self) -> MutexGuard<'_, ReliableOutbox> {
        self.reliable.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscriptions(&self) -> MutexGuard<'_, HashMap<OperationId, AbortHandle>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
