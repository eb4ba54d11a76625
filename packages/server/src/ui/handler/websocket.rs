//! WebSocket connection handlers.
//!
//! One socket = one `ConnectionContext`. Four tasks share it:
//! the receive loop (dispatch), the pusher loop (outbound queue → socket),
//! the keep-alive loop (PING, close on missing PONG) and the reliable retry loop.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};

use crate::{
    domain::{ConnectionContext, OutboundFrame, PING, TeamId, UserId, ValueObjectError, Viewer},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
///
/// Identity is asserted by the fronting proxy that terminates authentication.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: String,
    /// Comma separated team ids
    #[serde(default)]
    pub team_ids: Option<String>,
}

impl ConnectQuery {
    fn viewer(&self) -> Result<Viewer, ValueObjectError> {
        let user_id = UserId::new(self.user_id.clone())?;
        let team_ids = self
            .team_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| TeamId::new(id.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Viewer::new(user_id, team_ids))
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let viewer = match query.viewer() {
        Ok(viewer) => viewer,
        Err(e) => {
            tracing::warn!("Rejecting socket with invalid identity: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, viewer)))
}

/// Outbound queue → socket. Ends after sending a close frame or when the socket is gone.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let message = match frame {
                OutboundFrame::Text(text) => Message::Text(text.into()),
                OutboundFrame::Binary(bytes) => Message::Binary(bytes.into()),
                OutboundFrame::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    })
}

/// PING every `interval`; close the connection after two intervals without a PONG.
fn keep_alive_loop(context: Weak<ConnectionContext>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        loop {
            ticker.tick().await;
            let Some(context) = context.upgrade() else {
                break;
            };
            if context.keep_alive().is_expired(Instant::now(), interval * 2) {
                tracing::warn!("Connection '{}' missed its PONG, closing", context.id());
                context.close();
                break;
            }
            if !context.send_frame(OutboundFrame::Binary(vec![PING])) {
                break;
            }
        }
    })
}

fn reliable_retry_loop(context: Weak<ConnectionContext>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        loop {
            ticker.tick().await;
            let Some(context) = context.upgrade() else {
                break;
            };
            if context.is_closed() {
                break;
            }
            let resent = context.flush_due_reliable();
            if resent > 0 {
                tracing::debug!("Resent {} reliable messages on '{}'", resent, context.id());
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, viewer: Viewer) {
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let context = state.lifecycle.open(tx);

    let mut send_task = pusher_loop(rx, sender);
    let keep_alive_task = keep_alive_loop(Arc::downgrade(&context), state.keep_alive_interval);
    let retry_task = reliable_retry_loop(Arc::downgrade(&context), state.reliable_retry_interval);

    // Requests that arrive before the handshake completes are held by the ready gate.
    let recv_context = context.clone();
    let dispatcher = state.dispatcher.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", recv_context.id(), e);
                    break;
                }
            };

            let outcome = match msg {
                Message::Binary(bytes) => dispatcher.dispatch(&recv_context, &bytes),
                Message::Text(text) => dispatcher.dispatch(&recv_context, text.as_str().as_bytes()),
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", recv_context.id());
                    break;
                }
                // Protocol-level ping/pong is answered by the socket layer
                Message::Ping(_) | Message::Pong(_) => continue,
            };
            tracing::trace!("Dispatched frame on '{}': {:?}", recv_context.id(), outcome);
        }
    });

    if let Err(e) = state.lifecycle.handshake(&context, viewer) {
        tracing::warn!("Handshake failed: {}", e);
        context.close();
    }

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };
    keep_alive_task.abort();
    retry_task.abort();

    state.lifecycle.teardown(&context);
}
