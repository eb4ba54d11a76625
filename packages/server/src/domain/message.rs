//! trebuchet protocol messages.
//!
//! Client → server: `start` / `stop` / `connection_terminate` (JSON object or array).
//! Server → client: `data` / `error` / `complete`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use super::{
    error::SubscribeError,
    subscription::{SubscriptionChannel, Topic},
    value_object::OperationId,
};

/// Request sent by a client over the socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrebuchetRequest {
    /// Start a query, mutation or subscription. Without an `id` nobody is
    /// listening for the response on the client side.
    Start {
        #[serde(default)]
        id: Option<OperationId>,
        #[serde(default)]
        payload: OperationPayload,
    },
    /// Stop a running subscription.
    Stop { id: OperationId },
    /// Client is going away; close the socket.
    ConnectionTerminate,
}

/// GraphQL operation carried by a `start` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default)]
    pub variables: Value,
}

#[derive(Debug, Deserialize)]
struct TopicVariables {
    channel: SubscriptionChannel,
    key: String,
}

impl OperationPayload {
    /// Whether the document is a subscription (`subscription ...` as its first keyword).
    ///
    /// Only the `query` text is inspected. A payload that carries just a persisted
    /// `documentId` is never treated as a subscription and goes to the executor.
    pub fn is_subscription(&self) -> bool {
        self.query
            .as_deref()
            .map(|query| query.trim_start().starts_with("subscription"))
            .unwrap_or(false)
    }

    /// Resolve the pub/sub topic from `variables.channel` and `variables.key`.
    pub fn subscription_topic(&self) -> Result<Topic, SubscribeError> {
        let variables = TopicVariables::deserialize(&self.variables)
            .map_err(|e| SubscribeError::InvalidTopic(e.to_string()))?;
        if variables.key.trim().is_empty() {
            return Err(SubscribeError::InvalidTopic("key is empty".to_string()));
        }
        Ok(Topic::new(variables.channel, variables.key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GqlMessageType {
    Data,
    Error,
    Complete,
}

/// Message sent by the server. Only replies carrying an `id` reach the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrebuchetResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<OperationId>,
    #[serde(rename = "type")]
    pub kind: GqlMessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl TrebuchetResponse {
    pub fn data(id: Option<OperationId>, payload: Value) -> Self {
        Self {
            id,
            kind: GqlMessageType::Data,
            payload: Some(payload),
        }
    }

    /// GraphQL-style error payload: `{"errors": [{"message": ...}]}`
    pub fn error(id: Option<OperationId>, message: impl Into<String>) -> Self {
        Self {
            id,
            kind: GqlMessageType::Error,
            payload: Some(json!({ "errors": [{ "message": message.into() }] })),
        }
    }

    pub fn complete(id: OperationId) -> Self {
        Self {
            id: Some(id),
            kind: GqlMessageType::Complete,
            payload: None,
        }
    }
}

/// Frame queued for a socket's outbound path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// Sender half of a socket's outbound queue
pub type OutboundSender = mpsc::UnboundedSender<OutboundFrame>;
