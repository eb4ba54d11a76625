//! Outbound trebuchet messages.

use serde_json::Value;

use crate::domain::{
    ConnectionContext, GqlMessageType, OperationId, OutboundFrame, TrebuchetResponse,
};

/// Serialize `{id, type, payload}` and queue it on the connection.
///
/// With `reliable` set the message goes through the Reliable Message Protocol
/// and is retried until the client acknowledges it. Returns false when the
/// socket is already gone.
pub fn send_gql_message(
    context: &ConnectionContext,
    op_id: Option<&OperationId>,
    kind: GqlMessageType,
    reliable: bool,
    payload: Option<Value>,
) -> bool {
    let message = TrebuchetResponse {
        id: op_id.cloned(),
        kind,
        payload,
    };
    let json = match serde_json::to_string(&message) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to serialize message for '{}': {}", context.id(), e);
            return false;
        }
    };

    if reliable {
        context.send_reliable(&json)
    } else {
        context.send_frame(OutboundFrame::Text(json))
    }
}
