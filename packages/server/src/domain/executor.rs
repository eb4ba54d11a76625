//! GraphQL handling seams.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    connection::{ConnectionContext, Viewer},
    error::ExecutorError,
    message::{OperationPayload, TrebuchetRequest, TrebuchetResponse},
};

/// Handles one parsed trebuchet request for a connection.
///
/// The dispatcher only sends the returned response when it carries an `id`.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(
        &self,
        request: TrebuchetRequest,
        context: Arc<ConnectionContext>,
    ) -> Option<TrebuchetResponse>;
}

/// Executes queries and mutations. Returns the GraphQL result body (`data` / `errors`).
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    async fn execute(
        &self,
        payload: &OperationPayload,
        viewer: Option<&Viewer>,
    ) -> Result<Value, ExecutorError>;
}
