//! 上流 GraphQL への転送
//!
//! ソケットで受けた query / mutation を、viewer をヘッダーに載せて上流に POST する。
//! 上流は GraphQL の結果（`data` / `errors`）をそのまま返す。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ExecutorError, OperationExecutor, OperationPayload, Viewer};

pub const VIEWER_USER_HEADER: &str = "x-viewer-user-id";
pub const VIEWER_TEAMS_HEADER: &str = "x-viewer-team-ids";

pub struct HttpOperationExecutor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOperationExecutor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ExecutorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl OperationExecutor for HttpOperationExecutor {
    async fn execute(
        &self,
        payload: &OperationPayload,
        viewer: Option<&Viewer>,
    ) -> Result<Value, ExecutorError> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(viewer) = viewer {
            let team_ids: Vec<&str> = viewer.team_ids.iter().map(|id| id.as_str()).collect();
            request = request
                .header(VIEWER_USER_HEADER, viewer.user_id.as_str())
                .header(VIEWER_TEAMS_HEADER, team_ids.join(","));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExecutorError::Transport(format!("HTTP {}", status.as_u16())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExecutorError::InvalidResponse(e.to_string()))?;
        if !body.is_object() {
            return Err(ExecutorError::InvalidResponse(
                "expected a JSON object".to_string(),
            ));
        }
        Ok(body)
    }
}

/// 上流が無いときの executor。query / mutation はすべてエラーになる。
pub struct UnavailableExecutor;

#[async_trait]
impl OperationExecutor for UnavailableExecutor {
    async fn execute(
        &self,
        _payload: &OperationPayload,
        _viewer: Option<&Viewer>,
    ) -> Result<Value, ExecutorError> {
        Err(ExecutorError::Unavailable)
    }
}
