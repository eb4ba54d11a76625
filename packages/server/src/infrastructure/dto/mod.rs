//! Data Transfer Objects
//!
//! - `http`: 管理 HTTP API のリクエスト・レスポンス

pub mod http;
