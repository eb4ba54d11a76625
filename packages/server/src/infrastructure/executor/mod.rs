//! OperationExecutor 実装
//!
//! - `http`: 上流の GraphQL HTTP エンドポイントへの転送
//! - `UnavailableExecutor`: 上流が設定されていないとき

pub mod http;

pub use http::{HttpOperationExecutor, UnavailableExecutor};
