//! trebuchet: real-time transport core.
//!
//! - `domain`: wire framing, connection state, pub/sub topics, jobs and the traits around them
//! - `usecase`: message dispatch, publishing, scheduled job dispatch
//! - `infrastructure`: in-memory storage, Slack / Mattermost / GraphQL over HTTP
//! - `ui`: axum router, WebSocket and admin HTTP handlers
//! - `config`: command line / environment configuration

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
