//! Request handlers.

mod http;
mod websocket;

pub use http::{health_check, run_scheduled_jobs, schedule_job};
pub use websocket::websocket_handler;
