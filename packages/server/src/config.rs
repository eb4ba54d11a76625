//! Server configuration.
//!
//! Every flag can also be set through a `TREBUCHET_*` environment variable.

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::domain::ReliableConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "trebuchet-server")]
#[command(about = "GraphQL-over-WebSocket transport, pub/sub fan-out and scheduled jobs", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "TREBUCHET_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "TREBUCHET_PORT", default_value = "8080")]
    pub port: u16,

    /// Seconds between keep-alive PINGs. A socket without a PONG for two intervals is closed.
    #[arg(long, env = "TREBUCHET_KEEP_ALIVE_SECS", default_value = "10")]
    pub keep_alive_secs: u64,

    /// Milliseconds before an unacknowledged reliable message is sent again
    #[arg(long, env = "TREBUCHET_RELIABLE_RETRY_MS", default_value = "5000")]
    pub reliable_retry_ms: u64,

    /// Total sends of a reliable message before it is dropped
    #[arg(long, env = "TREBUCHET_RELIABLE_MAX_ATTEMPTS", default_value = "5")]
    pub reliable_max_attempts: u32,

    /// Bearer token for the /intranet endpoints. Without it they answer 503.
    #[arg(long, env = "TREBUCHET_ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    /// Public origin used to build meeting links
    #[arg(long, env = "TREBUCHET_APP_ORIGIN", default_value = "http://localhost:3000")]
    pub app_origin: String,

    #[arg(long, env = "TREBUCHET_SLACK_API_BASE", default_value = "https://slack.com/api")]
    pub slack_api_base: String,

    /// Timeout for Slack, Mattermost and upstream GraphQL requests
    #[arg(long, env = "TREBUCHET_HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,

    /// Upstream GraphQL endpoint for queries and mutations
    #[arg(long, env = "TREBUCHET_GRAPHQL_UPSTREAM")]
    pub graphql_upstream: Option<String>,

    /// Run the scheduled job dispatcher every N seconds (disabled when unset)
    #[arg(long, env = "TREBUCHET_SCHEDULE_POLL_SECS")]
    pub schedule_poll_secs: Option<u64>,

    /// Horizon in seconds for each self-poll
    #[arg(long, env = "TREBUCHET_SCHEDULE_HORIZON_SECS", default_value = "60")]
    pub schedule_horizon_secs: i64,

    /// JSON file with meetings, scheduled jobs and chat integrations to load at startup
    #[arg(long, env = "TREBUCHET_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "TREBUCHET_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn reliable(&self) -> ReliableConfig {
        ReliableConfig {
            retry_interval: Duration::from_millis(self.reliable_retry_ms.max(1)),
            max_attempts: self.reliable_max_attempts.max(1),
        }
    }

    pub fn schedule_poll_interval(&self) -> Option<Duration> {
        self.schedule_poll_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
