//! trebuchet server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin trebuchet-server
//! cargo run --bin trebuchet-server -- --host 0.0.0.0 --port 3000 --admin-token secret
//! ```

use std::sync::Arc;

use clap::Parser;
use trebuchet_server::{
    config::ServerConfig,
    domain::OperationExecutor,
    infrastructure::{
        executor::{HttpOperationExecutor, UnavailableExecutor},
        notifier::{MattermostWebhookNotifier, SlackApiNotifier},
        pubsub::InMemorySubscriberRegistry,
        reporter::TracingErrorReporter,
        repository::{Fixtures, InMemoryRepositories},
    },
    ui::{AppState, Server},
    usecase::{
        ConnectionLifecycleUseCase, MeetingStageTimeLimitProcessor, MessageDispatcher, Publisher,
        RunScheduledJobsUseCase, TrebuchetRequestHandler, spawn_poll_loop,
    },
};
use trebuchet_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize dependencies in order:
    // 1. Repositories
    // 2. Pub/Sub and outbound integrations
    // 3. UseCases
    // 4. AppState
    // 5. Server

    // 1. Repositories (in-memory, optionally seeded)
    let repos = match &config.fixtures {
        Some(path) => InMemoryRepositories::seeded(Fixtures::load(path).await?).await,
        None => InMemoryRepositories::empty(),
    };

    // 2. Pub/Sub, notifiers, executor
    let registry = Arc::new(InMemorySubscriberRegistry::new());
    let publisher = Arc::new(Publisher::new(registry.clone()));
    let reporter = Arc::new(TracingErrorReporter);
    let clock = Arc::new(SystemClock);
    let slack = Arc::new(SlackApiNotifier::with_timeout(
        config.slack_api_base.clone(),
        config.http_timeout(),
    )?);
    let mattermost = Arc::new(MattermostWebhookNotifier::with_timeout(config.http_timeout())?);
    let executor: Arc<dyn OperationExecutor> = match &config.graphql_upstream {
        Some(endpoint) => Arc::new(HttpOperationExecutor::new(
            endpoint.clone(),
            config.http_timeout(),
        )?),
        None => {
            tracing::warn!("No GraphQL upstream configured; queries and mutations will fail");
            Arc::new(UnavailableExecutor)
        }
    };

    // 3. UseCases
    let lifecycle = Arc::new(ConnectionLifecycleUseCase::new(config.reliable()));
    let handler = Arc::new(TrebuchetRequestHandler::new(
        registry,
        executor,
        reporter.clone(),
    ));
    let dispatcher = Arc::new(MessageDispatcher::new(handler, reporter.clone()));
    let stage_time_limit = Arc::new(MeetingStageTimeLimitProcessor::new(
        repos.integrations.clone(),
        slack,
        mattermost,
        repos.notifications.clone(),
        publisher,
        clock.clone(),
        config.app_origin.clone(),
    ));
    let scheduled_jobs = Arc::new(RunScheduledJobsUseCase::new(
        repos.scheduled_jobs.clone(),
        repos.meetings.clone(),
        stage_time_limit,
        clock,
        reporter,
    ));

    if let Some(interval) = config.schedule_poll_interval() {
        tracing::info!(
            "Polling scheduled jobs every {:?} (horizon {}s)",
            interval,
            config.schedule_horizon_secs
        );
        spawn_poll_loop(scheduled_jobs.clone(), interval, config.schedule_horizon_secs);
    }

    if config.admin_token.is_none() {
        tracing::warn!("No admin token configured; /intranet endpoints are disabled");
    }

    // 4. AppState
    let state = AppState {
        lifecycle,
        dispatcher,
        scheduled_jobs,
        admin_token: config.admin_token.clone(),
        keep_alive_interval: config.keep_alive_interval(),
        reliable_retry_interval: config.reliable().retry_interval,
    };

    // 5. Server
    Server::new(state).run(config.host, config.port).await
}
