//! opsdesk - HTTP Server Entry Point
//!
//! Starts the dispatch loop and the HTTP API.

use std::sync::Arc;

use opsdesk::api::{self, AppState};
use opsdesk::config::Config;
use opsdesk::dispatch::Dispatcher;
use opsdesk::interpreter::CommandInterpreter;
use opsdesk::llm::OpenAiClient;
use opsdesk::metrics::Metrics;
use opsdesk::store::{QueueStore, SharedQueue};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsdesk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, data_dir={}, sandbox={}",
        config.model,
        config.data_dir.display(),
        config.sandbox_mode
    );

    let queue: SharedQueue = Arc::new(QueueStore::new(&config.data_dir));
    let metrics = Arc::new(Metrics::new());
    let llm = Arc::new(OpenAiClient::new(
        config.api_key.clone(),
        config.model.clone(),
    ));
    let interpreter = Arc::new(CommandInterpreter::new(
        llm,
        config.data_dir.clone(),
        Arc::clone(&queue),
    ));

    if config.loop_interval_secs > 0 {
        let dispatcher = Dispatcher::new(
            &config,
            Arc::clone(&queue),
            Arc::clone(&metrics),
            Arc::clone(&interpreter),
        )
        .with_interpreter_middleware(true);
        info!(
            "Dispatch loop running every {}s",
            config.loop_interval_secs
        );
        tokio::spawn(async move { dispatcher.run_forever().await });
    } else {
        info!("Dispatch loop disabled (LOOP_INTERVAL_SECS=0)");
    }

    let state = Arc::new(AppState {
        config,
        metrics,
        interpreter,
        queue,
    });
    api::serve(state).await?;

    Ok(())
}
