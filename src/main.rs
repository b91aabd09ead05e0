//! Neptune Judge - Application Entry Point
//!
//! Runs the HTTP surface and the judge/result queue consumers in one process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use neptune_judge::{
    config::{QueueBackend, CONFIG},
    db::{
        self,
        repositories::{ContestRepository, SubmissionRepository, SubmissionStore},
    },
    handlers,
    judge::Judge0Client,
    notify::NotificationHub,
    queue::{Broker, InMemoryBroker, QueuePublisher, RedisStreamBroker, SharedBroker},
    services::{JudgeWorker, LeaderboardService, ResultWorker, SubmissionService, WorkerPool},
    state::AppState,
    storage::{FsCaseAssetStore, SourceFileStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| CONFIG.server.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Neptune Judge...");

    // Initialize database connection pool
    let db_pool = db::create_pool(&CONFIG.database).await?;

    // Run database migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&db_pool).await?;

    // Initialize queue broker
    let broker: SharedBroker = match CONFIG.queue.backend {
        QueueBackend::Redis => Arc::new(RedisStreamBroker::connect(&CONFIG.queue).await?),
        QueueBackend::Memory => {
            tracing::warn!("Using in-memory queues, pending messages are lost on restart");
            Arc::new(InMemoryBroker::new(Duration::from_millis(CONFIG.queue.block_ms)))
        }
    };
    for queue in [&CONFIG.queue.judge_queue, &CONFIG.queue.result_queue] {
        broker.ensure_queue(queue).await?;
    }

    let publisher = QueuePublisher::new(
        broker.clone(),
        CONFIG.queue.dead_letter_queue.clone(),
        CONFIG.retry,
    );

    // Stores and services
    let hub = Arc::new(NotificationHub::new());
    let store: Arc<dyn SubmissionStore> = Arc::new(SubmissionRepository::new(db_pool.clone()));
    let sources = SourceFileStore::new(&CONFIG.storage.submissions_path);

    let submissions = SubmissionService::new(
        store.clone(),
        sources.clone(),
        publisher.clone(),
        CONFIG.queue.judge_queue.clone(),
    );
    let leaderboard = LeaderboardService::new(
        store.clone(),
        Arc::new(ContestRepository::new(db_pool.clone())),
    );

    let judge_worker = Arc::new(JudgeWorker::new(
        store.clone(),
        Arc::new(FsCaseAssetStore::new(
            db_pool.clone(),
            &CONFIG.storage.test_cases_root,
        )),
        sources,
        Arc::new(Judge0Client::new(&CONFIG.execution)?),
        hub.clone(),
        publisher.clone(),
        CONFIG.queue.result_queue.clone(),
    ));
    let result_worker = Arc::new(ResultWorker::new(store, hub.clone()));

    // Start queue consumers
    let mut workers = WorkerPool::new();
    workers.spawn(
        judge_worker,
        &publisher,
        &CONFIG.queue.judge_queue,
        CONFIG.workers.judge_workers,
        &CONFIG.workers.worker_id,
    );
    workers.spawn(
        result_worker,
        &publisher,
        &CONFIG.queue.result_queue,
        CONFIG.workers.result_workers,
        &CONFIG.workers.worker_id,
    );
    tracing::info!(consumers = workers.len(), "Queue consumers started");

    // Create application state
    let state = AppState::new(
        db_pool.clone(),
        hub,
        submissions,
        leaderboard,
        CONFIG.clone(),
    );

    // Build the router
    let app = handlers::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start the server
    let addr = SocketAddr::new(CONFIG.server.host.parse()?, CONFIG.server.port);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining consumers...");
    workers.shutdown().await;
    db_pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
