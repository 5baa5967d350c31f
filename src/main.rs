//! Entry point: load config, wire dependencies, run the queue consumer and health endpoints.

use auth_service::config::Config;
use auth_service::db::{self, PgAccountStore};
use auth_service::{
    create_app, AccountAuthenticator, AppState, CredentialHasher, QueueConsumer, RedisQueue,
    TokenService,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    let store = Arc::new(PgAccountStore::new(db_pool.clone()));
    let hasher = CredentialHasher::new(&config.hashing)?;
    let tokens = TokenService::new(&config.token.secret, config.token.ttl)?;
    let authenticator = AccountAuthenticator::new(store, hasher, tokens);
    let queue = RedisQueue::new(&config.redis_url)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = QueueConsumer::new(queue.clone(), authenticator, config.queue.clone());
    let consumer = tokio::spawn(consumer.run(shutdown_rx.clone()));

    let app = create_app(AppState {
        db: db_pool,
        queue,
    });

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        tracing::info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    let mut http_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = http_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    consumer.await??;
    Ok(())
}
