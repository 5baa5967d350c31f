//! Queue consumer: pops requests, runs them concurrently, pushes replies.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::auth::AccountAuthenticator;
use crate::config::QueueConfig;
use crate::error::AppResult;
use crate::handlers::queue::{decode, dispatch};
use crate::models::message::Outcome;
use crate::repositories::RedisQueue;

/// How long one blocking pop waits before re-checking for shutdown.
const POP_TIMEOUT: Duration = Duration::from_secs(1);
/// Pause after a Redis failure before reconnecting.
const RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct QueueConsumer {
    queue: RedisQueue,
    auth: AccountAuthenticator,
    config: QueueConfig,
}

impl QueueConsumer {
    pub fn new(queue: RedisQueue, auth: AccountAuthenticator, config: QueueConfig) -> Self {
        Self {
            queue,
            auth,
            config,
        }
    }

    /// Consume until `shutdown` flips to `true`, then wait for in-flight requests.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> AppResult<()> {
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        info!(queue = %self.config.request_queue, concurrency = self.config.concurrency, "queue consumer started");

        'outer: while !*shutdown.borrow() {
            let mut conn = match self.queue.blocking_connection().await {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "redis connect failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(RETRY_DELAY) => continue,
                        _ = shutdown.changed() => break,
                    }
                }
            };

            loop {
                if *shutdown.borrow() {
                    break 'outer;
                }
                let permit = tokio::select! {
                    p = permits.clone().acquire_owned() => match p {
                        Ok(p) => p,
                        Err(_) => break 'outer,
                    },
                    _ = shutdown.changed() => break 'outer,
                };

                let raw = match RedisQueue::pop(&mut conn, &self.config.request_queue, POP_TIMEOUT).await {
                    Ok(Some(raw)) => raw,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(error = %e, "queue pop failed, reconnecting");
                        tokio::time::sleep(RETRY_DELAY).await;
                        break;
                    }
                };

                let Some(envelope) = decode(&raw) else {
                    continue;
                };

                let queue = self.queue.clone();
                let auth = self.auth.clone();
                let reply_ttl = self.config.reply_ttl;
                tasks.spawn(async move {
                    let _permit = permit;
                    let reply_to = envelope.reply_to.clone();
                    let pattern = envelope.pattern.clone();
                    let reply = dispatch(&auth, envelope).await;
                    match reply_to {
                        Some(reply_to) => {
                            if let Err(e) = queue.reply(&reply_to, &reply, reply_ttl).await {
                                error!(id = %reply.id, error = %e, "failed to send reply");
                            }
                        }
                        None => {
                            let ok = matches!(reply.outcome, Outcome::Response(_));
                            debug!(id = %reply.id, %pattern, ok, "request without reply_to handled");
                        }
                    }
                });

                while let Some(res) = tasks.try_join_next() {
                    if let Err(e) = res {
                        error!(error = %e, "request task panicked");
                    }
                }
            }
        }

        info!(in_flight = tasks.len(), "queue consumer draining");
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!(error = %e, "request task panicked");
            }
        }
        info!("queue consumer stopped");
        Ok(())
    }
}
