//! Redis connection and list-based request/reply queue.

use crate::error::{AppError, AppResult};
use crate::models::message::{ReplyEnvelope, RequestEnvelope};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

const REPLY_PREFIX: &str = "auth:reply:";

fn reply_key() -> String {
    format!("{}{}", REPLY_PREFIX, Uuid::new_v4())
}

/// Redis lists as a work queue: producers `LPUSH`, consumers `BRPOP`.
#[derive(Clone)]
pub struct RedisQueue {
    client: Arc<redis::Client>,
}

impl RedisQueue {
    /// Create queue handle from Redis URL. Does not connect yet.
    pub fn new(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get a multiplexed connection for non-blocking commands.
    pub async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    /// Dedicated connection for blocking pops, which would stall a multiplexed one.
    pub async fn blocking_connection(&self) -> Result<redis::aio::Connection, AppError> {
        let conn = self.client.get_async_connection().await?;
        Ok(conn)
    }

    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    /// Append a raw message to `queue`.
    pub async fn push(&self, queue: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("LPUSH")
            .arg(queue)
            .arg(payload)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    /// Pop the oldest message, waiting up to `timeout`. `None` when the wait elapsed.
    pub async fn pop(
        conn: &mut redis::aio::Connection,
        queue: &str,
        timeout: Duration,
    ) -> AppResult<Option<String>> {
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(queue)
            .arg(timeout.as_secs().max(1))
            .query_async(conn)
            .await?;
        Ok(popped.map(|(_key, payload)| payload))
    }

    /// Push a reply and let it expire if the requester is gone.
    pub async fn reply(&self, reply_to: &str, reply: &ReplyEnvelope, ttl: Duration) -> AppResult<()> {
        let payload = serde_json::to_string(reply)?;
        let mut conn = self.connection().await?;
        redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(reply_to)
            .arg(&payload)
            .ignore()
            .cmd("EXPIRE")
            .arg(reply_to)
            .arg(ttl.as_secs().max(1))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(reply_to = %reply_to, id = %reply.id, "reply sent");
        Ok(())
    }

    /// Client side: send a request to `queue` and wait for its reply.
    pub async fn request(
        &self,
        queue: &str,
        pattern: &str,
        data: serde_json::Value,
        timeout: Duration,
    ) -> AppResult<ReplyEnvelope> {
        let reply_to = reply_key();
        let envelope = RequestEnvelope {
            id: Uuid::new_v4().to_string(),
            pattern: pattern.to_string(),
            data,
            reply_to: Some(reply_to.clone()),
        };
        self.push(queue, &serde_json::to_string(&envelope)?).await?;

        let mut conn = self.blocking_connection().await?;
        let raw = Self::pop(&mut conn, &reply_to, timeout)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "no reply to {} within {:?}",
                    pattern,
                    timeout
                ))
            })?;
        let reply: ReplyEnvelope = serde_json::from_str(&raw)?;
        if reply.id != envelope.id {
            return Err(AppError::Internal(anyhow::anyhow!(
                "reply id mismatch: expected {}, got {}",
                envelope.id,
                reply.id
            )));
        }
        Ok(reply)
    }
}
