//! Redis-backed request/reply queue.

mod redis_repo;

pub use redis_repo::RedisQueue;
