//! Long-running service loops.

pub mod consumer;

pub use consumer::QueueConsumer;
