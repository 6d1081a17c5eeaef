/// Realtime notification utilities: Redis client and pub/sub notifier

pub mod client;
pub mod notifier;

pub use client::{RedisClient, RedisClientError, RedisConfig};
pub use notifier::{Notification, Notifier, Publisher};
