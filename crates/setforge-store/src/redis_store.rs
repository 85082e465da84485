//! Redis-backed fast cache.
//!
//! The connection is opened lazily on first use and kept in a
//! [`ConnectionManager`], which reconnects by itself. If the initial
//! connect fails, the store stays "down" for `reconnect_backoff` and every
//! call during that window fails fast with [`StoreError::Unavailable`].

use std::future::Future;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use setforge_protocol::{Codec, GameState, JsonCodec, RoomId};
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout};

use crate::{StoreBackend, StoreConfig, StoreError};

enum Link {
    Idle,
    Connected(ConnectionManager),
    Down { until: Instant },
}

/// Room states in Redis, one key per room, written with a TTL.
pub struct RedisStore<C: Codec = JsonCodec> {
    client: Client,
    link: Mutex<Link>,
    codec: C,
    config: StoreConfig,
}

impl RedisStore<JsonCodec> {
    /// Builds a store for `url`. Does not connect yet.
    ///
    /// # Errors
    /// Returns `StoreError::Redis` if the URL cannot be parsed.
    pub fn open(url: &str, config: StoreConfig) -> Result<Self, StoreError> {
        Self::with_codec(url, config, JsonCodec)
    }
}

impl<C: Codec> RedisStore<C> {
    pub fn with_codec(url: &str, config: StoreConfig, codec: C) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            link: Mutex::new(Link::Idle),
            codec,
            config: config.validated(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let mut link = self.link.lock().await;
        match &*link {
            Link::Connected(manager) => return Ok(manager.clone()),
            Link::Down { until } if Instant::now() < *until => {
                return Err(StoreError::Unavailable("in reconnect backoff".into()));
            }
            _ => {}
        }

        let attempt = timeout(
            self.config.op_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await;

        match attempt {
            Ok(Ok(manager)) => {
                tracing::info!("connected to redis cache");
                *link = Link::Connected(manager.clone());
                Ok(manager)
            }
            Ok(Err(e)) => {
                *link = Link::Down {
                    until: Instant::now() + self.config.reconnect_backoff,
                };
                Err(StoreError::Redis(e))
            }
            Err(_) => {
                *link = Link::Down {
                    until: Instant::now() + self.config.reconnect_backoff,
                };
                Err(StoreError::Timeout("connect"))
            }
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.config.op_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout(op)),
        }
    }
}

#[async_trait]
impl<C: Codec> StoreBackend for RedisStore<C> {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn load(&self, room: &RoomId) -> Result<Option<GameState>, StoreError> {
        let key = self.config.room_key(room.as_str());
        let mut conn = self.connection().await?;
        let bytes: Option<Vec<u8>> = self.bounded("get", conn.get(&key)).await?;
        match bytes {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, room: &RoomId, state: &GameState) -> Result<(), StoreError> {
        let key = self.config.room_key(room.as_str());
        let bytes = self.codec.encode(state)?;
        let ttl = self.config.ttl.as_secs();
        let mut conn = self.connection().await?;
        self.bounded::<(), _>("set", conn.set_ex(&key, bytes, ttl))
            .await
    }

    async fn remove(&self, room: &RoomId) -> Result<(), StoreError> {
        let key = self.config.room_key(room.as_str());
        let mut conn = self.connection().await?;
        self.bounded::<(), _>("del", conn.del(&key)).await
    }
}
