//! Redis connection pool and the KV port implementation.
//!
//! Nonce claims, the idempotency fast tier and rate-limit counters all ride
//! on this pool. Everything here is best-effort from the caller's point of
//! view except the nonce claim, whose degraded mode is handled by the
//! authenticity pipeline itself.

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

use crate::ports::{KvError, KvStore};

pub type RedisPool = Pool;

/// Initialize the Redis pool. Connection establishment is lazy; failures
/// show up on first use.
pub fn init_redis_pool(redis_url: &str) -> Result<RedisPool, anyhow::Error> {
    let cfg = Config::from_url(redis_url);
    let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

    tracing::info!("Redis pool initialized");
    Ok(pool)
}

async fn get_conn(pool: &RedisPool) -> Result<Connection, KvError> {
    pool.get().await.map_err(|e| KvError(e.to_string()))
}

/// `KvStore` over Redis.
pub struct RedisKvStore {
    pool: RedisPool,
}

impl RedisKvStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn claim_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut conn = get_conn(&self.pool).await?;
        // SET key 1 NX EX <ttl>: returns OK when we created the key, nil
        // when somebody holds it already.
        let claimed: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut *conn)
            .await
            .map_err(|e| KvError(e.to_string()))?;
        Ok(claimed.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut conn = get_conn(&self.pool).await?;
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| KvError(e.to_string()))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), KvError> {
        let mut conn = get_conn(&self.pool).await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(|e| KvError(e.to_string()))?;
        Ok(())
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, KvError> {
        let mut conn = get_conn(&self.pool).await?;
        let count: i64 = conn
            .incr(key, 1)
            .await
            .map_err(|e| KvError(e.to_string()))?;
        if count == 1 {
            // First hit in this window: arm the expiry with a 1s margin.
            conn.expire::<_, ()>(key, ttl.as_secs() as i64 + 1)
                .await
                .map_err(|e| KvError(e.to_string()))?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool() -> RedisPool {
        init_redis_pool("redis://127.0.0.1:6379").unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn nonce_claim_is_single_use() {
        let store = RedisKvStore::new(test_pool());
        let key = format!("nonce:test:{}", uuid::Uuid::new_v4());

        assert!(store
            .claim_if_absent(&key, Duration::from_secs(120))
            .await
            .unwrap());
        assert!(!store
            .claim_if_absent(&key, Duration::from_secs(120))
            .await
            .unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn get_set_roundtrip() {
        let store = RedisKvStore::new(test_pool());
        let key = format!("idempotency:test:{}", uuid::Uuid::new_v4());

        assert_eq!(store.get(&key).await.unwrap(), None);
        store
            .set(&key, b"cached-response", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get(&key).await.unwrap(),
            Some(b"cached-response".to_vec())
        );
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn counter_increments() {
        let store = RedisKvStore::new(test_pool());
        let key = format!("ratelimit:test:{}", uuid::Uuid::new_v4());

        assert_eq!(
            store.incr_with_ttl(&key, Duration::from_secs(60)).await.unwrap(),
            1
        );
        assert_eq!(
            store.incr_with_ttl(&key, Duration::from_secs(60)).await.unwrap(),
            2
        );
    }
}
