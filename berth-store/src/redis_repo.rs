use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;

use berth_core::{CasOutcome, Reservation, ReservationStore, SeatKey, StoreError};

/// Sorted set indexing every reserved record by its expiry unix timestamp,
/// so the sweeper's scan is a ZRANGEBYSCORE instead of a keyspace walk.
const EXPIRY_INDEX: &str = "reservations:expiry";

/// Compare the stored record's fencing token and swap value + expiry index
/// in one atomic step. ARGV[1] = expected token ('' = expect absent),
/// ARGV[2] = new JSON ('' = delete), ARGV[3] = expiry score ('' = no index
/// entry, i.e. a sold record).
const CAS_SCRIPT: &str = r#"
local cur = redis.call('GET', KEYS[1])
if ARGV[1] == '' then
    if cur then return 0 end
else
    if not cur then return 0 end
    local ok, rec = pcall(cjson.decode, cur)
    if not ok or rec['token'] ~= ARGV[1] then return 0 end
end
if ARGV[2] == '' then
    redis.call('DEL', KEYS[1])
    redis.call('ZREM', KEYS[2], KEYS[1])
else
    redis.call('SET', KEYS[1], ARGV[2])
    if ARGV[3] == '' then
        redis.call('ZREM', KEYS[2], KEYS[1])
    else
        redis.call('ZADD', KEYS[2], ARGV[3], KEYS[1])
    end
end
return 1
"#;

/// Out-of-process reservation store for multi-instance deployments. One JSON
/// value per seat key plus the expiry index; all conditional writes go
/// through a Lua script so the one-owner invariant holds across processes.
#[derive(Clone)]
pub struct RedisReservationStore {
    client: redis::Client,
    cas_script: redis::Script,
}

impl RedisReservationStore {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self {
            client,
            cas_script: redis::Script::new(CAS_SCRIPT),
        })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)
    }

    /// Sliding-window rate limit used by the API middleware; unrelated to
    /// reservations but it lives on the same connection.
    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(count <= limit)
    }
}

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn parse(raw: &str) -> Result<Reservation, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))
}

#[async_trait]
impl ReservationStore for RedisReservationStore {
    async fn get(&self, key: &SeatKey) -> Result<Option<Reservation>, StoreError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(key.storage_key()).await.map_err(backend)?;
        raw.as_deref().map(parse).transpose()
    }

    async fn compare_and_set(
        &self,
        key: &SeatKey,
        expected: Option<&Reservation>,
        new: Option<Reservation>,
    ) -> Result<CasOutcome, StoreError> {
        let mut conn = self.conn().await?;

        let expected_token = expected
            .map(|r| r.token.to_string())
            .unwrap_or_default();
        let new_json = match &new {
            Some(record) => serde_json::to_string(record)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            None => String::new(),
        };
        let score = new
            .as_ref()
            .and_then(|r| r.expires_at)
            .map(|t| t.timestamp().to_string())
            .unwrap_or_default();

        let committed: i64 = self
            .cas_script
            .key(key.storage_key())
            .key(EXPIRY_INDEX)
            .arg(expected_token)
            .arg(new_json)
            .arg(score)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        Ok(if committed == 1 {
            CasOutcome::Committed
        } else {
            CasOutcome::Conflict
        })
    }

    async fn scan_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Reservation>, StoreError> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn
            .zrangebyscore_limit(EXPIRY_INDEX, "-inf", now.timestamp(), 0, limit as isize)
            .await
            .map_err(backend)?;

        let mut expired = Vec::with_capacity(members.len());
        for member in members {
            let raw: Option<String> = conn.get(&member).await.map_err(backend)?;
            match raw {
                Some(raw) => expired.push(parse(&raw)?),
                None => {
                    // Stale index entry (value deleted out-of-band); drop it.
                    let _: () = conn.zrem(EXPIRY_INDEX, &member).await.map_err(backend)?;
                }
            }
        }
        Ok(expired)
    }

    async fn delete(&self, key: &SeatKey) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let storage_key = key.storage_key();
        let _: () = redis::pipe()
            .atomic()
            .del(&storage_key)
            .zrem(EXPIRY_INDEX, &storage_key)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
