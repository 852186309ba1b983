// huntwarden/src/clue/cache.rs
//
// Generated-clue cache.
//
// Key:   "clue:" + md5("{lat}_{lon}_{level}_{theme}")
// Value: JSON-encoded GeneratedClue, expiring after CACHE_TTL seconds.
//
// Backends:
//   RedisCache  SETEX / GET through a managed connection
//   MemoryCache  DashMap with per-entry deadlines, used when Redis is absent
//
// Cache failures are the caller's to log; a broken cache never blocks clue
// generation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::clue::types::GeneratedClue;
use crate::error::CacheError;

pub fn cache_key(lat: f64, lon: f64, level: u32, theme: &str) -> String {
    let digest = md5::compute(format!("{}_{}_{}_{}", lat, lon, level, theme));
    format!("clue:{:x}", digest)
}

#[async_trait]
pub trait ClueCache: Send + Sync {
    fn backend(&self) -> &'static str;
    async fn get(&self, key: &str) -> Result<Option<GeneratedClue>, CacheError>;
    async fn set(&self, key: &str, clue: &GeneratedClue, ttl: Duration) -> Result<(), CacheError>;
}

// ── Redis ─────────────────────────────────────────────────────────────────────

pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self { Self { conn } }
}

#[async_trait]
impl ClueCache for RedisCache {
    fn backend(&self) -> &'static str { "redis" }

    async fn get(&self, key: &str) -> Result<Option<GeneratedClue>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|r| serde_json::from_str(&r)).transpose().map_err(CacheError::from)
    }

    async fn set(&self, key: &str, clue: &GeneratedClue, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(clue)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, payload, ttl.as_secs().max(1)).await?;
        Ok(())
    }
}

// ── In-memory ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (Instant, String)>,
}

impl MemoryCache {
    pub fn new() -> Self { Self::default() }

    /// Drop expired entries. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (deadline, _)| *deadline > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[async_trait]
impl ClueCache for MemoryCache {
    fn backend(&self) -> &'static str { "memory" }

    async fn get(&self, key: &str) -> Result<Option<GeneratedClue>, CacheError> {
        // Copy out before touching the map again; the read guard pins the shard.
        let hit = self.entries.get(key).map(|e| (e.0, e.1.clone()));
        match hit {
            Some((deadline, raw)) if deadline > Instant::now() => Ok(Some(serde_json::from_str(&raw)?)),
            Some(_) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, clue: &GeneratedClue, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(clue)?;
        self.entries.insert(key.to_string(), (Instant::now() + ttl, payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clue::types::{ClueType, CryptoProof};

    fn clue() -> GeneratedClue {
        GeneratedClue {
            text:                 "Find the bell that never rings.".into(),
            clue_type:            ClueType::Riddle,
            source:               "fallback".into(),
            difficulty:           0.3,
            length:               31,
            quality_score:        0.71,
            generation_timestamp: "2026-01-01T00:00:00+00:00".into(),
            model_used:           "template".into(),
            crypto_proof:         Some(CryptoProof {
                hash:                "h".into(),
                hmac:                "m".into(),
                timestamp:           "t".into(),
                location_commitment: "c".into(),
            }),
        }
    }

    #[test]
    fn key_is_prefixed_md5() {
        let k = cache_key(1.5, 2.0, 3, "pirates");
        assert!(k.starts_with("clue:"));
        assert_eq!(k.len(), "clue:".len() + 32);
        assert_eq!(k, format!("clue:{:x}", md5::compute("1.5_2_3_pirates")));
        assert_ne!(k, cache_key(1.5, 2.0, 4, "pirates"));
    }

    #[tokio::test]
    async fn memory_round_trip_within_ttl() {
        let cache = MemoryCache::new();
        let c = clue();
        cache.set("clue:k", &c, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("clue:k").await.unwrap(), Some(c));
        assert_eq!(cache.get("clue:other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_disappear() {
        let cache = MemoryCache::new();
        cache.set("clue:k", &clue(), Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("clue:k").await.unwrap(), None);
        cache.set("clue:j", &clue(), Duration::ZERO).await.unwrap();
        assert_eq!(cache.sweep(), 1);
        assert!(cache.is_empty());
    }
}
