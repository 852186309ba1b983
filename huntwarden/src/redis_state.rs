// huntwarden/src/redis_state.rs
//
// Redis state persistence.
//
// Trust history and the suspicious-activity log are the only store contents
// worth keeping across restarts: behavior profiles and indexes rebuild from
// traffic within minutes, but a lost trust prior resets every player's decay.
//
// Data layout in Redis:
//   hw:trust:{player_id}  JSON TrustRecord          (TTL = trust_ttl_days)
//   hw:suspicious:{player_id}  JSON [SuspiciousActivity] (TTL = trust_ttl_days)
//   hw:meta:checkpoint  Unix timestamp of last save
//
// Without a reachable Redis the service runs purely in memory; checkpoint
// failures are logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::state::store::{PlayerStore, SuspiciousActivity, TrustRecord};

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url:            String,   // redis://127.0.0.1:6379
    pub key_prefix:     String,   // "hw:" by default
    pub trust_ttl_days: u32,
    pub checkpoint_interval_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url:                      "redis://127.0.0.1:6379".to_string(),
            key_prefix:               "hw:".to_string(),
            trust_ttl_days:           90,
            checkpoint_interval_secs: 300,  // save every 5 minutes
        }
    }
}

impl RedisConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    fn key(&self, kind: &str, id: &str) -> String {
        format!("{}{}:{}", self.key_prefix, kind, id)
    }
}

/// Open a managed (auto-reconnecting) connection.
pub async fn connect(url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(url)?;
    Ok(ConnectionManager::new(client).await?)
}

/// SCAN all keys matching `pattern`.
async fn scan_keys(conn: &mut ConnectionManager, pattern: &str) -> Result<Vec<String>> {
    let mut cursor: u64 = 0;
    let mut keys = Vec::new();
    loop {
        let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH").arg(pattern)
            .arg("COUNT").arg(500)
            .query_async(conn)
            .await?;
        keys.extend(batch);
        if next == 0 { break; }
        cursor = next;
    }
    Ok(keys)
}

// ── Persistence manager ───────────────────────────────────────────────────────

pub struct RedisPersistence {
    config: RedisConfig,
    store:  Arc<PlayerStore>,
    conn:   ConnectionManager,
}

impl RedisPersistence {
    pub async fn connect(config: RedisConfig, store: Arc<PlayerStore>) -> Result<Self> {
        let conn = connect(&config.url).await?;
        Ok(Self { config, store, conn })
    }

    /// Background checkpoint loop: periodically persists state to Redis.
    pub async fn checkpoint_loop(self: Arc<Self>) {
        let interval = Duration::from_secs(self.config.checkpoint_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            if let Err(e) = self.save_checkpoint().await {
                error!("Redis checkpoint failed: {}", e);
            }
        }
    }

    /// Save trust records and suspicious-activity logs in one pipeline.
    pub async fn save_checkpoint(&self) -> Result<()> {
        let ttl   = self.config.trust_ttl_days as u64 * 86400;
        let trust = self.store.trust_records();
        let susp  = self.store.suspicious_records();

        let mut pipe = redis::pipe();
        for (id, rec) in &trust {
            pipe.cmd("SET").arg(self.config.key("trust", id))
                .arg(serde_json::to_string(rec)?)
                .arg("EX").arg(ttl)
                .ignore();
        }
        for (id, log) in &susp {
            pipe.cmd("SET").arg(self.config.key("suspicious", id))
                .arg(serde_json::to_string(log)?)
                .arg("EX").arg(ttl)
                .ignore();
        }
        let checkpoint_ts = Utc::now().timestamp();
        pipe.cmd("SET").arg(self.config.key("meta", "checkpoint")).arg(checkpoint_ts).ignore();

        let mut conn = self.conn.clone();
        pipe.query_async::<_, ()>(&mut conn).await?;

        info!(trust = trust.len(), suspicious = susp.len(), ts = checkpoint_ts, "Redis checkpoint complete");
        Ok(())
    }

    /// Restore state from Redis on startup. Returns players restored.
    pub async fn restore(&self) -> Result<usize> {
        info!("Restoring state from Redis ({})", self.config.url);
        let mut conn = self.conn.clone();
        let mut restored = 0;

        let trust_prefix = self.config.key("trust", "");
        for key in scan_keys(&mut conn, &format!("{trust_prefix}*")).await? {
            let Some(raw): Option<String> = conn.get(&key).await? else { continue };
            match serde_json::from_str::<TrustRecord>(&raw) {
                Ok(rec) => {
                    self.store.restore_trust(&key[trust_prefix.len()..], rec);
                    restored += 1;
                }
                Err(e) => warn!(key = %key, "skipping unreadable trust record: {}", e),
            }
        }

        let susp_prefix = self.config.key("suspicious", "");
        for key in scan_keys(&mut conn, &format!("{susp_prefix}*")).await? {
            let Some(raw): Option<String> = conn.get(&key).await? else { continue };
            match serde_json::from_str::<Vec<SuspiciousActivity>>(&raw) {
                Ok(log) => self.store.restore_suspicious(&key[susp_prefix.len()..], log),
                Err(e)  => warn!(key = %key, "skipping unreadable suspicious log: {}", e),
            }
        }

        info!(players = restored, "Redis restore complete");
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_prefix() {
        let cfg = RedisConfig::default();
        assert_eq!(cfg.key("trust", "p1"), "hw:trust:p1");
        assert_eq!(cfg.key("meta", "checkpoint"), "hw:meta:checkpoint");
    }

    #[test]
    fn with_url_keeps_defaults() {
        let cfg = RedisConfig::with_url("redis://cache:6379");
        assert_eq!(cfg.url, "redis://cache:6379");
        assert_eq!(cfg.trust_ttl_days, 90);
    }
}
