// huntwarden/src/engine/audit.rs
//
// Appends verification outcomes and suspicious-activity records to JSONL
// files for offline review:
//
//   verifications.jsonl        every comprehensive verification
//   suspicious_activity.jsonl  fraud analyses above the risk threshold
//
// With no output directory configured, writes are skipped and only the
// structured log line remains. Callers spawn these writes off the request
// path; failures are logged, never surfaced to the player.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::engine::fusion::VerificationOutcome;
use crate::state::store::SuspiciousActivity;

pub const VERIFICATIONS_FILE: &str = "verifications.jsonl";
pub const SUSPICIOUS_FILE:    &str = "suspicious_activity.jsonl";

pub struct AuditLog {
    out: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(output_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = &output_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self { out: output_dir })
    }

    pub fn disabled() -> Self { Self { out: None } }

    pub fn dir(&self) -> Option<&Path> { self.out.as_deref() }

    pub async fn record_verification(&self, outcome: &VerificationOutcome) {
        info!(
            request_id  = %outcome.request_id,
            player_id   = %outcome.player_id,
            trust_score = outcome.trust_score,
            level       = %outcome.verification_level,
            "verification completed"
        );
        if let Err(e) = self.append(VERIFICATIONS_FILE, outcome).await {
            warn!("audit write failed: {}", e);
        }
    }

    pub async fn record_suspicious(&self, activity: &SuspiciousActivity) {
        if let Err(e) = self.append(SUSPICIOUS_FILE, activity).await {
            warn!("audit write failed: {}", e);
        }
    }

    async fn append<T: Serialize>(&self, file: &str, record: &T) -> Result<()> {
        let Some(dir) = &self.out else { return Ok(()) };
        let line = serde_json::to_string(record)? + "\n";
        let mut f = OpenOptions::new().create(true).append(true)
            .open(dir.join(file)).await?;
        f.write_all(line.as_bytes()).await?;
        Ok(())
    }
}
