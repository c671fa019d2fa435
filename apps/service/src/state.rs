//! Last known monitor state, persisted as a JSON file between passes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use checkup::{MonitorCheckResult, MonitorStatus, StatusStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of the latest check of one monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorRecord {
    pub status: MonitorStatus,
    pub message: String,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_days_remaining: Option<i64>,
}

type Records = BTreeMap<String, MonitorRecord>;

/// JSON-file backed store of monitor records, keyed by monitor id
pub struct StateFile {
    path: PathBuf,
    records: Mutex<Records>,
    save_lock: tokio::sync::Mutex<()>,
}

impl StateFile {
    /// Load records from `path`, starting empty when the file does not exist
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse state file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No state file yet, starting empty");
                Records::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read state file {}", path.display()));
            }
        };

        Ok(Self { path, records: Mutex::new(records), save_lock: tokio::sync::Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, monitor_id: &str, result: &MonitorCheckResult) {
        let record = MonitorRecord {
            status: result.status,
            message: result.message.clone(),
            checked_at: Utc::now(),
            certificate_days_remaining: result.certificate_days_remaining,
        };
        self.lock().insert(monitor_id.to_string(), record);
    }

    pub fn get(&self, monitor_id: &str) -> Option<MonitorRecord> {
        self.lock().get(monitor_id).cloned()
    }

    /// Write all records, replacing the file atomically
    pub async fn save(&self) -> Result<()> {
        // Concurrent saves share one staging file
        let _saving = self.save_lock.lock().await;
        let serialized = serde_json::to_string_pretty(&*self.lock())?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, serialized)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StatusStore for StateFile {
    async fn last_status(&self, monitor_id: &str) -> checkup::Result<Option<MonitorStatus>> {
        Ok(self.get(monitor_id).map(|record| record.status))
    }
}
