//! Append-only JSONL log of completed evaluations.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::profile::StartupProfile;
use crate::service::{EvaluationRequest, EvaluationResponse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub profile: StartupProfile,
    pub questions: Vec<String>,
    pub answers: Vec<String>,
    pub result: EvaluationResponse,
}

impl ReportRecord {
    pub fn new(request: &EvaluationRequest, response: &EvaluationResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            profile: request.startup.clone(),
            questions: request.questions.clone(),
            answers: request.answers.clone(),
            result: response.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ReportLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ReportLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one record as a single line, creating the parent directory
    /// on first use.
    pub async fn append(&self, record: &ReportRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!("Report {} appended to {}", record.id, self.path.display());
        Ok(())
    }

    /// Every record in the log, oldest first. A missing file is an empty log;
    /// lines that do not parse are skipped.
    pub async fn read_all(&self) -> Result<Vec<ReportRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ReportRecord>(line) {
                Ok(r) => records.push(r),
                Err(e) => warn!("Skipping malformed report line {}: {}", n + 1, e),
            }
        }
        Ok(records)
    }
}
