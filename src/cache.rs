//! Process-lifetime audit trail of completed evaluations.
//!
//! Not a source of truth: nothing reads it back into a pipeline, and it is
//! gone on restart.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::MethodUsed;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEvaluation {
    pub key: String,
    pub result: String,
    pub method_used: MethodUsed,
    pub timestamp: DateTime<Utc>,
}

/// Listing row, without the (potentially long) result text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSummary {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub method_used: MethodUsed,
}

/// Where a pipeline reports finished results.
pub trait ResultSink: Send + Sync {
    fn record(&self, entry: CachedEvaluation);
}

/// Composite key: startup name plus a digest of the question sequence.
pub fn cache_key(startup_name: &str, questions: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    for q in questions {
        hasher.update(q.as_bytes());
        hasher.update(&[0x1f]);
    }
    let hex = hasher.finalize().to_hex();
    format!("{}_{}", startup_name, &hex.as_str()[..16])
}

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, CachedEvaluation>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CachedEvaluation> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Oldest first.
    pub fn list(&self) -> Vec<CachedSummary> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut rows: Vec<CachedSummary> = entries
            .values()
            .map(|e| CachedSummary {
                key: e.key.clone(),
                timestamp: e.timestamp,
                method_used: e.method_used,
            })
            .collect();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.key.cmp(&b.key)));
        rows
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes everything; returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let count = entries.len();
        entries.clear();
        count
    }
}

impl ResultSink for ResultCache {
    fn record(&self, entry: CachedEvaluation) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(entry.key.clone(), entry);
    }
}
