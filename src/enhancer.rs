//! The single retry policy shared by question and evaluation enhancement.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::clients::{Enhancer, EnhancerError, GenerationParams};

/// Replies whose trimmed length is at or below this are not accepted.
pub const MIN_ENHANCED_CHARS: usize = 50;

pub const INSUFFICIENT_CONTENT: &str = "insufficient content";

pub const DEADLINE_REACHED: &str = "enhancement deadline reached";

/// Result of one enhancement request after all retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum EnhancementOutcome {
    Enhanced(String),
    Failed(String),
}

impl EnhancementOutcome {
    pub fn is_enhanced(&self) -> bool {
        matches!(self, Self::Enhanced(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// No attempt or backoff runs past this instant.
    pub deadline: Option<Instant>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            deadline: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn sleep_fits(&self, wait: Duration) -> bool {
        self.deadline.is_none_or(|d| Instant::now() + wait < d)
    }

    /// Wait after the attempt with index `attempt` (0-based): 2^attempt + 1 seconds.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt).saturating_add(1))
    }

    /// Every wait a fully failing run sleeps through, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|a| self.backoff(a))
            .collect()
    }
}

/// Calls the enhancer until it returns enough text or attempts run out.
///
/// Never returns an error: transport faults and short replies both end up
/// as [`EnhancementOutcome::Failed`] once the policy is exhausted. A policy
/// deadline cuts the run short the same way: an in-flight call is dropped
/// when it expires and no backoff is started that would end past it.
pub async fn invoke_enhancer(
    enhancer: &dyn Enhancer,
    prompt: &str,
    params: GenerationParams,
    policy: RetryPolicy,
) -> EnhancementOutcome {
    let attempts = policy.max_attempts.max(1);
    let mut last_reason = INSUFFICIENT_CONTENT.to_string();

    for attempt in 0..attempts {
        if policy.expired() {
            warn!("Enhancer deadline reached before attempt {}", attempt + 1);
            return EnhancementOutcome::Failed(DEADLINE_REACHED.to_string());
        }
        info!(
            "Calling enhancer {} (attempt {}/{})",
            enhancer.model(),
            attempt + 1,
            attempts
        );

        let call = enhancer.complete(prompt, params);
        let result = match policy.deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Enhancer deadline reached during attempt {}", attempt + 1);
                    return EnhancementOutcome::Failed(DEADLINE_REACHED.to_string());
                }
            },
            None => call.await,
        };

        match result {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.chars().count() > MIN_ENHANCED_CHARS {
                    info!("Enhancer call succeeded on attempt {}", attempt + 1);
                    return EnhancementOutcome::Enhanced(trimmed.to_string());
                }
                warn!(
                    "Enhancer returned {} characters on attempt {}, not enough",
                    trimmed.chars().count(),
                    attempt + 1
                );
                last_reason = INSUFFICIENT_CONTENT.to_string();
            }
            Err(e) => {
                warn!("Enhancer error on attempt {}: {}", attempt + 1, e);
                last_reason = e.to_string();
            }
        }

        if attempt + 1 < attempts {
            let wait = policy.backoff(attempt);
            if !policy.sleep_fits(wait) {
                warn!("No time left for another enhancer attempt; giving up");
                break;
            }
            info!("Waiting {}s before retrying enhancer", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }

    EnhancementOutcome::Failed(last_reason)
}
