//! Generator → parse → optional enhancer → reconcile → finalize.

pub mod evaluation;
pub mod questions;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::clients::{GenerationParams, Generator};
use crate::error::{EvaluatorError, Result};

pub use evaluation::{EvaluationOutcome, EvaluationPipeline, EvaluationSettings};
pub use questions::{QuestionOutcome, QuestionPipeline, QuestionSettings};

/// Primary output shorter than this (trimmed, in characters) counts as a
/// failed generation.
pub const MIN_PRIMARY_CHARS: usize = 50;

/// Which stages contributed to a final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodUsed {
    PrimaryOnly,
    PrimaryPlusEnhanced,
    PrimaryWithEnhancementError,
}

impl MethodUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodUsed::PrimaryOnly => "primary_only",
            MethodUsed::PrimaryPlusEnhanced => "primary_plus_enhanced",
            MethodUsed::PrimaryWithEnhancementError => "primary_with_enhancement_error",
        }
    }
}

impl fmt::Display for MethodUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one primary generator call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGenerationResult {
    pub text: String,
    pub succeeded: bool,
    pub fault: Option<String>,
}

impl RawGenerationResult {
    /// The text, or a `Generation` error naming the fault.
    pub fn into_text(self, operation: &str) -> Result<String> {
        if self.succeeded {
            return Ok(self.text);
        }
        let message = match self.fault {
            Some(fault) => format!("{operation} failed: {fault}"),
            None => format!(
                "{operation} produced insufficient output ({} characters)",
                self.text.trim().chars().count()
            ),
        };
        error!("{}", message);
        Err(EvaluatorError::Generation { message })
    }
}

pub async fn run_generator(
    generator: &dyn Generator,
    prompt: &str,
    params: GenerationParams,
) -> RawGenerationResult {
    match generator.generate(prompt, params).await {
        Ok(text) => {
            let succeeded = text.trim().chars().count() >= MIN_PRIMARY_CHARS;
            RawGenerationResult {
                text,
                succeeded,
                fault: None,
            }
        }
        Err(e) => RawGenerationResult {
            text: String::new(),
            succeeded: false,
            fault: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ScriptedGenerator;

    const PARAMS: GenerationParams = GenerationParams::new(10, 0.7);

    #[tokio::test]
    async fn test_short_output_is_not_a_success() {
        let g = ScriptedGenerator::always("too short");
        let raw = run_generator(&g, "p", PARAMS).await;
        assert!(!raw.succeeded);
        assert!(raw.fault.is_none());
        let err = raw.into_text("question generation").unwrap_err();
        assert!(err.to_string().contains("insufficient output (9 characters)"));
    }

    #[tokio::test]
    async fn test_fault_is_reported() {
        let g = ScriptedGenerator::failing("CUDA out of memory");
        let raw = run_generator(&g, "p", PARAMS).await;
        assert!(!raw.succeeded);
        let err = raw.into_text("evaluation").unwrap_err();
        assert!(matches!(err, EvaluatorError::Generation { .. }));
        assert!(err.to_string().contains("CUDA out of memory"));
    }

    #[test]
    fn test_method_used_wire_names() {
        assert_eq!(
            serde_json::to_value(MethodUsed::PrimaryWithEnhancementError).unwrap(),
            "primary_with_enhancement_error"
        );
        assert_eq!(MethodUsed::PrimaryPlusEnhanced.to_string(), "primary_plus_enhanced");
    }
}
