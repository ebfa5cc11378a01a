//! Answer evaluation: primary adapter, enhancer restructuring into the
//! scored report, failure disclosure, formatting, and the audit record.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CachedEvaluation, ResultSink, cache_key};
use crate::clients::{Enhancer, GenerationParams, Generator};
use crate::enhancer::{EnhancementOutcome, RetryPolicy, invoke_enhancer};
use crate::error::Result;
use crate::parser::{CriterionScore, overall_score, parse_criteria};
use crate::pipeline::{MethodUsed, run_generator};
use crate::profile::{StartupProfile, validate_answers};
use crate::prompts;

pub const EMPTY_EVALUATION: &str = "No evaluation generated.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationSettings {
    pub generation: GenerationParams,
    pub enhancement: GenerationParams,
    pub retry: RetryPolicy,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            generation: GenerationParams::new(4000, 0.6),
            enhancement: GenerationParams::new(3000, 0.3),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub evaluation: String,
    /// Unformatted primary output, present only when the enhanced report
    /// replaced it.
    pub raw_evaluation: Option<String>,
    pub method_used: MethodUsed,
    pub processing_time: f64,
    pub cache_key: String,
    pub criteria: Vec<CriterionScore>,
    pub overall_score: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

pub struct EvaluationPipeline {
    generator: Arc<dyn Generator>,
    enhancer: Option<Arc<dyn Enhancer>>,
    sink: Option<Arc<dyn ResultSink>>,
    settings: EvaluationSettings,
}

impl EvaluationPipeline {
    pub fn new(
        generator: Arc<dyn Generator>,
        enhancer: Option<Arc<dyn Enhancer>>,
        settings: EvaluationSettings,
    ) -> Self {
        Self {
            generator,
            enhancer,
            sink: None,
            settings,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Evaluates founder answers. With `enhance` unset the enhancer is never
    /// contacted and the primary output is returned as-is (formatted).
    pub async fn run(
        &self,
        profile: &StartupProfile,
        questions: &[String],
        answers: &[String],
        enhance: bool,
    ) -> Result<EvaluationOutcome> {
        let start = Instant::now();

        profile.validate()?;
        validate_answers(questions, answers)?;
        info!(
            "Evaluating startup {} ({} answers)",
            profile.name,
            answers.len()
        );

        let prompt = prompts::evaluation_prompt(profile, questions, answers);
        let raw = run_generator(self.generator.as_ref(), &prompt, self.settings.generation).await;
        let primary = raw.into_text("Evaluation")?;
        info!("Primary evaluation generated ({} chars)", primary.len());

        let (text, raw_evaluation, method_used) = if enhance {
            let outcome = match &self.enhancer {
                Some(enhancer) => {
                    let prompt =
                        prompts::evaluation_enhancement_prompt(profile, questions, answers, &primary);
                    invoke_enhancer(
                        enhancer.as_ref(),
                        &prompt,
                        self.settings.enhancement,
                        self.settings.retry,
                    )
                    .await
                }
                None => EnhancementOutcome::Failed("enhancer is not configured".to_string()),
            };
            match outcome {
                EnhancementOutcome::Enhanced(text) => {
                    info!("Evaluation enhanced by secondary model");
                    (text, Some(primary), MethodUsed::PrimaryPlusEnhanced)
                }
                EnhancementOutcome::Failed(reason) => {
                    warn!("Evaluation enhancement failed: {}", reason);
                    let disclosed = disclose_enhancement_failure(&primary, &reason);
                    (disclosed, None, MethodUsed::PrimaryWithEnhancementError)
                }
            }
        } else {
            (primary, None, MethodUsed::PrimaryOnly)
        };

        let evaluation = format_evaluation(&text);
        let criteria = parse_criteria(&evaluation);
        let overall = overall_score(&criteria);
        debug!("Parsed {} scored criteria", criteria.len());

        let key = cache_key(&profile.name, questions);
        let timestamp = Utc::now();
        if let Some(sink) = &self.sink {
            sink.record(CachedEvaluation {
                key: key.clone(),
                result: evaluation.clone(),
                method_used,
                timestamp,
            });
        }

        let processing_time = start.elapsed().as_secs_f64();
        info!(
            "Evaluation completed in {:.2} seconds using {}",
            processing_time, method_used
        );

        Ok(EvaluationOutcome {
            evaluation,
            raw_evaluation,
            method_used,
            processing_time,
            cache_key: key,
            criteria,
            overall_score: overall,
            timestamp,
        })
    }
}

/// Prefixes the primary evaluation with a note saying enhancement failed.
pub fn disclose_enhancement_failure(primary: &str, reason: &str) -> String {
    format!(
        "NOTE: Secondary enhancement failed ({reason}); showing the original model evaluation.\n\n\
         ORIGINAL MODEL EVALUATION:\n\n{}",
        primary.trim()
    )
}

/// Inserts a blank line ahead of each numbered criterion and each
/// "Overall" heading. Lines are never removed or reordered, and each line
/// keeps its own terminator (`\n` or `\r\n`, trailing newline included).
pub fn format_evaluation(text: &str) -> String {
    if text.trim().is_empty() {
        return EMPTY_EVALUATION.to_string();
    }

    let mut out = String::with_capacity(text.len() + 64);
    let mut prev: Option<&str> = None;
    for line in text.split_inclusive('\n') {
        if let Some(prev) = prev
            && !prev.trim().is_empty()
            && starts_section(line.trim_start())
        {
            out.push_str(if prev.ends_with("\r\n") { "\r\n" } else { "\n" });
        }
        out.push_str(line);
        prev = Some(line);
    }
    out
}

fn starts_section(line: &str) -> bool {
    if line
        .get(..7)
        .is_some_and(|p| p.eq_ignore_ascii_case("overall"))
    {
        return true;
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && line[digits..].starts_with(". ")
}
