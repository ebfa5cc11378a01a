//! Question generation: primary adapter, optional enhancer refinement, and
//! the fixed-size guarantee on the way out.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clients::{Enhancer, GenerationParams, Generator};
use crate::enhancer::{EnhancementOutcome, RetryPolicy, invoke_enhancer};
use crate::error::Result;
use crate::parser::parse_questions;
use crate::pipeline::{MethodUsed, run_generator};
use crate::profile::StartupProfile;
use crate::prompts;

/// Every question set leaving the pipeline has exactly this many entries.
pub const QUESTION_COUNT: usize = 10;

/// Enhanced sets smaller than this are discarded in favour of the primary set.
pub const MIN_ENHANCED_QUESTIONS: usize = 8;

/// Generic padding, used in order. Holds at least [`QUESTION_COUNT`]
/// distinct entries so padding can always reach the full count.
pub const FALLBACK_QUESTIONS: [&str; QUESTION_COUNT] = [
    "What is your customer acquisition strategy?",
    "How do you plan to achieve profitability?",
    "What are your biggest risks and how do you mitigate them?",
    "What is your current monthly revenue and growth rate?",
    "How large is your addressable market and how did you size it?",
    "Who are your main competitors and what sets you apart?",
    "What will you do with the funding you are raising?",
    "What relevant experience does your founding team bring?",
    "How does your business scale without costs growing at the same rate?",
    "What milestones do you expect to hit in the next 12 months?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStage {
    Init,
    PrimaryGenerated,
    EnhancementAttempted,
    EnhancementSkipped,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionSettings {
    pub generation: GenerationParams,
    pub enhancement: GenerationParams,
    pub retry: RetryPolicy,
}

impl Default for QuestionSettings {
    fn default() -> Self {
        Self {
            generation: GenerationParams::new(1024, 0.7),
            enhancement: GenerationParams::new(1500, 0.4),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub questions: Vec<String>,
    /// The primary set, present only when an enhanced set replaced it.
    pub raw_questions: Option<Vec<String>>,
    pub method_used: MethodUsed,
    pub processing_time: f64,
}

pub struct QuestionPipeline {
    generator: Arc<dyn Generator>,
    enhancer: Option<Arc<dyn Enhancer>>,
    settings: QuestionSettings,
}

impl QuestionPipeline {
    pub fn new(
        generator: Arc<dyn Generator>,
        enhancer: Option<Arc<dyn Enhancer>>,
        settings: QuestionSettings,
    ) -> Self {
        Self {
            generator,
            enhancer,
            settings,
        }
    }

    pub async fn run(&self, profile: &StartupProfile, enhance: bool) -> Result<QuestionOutcome> {
        let start = Instant::now();
        let mut stage = QuestionStage::Init;
        debug!("question pipeline: {:?}", stage);

        profile.validate()?;
        info!("Generating questions for startup: {}", profile.name);

        let prompt = prompts::question_prompt(profile);
        let raw = run_generator(self.generator.as_ref(), &prompt, self.settings.generation).await;
        let primary_text = raw.into_text("Question generation")?;
        let primary = parse_questions(&primary_text);
        stage = QuestionStage::PrimaryGenerated;
        debug!("question pipeline: {:?}", stage);
        info!("Primary generator produced {} questions", primary.len());

        let (selected, raw_questions, method_used) = match (&self.enhancer, enhance) {
            (Some(enhancer), true) => {
                stage = QuestionStage::EnhancementAttempted;
                debug!("question pipeline: {:?}", stage);
                self.enhance(enhancer.as_ref(), profile, primary).await
            }
            (None, true) => {
                stage = QuestionStage::EnhancementSkipped;
                debug!("question pipeline: {:?}", stage);
                warn!("Question enhancement requested but no enhancer is configured");
                (primary, None, MethodUsed::PrimaryOnly)
            }
            (_, false) => {
                stage = QuestionStage::EnhancementSkipped;
                debug!("question pipeline: {:?}", stage);
                (primary, None, MethodUsed::PrimaryOnly)
            }
        };

        let questions = finalize_questions(selected);
        stage = QuestionStage::Finalized;
        debug!("question pipeline: {:?}", stage);

        let processing_time = start.elapsed().as_secs_f64();
        info!(
            "Questions generated in {:.2} seconds using {}",
            processing_time, method_used
        );

        Ok(QuestionOutcome {
            questions,
            raw_questions,
            method_used,
            processing_time,
        })
    }

    async fn enhance(
        &self,
        enhancer: &dyn Enhancer,
        profile: &StartupProfile,
        primary: Vec<String>,
    ) -> (Vec<String>, Option<Vec<String>>, MethodUsed) {
        let prompt = prompts::question_enhancement_prompt(profile, &primary);
        let outcome = invoke_enhancer(
            enhancer,
            &prompt,
            self.settings.enhancement,
            self.settings.retry,
        )
        .await;

        match outcome {
            EnhancementOutcome::Enhanced(text) => {
                let enhanced = parse_questions(&text);
                if enhanced.len() >= MIN_ENHANCED_QUESTIONS {
                    info!("Questions enhanced ({} parsed)", enhanced.len());
                    (enhanced, Some(primary), MethodUsed::PrimaryPlusEnhanced)
                } else {
                    warn!(
                        "Enhancer produced only {} questions, keeping primary set",
                        enhanced.len()
                    );
                    (primary, None, MethodUsed::PrimaryOnly)
                }
            }
            EnhancementOutcome::Failed(reason) => {
                warn!("Question enhancement failed, keeping primary set: {}", reason);
                (primary, None, MethodUsed::PrimaryOnly)
            }
        }
    }
}

/// Pads with unused fallback questions, then truncates, to exactly
/// [`QUESTION_COUNT`] entries.
pub fn finalize_questions(mut questions: Vec<String>) -> Vec<String> {
    if questions.len() < QUESTION_COUNT {
        for fallback in FALLBACK_QUESTIONS {
            if questions.len() >= QUESTION_COUNT {
                break;
            }
            let taken = questions.iter().any(|q| q.eq_ignore_ascii_case(fallback));
            if !taken {
                questions.push(fallback.to_string());
            }
        }
    }
    questions.truncate(QUESTION_COUNT);
    questions
}
