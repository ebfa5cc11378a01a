//! Startup profile and the input checks that run before any generation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_FOUNDED_YEAR: i32 = 1900;
pub const MAX_FOUNDED_YEAR: i32 = 2030;
pub const MIN_PITCH_CHARS: usize = 20;

/// Minimum number of question/answer pairs an evaluation needs.
pub const MIN_EVALUATION_QUESTIONS: usize = 5;

/// Rejections raised before any model is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing or empty field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid founded year: {value}")]
    InvalidYear { value: String },

    #[error("Pitch is too short ({len} characters, at least 20 required)")]
    PitchTooShort { len: usize },

    #[error("Number of questions ({questions}) and answers ({answers}) must match")]
    AnswerCountMismatch { questions: usize, answers: usize },

    #[error("At least {min} questions required for evaluation, got {count}")]
    InsufficientQuestions { count: usize, min: usize },

    #[error("Answer {index} is empty")]
    EmptyAnswer { index: usize },
}

/// Caller-supplied description of the startup being evaluated.
///
/// Every field arrives as free text; `founded_year` is kept as the caller
/// typed it and only checked for being a plausible integer year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub pitch: String,
    #[serde(default, deserialize_with = "crate::deserializers::de_string_or_number")]
    pub founded_year: String,
    #[serde(default)]
    pub funding: String,
}

impl StartupProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields: [(&'static str, &str); 5] = [
            ("name", &self.name),
            ("industry", &self.industry),
            ("pitch", &self.pitch),
            ("founded_year", &self.founded_year),
            ("funding", &self.funding),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { field });
            }
        }

        let year = self
            .founded_year
            .trim()
            .parse::<i32>()
            .map_err(|_| ValidationError::InvalidYear {
                value: self.founded_year.clone(),
            })?;
        if !(MIN_FOUNDED_YEAR..=MAX_FOUNDED_YEAR).contains(&year) {
            return Err(ValidationError::InvalidYear {
                value: self.founded_year.clone(),
            });
        }

        let len = self.pitch.trim().chars().count();
        if len < MIN_PITCH_CHARS {
            return Err(ValidationError::PitchTooShort { len });
        }

        Ok(())
    }
}

/// Checks the question/answer alignment an evaluation relies on.
pub fn validate_answers(questions: &[String], answers: &[String]) -> Result<(), ValidationError> {
    if questions.len() != answers.len() {
        return Err(ValidationError::AnswerCountMismatch {
            questions: questions.len(),
            answers: answers.len(),
        });
    }
    if questions.len() < MIN_EVALUATION_QUESTIONS {
        return Err(ValidationError::InsufficientQuestions {
            count: questions.len(),
            min: MIN_EVALUATION_QUESTIONS,
        });
    }
    if let Some(index) = answers.iter().position(|a| a.trim().is_empty()) {
        return Err(ValidationError::EmptyAnswer { index: index + 1 });
    }
    Ok(())
}
