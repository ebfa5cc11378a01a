//! Extraction of structured items from free-form model output.
//!
//! Every function here is total: malformed or unexpected text yields an
//! empty (or shorter) result, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Upper bound on items returned by [`parse_items`].
pub const MAX_ITEMS: usize = 10;
/// Candidates shorter than this (in characters) are treated as noise.
pub const MIN_ITEM_CHARS: usize = 10;
/// Upper bound on criteria returned by [`parse_criteria`].
pub const MAX_CRITERIA: usize = 15;

static ENUMERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[.)](?:\s+|$)").expect("enumerator regex"));
static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:q(?:uestion)?)\s*\d*\s*[:.)](?:\s+|$)").expect("label regex")
});
static CRITERION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[*#\s]*(\d{1,2})[.)]\s*\**\s*([^:*]+?)\s*\**\s*:\s*\**\s*(\d{1,2}(?:\.\d+)?)\s*/\s*10\**(.*)$",
    )
    .expect("criterion regex")
});
static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(strength|weakness|improvement)s?\s*:").expect("section regex")
});

/// What the caller expects each extracted line to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Items get a trailing `?` when the model dropped it.
    Question,
    /// Items are kept as written.
    Statement,
}

/// Extracts enumerated items ("1. ...", "Q3: ...") from `text`, in order.
pub fn parse_items(text: &str, kind: ItemKind) -> Vec<String> {
    text.lines()
        .filter_map(|line| extract_item(line, kind))
        .take(MAX_ITEMS)
        .collect()
}

pub fn parse_questions(text: &str) -> Vec<String> {
    parse_items(text, ItemKind::Question)
}

fn extract_item(line: &str, kind: ItemKind) -> Option<String> {
    let line = line.trim();
    let first = line.chars().next()?;

    let remainder = if first.is_ascii_digit() {
        match ENUMERATOR_RE.find(line) {
            Some(m) => &line[m.end()..],
            None => line,
        }
    } else {
        let m = LABEL_RE.find(line)?;
        &line[m.end()..]
    };

    let remainder = remainder.trim();
    if remainder.is_empty() {
        return None;
    }

    let mut item = remainder.to_string();
    if kind == ItemKind::Question && !item.ends_with('?') {
        item.push('?');
    }

    if item.chars().count() < MIN_ITEM_CHARS {
        return None;
    }
    Some(item)
}

/// One scored line of a structured evaluation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub index: u8,
    pub name: String,
    /// Score out of 10, clamped to 1..=10.
    pub score: u8,
    pub analysis: String,
    pub strength: Option<String>,
    pub weakness: Option<String>,
    pub improvement: Option<String>,
}

/// Extracts `N. Name: S/10 — analysis. Strength: … Weakness: … Improvement: …`
/// lines. Lines without a `/10` score are ignored.
pub fn parse_criteria(text: &str) -> Vec<CriterionScore> {
    text.lines()
        .filter_map(extract_criterion)
        .take(MAX_CRITERIA)
        .collect()
}

fn extract_criterion(line: &str) -> Option<CriterionScore> {
    let caps = CRITERION_RE.captures(line.trim())?;
    let index = caps.get(1)?.as_str().parse::<u8>().ok()?;
    let name = caps.get(2)?.as_str().trim().to_string();
    if name.is_empty() {
        return None;
    }
    let raw_score = caps.get(3)?.as_str().parse::<f32>().ok()?;
    let score = raw_score.round().clamp(1.0, 10.0) as u8;
    let rest = caps.get(4).map(|m| m.as_str()).unwrap_or_default();

    let labels: Vec<_> = SECTION_RE.captures_iter(rest).collect();
    let analysis_end = labels
        .first()
        .and_then(|c| c.get(0))
        .map(|m| m.start())
        .unwrap_or(rest.len());
    let analysis = clean_fragment(&rest[..analysis_end]).unwrap_or_default();

    let mut strength = None;
    let mut weakness = None;
    let mut improvement = None;
    for (i, caps) in labels.iter().enumerate() {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = labels
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(rest.len());
        let value = clean_fragment(&rest[whole.end()..end]);
        match label.as_str().to_ascii_lowercase().as_str() {
            "strength" => strength = value,
            "weakness" => weakness = value,
            _ => improvement = value,
        }
    }

    Some(CriterionScore {
        index,
        name,
        score,
        analysis,
        strength,
        weakness,
        improvement,
    })
}

fn clean_fragment(s: &str) -> Option<String> {
    let trimmed = s
        .trim()
        .trim_start_matches(['—', '–', '-', ':', '*'])
        .trim_end_matches(['*'])
        .trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Mean criterion score on a 0..=100 scale; `None` when nothing was scored.
pub fn overall_score(criteria: &[CriterionScore]) -> Option<u8> {
    if criteria.is_empty() {
        return None;
    }
    let sum: u32 = criteria.iter().map(|c| u32::from(c.score)).sum();
    let mean = sum as f32 / criteria.len() as f32;
    Some((mean * 10.0).round() as u8)
}
