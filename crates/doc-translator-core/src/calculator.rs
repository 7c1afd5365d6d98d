//! Time and cost estimate for a translation job.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::docx::DocStats;
use crate::error::{Error, Result};

/// Seconds of machine translation per word.
const SECONDS_PER_WORD: f64 = 0.00156;
/// Seconds per paragraph when the group size has no measured figure.
const DEFAULT_SECONDS_PER_PARAGRAPH: f64 = 3.0;

const COST_PER_TOKEN: f64 = 0.000_001_5;
const COST_PER_CHARACTER: f64 = 0.000_021;
const COST_PER_MINUTE: f64 = 0.005_161;
const REVIEW_COST_PER_WORD: f64 = 0.025;

/// Who proofreads the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reviewer {
    #[serde(rename = "TOBY")]
    Toby,
    #[serde(rename = "TOBY+MIKE")]
    TobyAndMike,
    #[serde(rename = "MIKE")]
    Mike,
}

impl Reviewer {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Toby => "TOBY",
            Self::TobyAndMike => "TOBY+MIKE",
            Self::Mike => "MIKE",
        }
    }
}

impl FromStr for Reviewer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "TOBY" => Ok(Self::Toby),
            "TOBY+MIKE" => Ok(Self::TobyAndMike),
            "MIKE" => Ok(Self::Mike),
            _ => Err(Error::InvalidReviewer(s.to_string())),
        }
    }
}

impl std::fmt::Display for Reviewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Measured seconds per paragraph for group sizes 1 to 10.
const fn seconds_per_paragraph(group_size: usize) -> f64 {
    match group_size {
        1 => 1.5,
        2 => 1.8,
        3 => 2.5,
        4 => 3.0,
        5 => 3.2,
        6 => 3.3,
        7 => 3.5,
        8 | 10 => 4.0,
        9 => 3.8,
        _ => DEFAULT_SECONDS_PER_PARAGRAPH,
    }
}

/// Estimated wall-clock seconds for the whole job.
#[allow(clippy::cast_precision_loss)]
pub fn estimate_time(words: usize, paragraphs: usize, group_size: usize) -> f64 {
    let machine = words as f64 * SECONDS_PER_WORD;
    let post_edit = paragraphs as f64 * seconds_per_paragraph(group_size);
    machine + post_edit
}

/// Model tokens, DeepL characters and server time, rounded to 6 decimals.
#[allow(clippy::cast_precision_loss)]
pub fn translation_cost(words: usize, characters: usize, minutes: f64) -> f64 {
    let tokens = (words * 2) as f64;
    round6(tokens * COST_PER_TOKEN + characters as f64 * COST_PER_CHARACTER + minutes * COST_PER_MINUTE)
}

#[allow(clippy::cast_precision_loss)]
pub fn review_cost(words: usize, reviewer: Reviewer) -> f64 {
    match reviewer {
        Reviewer::Toby | Reviewer::TobyAndMike => round6(words as f64 * REVIEW_COST_PER_WORD),
        Reviewer::Mike => 0.0,
    }
}

/// `H:MM:SS`, fractional seconds dropped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Full estimate for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub words: usize,
    pub characters: usize,
    pub paragraphs: usize,
    pub pages: usize,
    pub group_size: usize,
    pub reviewer: Reviewer,
    pub translation_seconds: f64,
    pub translation_time: String,
    pub translation_cost: f64,
    pub review_cost: f64,
    pub total_cost: f64,
}

impl CostEstimate {
    pub fn compute(stats: &DocStats, group_size: usize, reviewer: Reviewer) -> Self {
        let seconds = estimate_time(stats.words, stats.paragraphs, group_size);
        let translation = translation_cost(stats.words, stats.characters, seconds / 60.0);
        let review = review_cost(stats.words, reviewer);

        Self {
            words: stats.words,
            characters: stats.characters,
            paragraphs: stats.paragraphs,
            pages: stats.pages,
            group_size,
            reviewer,
            translation_seconds: seconds,
            translation_time: format_duration(seconds),
            translation_cost: translation,
            review_cost: review,
            total_cost: round6(translation + review),
        }
    }
}
