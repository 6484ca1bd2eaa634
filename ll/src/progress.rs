//! Per-skill progress aggregation
//!
//! Reduces an interaction history into one [`SkillProgress`] row per skill.
//! Rows are derived, never stored: callers recompute them from the full
//! history whenever they render.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::api::Interaction;

/// Probability above which a skill counts as mastered
pub const MASTERED_THRESHOLD: f64 = 0.7;

/// Probability from which a skill counts as in progress
pub const IN_PROGRESS_THRESHOLD: f64 = 0.4;

/// Qualitative reading of a mastery probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLabel {
    Mastered,
    InProgress,
    NeedsReinforcement,
    Unknown,
}

impl MasteryLabel {
    /// Label for a probability: `>0.7` mastered, `[0.4, 0.7]` in progress, below that needs reinforcement
    pub fn from_probability(probability: Option<f64>) -> Self {
        match probability {
            None => Self::Unknown,
            Some(p) if p > MASTERED_THRESHOLD => Self::Mastered,
            Some(p) if p >= IN_PROGRESS_THRESHOLD => Self::InProgress,
            Some(_) => Self::NeedsReinforcement,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mastered => "mastered",
            Self::InProgress => "in progress",
            Self::NeedsReinforcement => "needs reinforcement",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MasteryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of one skill across the history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillProgress {
    pub skill_id: String,
    pub attempts: u32,
    pub correct: u32,
    /// Most recent probability-after reported by the engine
    pub latest_probability: Option<f64>,
    /// Milliseconds since the epoch of the interaction that set `latest_probability`
    #[serde(skip)]
    latest_timestamp: Option<i64>,
}

impl SkillProgress {
    fn new(skill_id: &str) -> Self {
        Self {
            skill_id: skill_id.to_string(),
            attempts: 0,
            correct: 0,
            latest_probability: None,
            latest_timestamp: None,
        }
    }

    /// Share of correct attempts, in percent
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.attempts) * 100.0
        }
    }

    pub fn label(&self) -> MasteryLabel {
        MasteryLabel::from_probability(self.latest_probability)
    }

    fn record(&mut self, interaction: &Interaction) {
        self.attempts += 1;
        if interaction.correct {
            self.correct += 1;
        }

        if let Some(probability) = interaction.probability_after {
            // Undated interactions count as the newest
            let ts = interaction
                .timestamp
                .map(|t| t.timestamp_millis())
                .unwrap_or(i64::MAX);
            if self.latest_timestamp.is_none_or(|latest| ts >= latest) {
                self.latest_probability = Some(probability);
                self.latest_timestamp = Some(ts);
            }
        }
    }
}

/// Aggregate a history into per-skill rows, highest latest probability first
///
/// Skills without a known probability sort as 0. The sort is stable, so ties
/// keep the order in which skills first appeared.
pub fn aggregate(history: &[Interaction]) -> Vec<SkillProgress> {
    debug!(interactions = history.len(), "aggregate: called");
    let mut rows: Vec<SkillProgress> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for interaction in history {
        let slot = *index.entry(interaction.skill_id.as_str()).or_insert_with(|| {
            rows.push(SkillProgress::new(&interaction.skill_id));
            rows.len() - 1
        });
        rows[slot].record(interaction);
    }

    rows.sort_by(|a, b| {
        b.latest_probability
            .unwrap_or(0.0)
            .total_cmp(&a.latest_probability.unwrap_or(0.0))
    });
    debug!(skills = rows.len(), "aggregate: done");
    rows
}

/// Render a probability as a percentage with one decimal, `-` when absent
pub fn format_probability(probability: Option<f64>) -> String {
    match probability {
        Some(p) => format!("{:.1}%", p * 100.0),
        None => "-".to_string(),
    }
}
