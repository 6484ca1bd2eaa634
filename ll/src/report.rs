//! Text and JSON rendering for the command-line reports

use std::fmt::Write;

use colored::Colorize;
use serde::Serialize;

use crate::api::{Interaction, Recommendation, UserProfile};
use crate::progress::{MasteryLabel, SkillProgress, format_probability};

/// Placeholder shown when there is nothing to summarize
pub const NO_DATA: &str = "No data available.";

/// Progress row as exported in JSON
#[derive(Debug, Serialize)]
struct ProgressRow<'a> {
    skill_id: &'a str,
    attempts: u32,
    correct: u32,
    success_rate: f64,
    probability: Option<f64>,
    status: MasteryLabel,
}

impl<'a> From<&'a SkillProgress> for ProgressRow<'a> {
    fn from(row: &'a SkillProgress) -> Self {
        Self {
            skill_id: &row.skill_id,
            attempts: row.attempts,
            correct: row.correct,
            success_rate: row.success_rate(),
            probability: row.latest_probability,
            status: row.label(),
        }
    }
}

fn colored_label(label: MasteryLabel) -> String {
    match label {
        MasteryLabel::Mastered => label.as_str().green().to_string(),
        MasteryLabel::InProgress => label.as_str().yellow().to_string(),
        MasteryLabel::NeedsReinforcement => label.as_str().red().to_string(),
        MasteryLabel::Unknown => label.as_str().dimmed().to_string(),
    }
}

pub fn profile_text(user: &UserProfile) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{} ({})", user.name.bold(), user.user_id);
    let _ = writeln!(output, "Level:   {}", user.level.as_deref().unwrap_or("-"));
    let _ = writeln!(output, "Created: {}", user.created_at);
    output
}

/// Probability transition shown next to an interaction
pub fn probability_change(interaction: &Interaction) -> String {
    format!(
        "p(t) {} -> {}",
        format_probability(interaction.probability_before),
        format_probability(interaction.probability_after)
    )
}

/// Most recent interactions, newest first
pub fn history_text(history: &[Interaction], limit: usize) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Recent Interactions");

    if history.is_empty() {
        let _ = writeln!(output, "{}", NO_DATA);
        return output;
    }

    let skip = history.len().saturating_sub(limit);
    for interaction in history.iter().skip(skip).rev() {
        let when = interaction
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let verdict = if interaction.correct {
            "correct".green()
        } else {
            "incorrect".red()
        };
        let _ = writeln!(
            output,
            "- {} {} ({}) {} {}",
            when,
            interaction.exercise_id,
            interaction.skill_id,
            verdict,
            probability_change(interaction)
        );
    }

    output
}

pub fn history_json(history: &[Interaction], limit: usize) -> serde_json::Result<String> {
    let skip = history.len().saturating_sub(limit);
    let recent: Vec<&Interaction> = history.iter().skip(skip).rev().collect();
    serde_json::to_string_pretty(&recent)
}

/// Per-skill progress table
pub fn progress_text(rows: &[SkillProgress]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Progress by Skill");

    if rows.is_empty() {
        let _ = writeln!(output, "{}", NO_DATA);
        return output;
    }

    let width = rows.iter().map(|r| r.skill_id.len()).max().unwrap_or(0).max(5);
    let _ = writeln!(
        output,
        "{:<width$}  {:>8}  {:>7}  {:>11}  Status",
        "Skill",
        "Attempts",
        "Success",
        "Probability",
        width = width
    );
    for row in rows {
        let _ = writeln!(
            output,
            "{:<width$}  {:>8}  {:>6.1}%  {:>11}  {}",
            row.skill_id,
            row.attempts,
            row.success_rate(),
            format_probability(row.latest_probability),
            colored_label(row.label()),
            width = width
        );
    }

    output
}

pub fn progress_json(rows: &[SkillProgress]) -> serde_json::Result<String> {
    let rows: Vec<ProgressRow<'_>> = rows.iter().map(ProgressRow::from).collect();
    serde_json::to_string_pretty(&rows)
}

pub fn recommendation_text(reco: &Recommendation) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Next Recommendation");

    if reco.is_terminal_mastery() {
        let message = if reco.prompt.is_empty() {
            crate::flow::mastery_text(&reco.skill_id)
        } else {
            reco.prompt.clone()
        };
        let _ = writeln!(output, "{}", message.green());
        return output;
    }

    let _ = writeln!(output, "Exercise:    {}", reco.exercise_id);
    let _ = writeln!(output, "Skill:       {}", reco.skill_id);
    let _ = writeln!(output, "Difficulty:  {}", reco.difficulty);
    let _ = writeln!(output, "Probability: {}", format_probability(Some(reco.probability)));
    if reco.mastery {
        let _ = writeln!(output, "{}", crate::flow::mastery_text(&reco.skill_id).green());
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", reco.prompt);
    if let Some(options) = reco.options.as_deref().filter(|o| !o.is_empty()) {
        for (i, option) in options.iter().enumerate() {
            let _ = writeln!(output, "  {}. {}", i + 1, option);
        }
    }

    output
}
