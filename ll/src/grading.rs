//! Client-side answer checking

use chrono::Utc;
use tracing::debug;

use crate::api::{Exercise, InteractionPayload};

/// Normalize an answer for comparison
fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Check a given answer against the exercise key
///
/// Comparison ignores surrounding whitespace and case. Exercises without a
/// key never grade as correct.
pub fn is_correct(exercise: &Exercise, given: &str) -> bool {
    let result = exercise
        .answer
        .as_deref()
        .is_some_and(|key| normalize(key) == normalize(given));
    debug!(exercise_id = %exercise.id, result, "is_correct: called");
    result
}

/// Build the interaction to submit for an answered exercise, stamped now
pub fn build_payload(user_id: &str, exercise: &Exercise, given: &str) -> InteractionPayload {
    InteractionPayload {
        user_id: user_id.to_string(),
        exercise_id: exercise.id.clone(),
        skill_id: exercise.skill_id.clone(),
        correct: is_correct(exercise, given),
        timestamp: Some(Utc::now()),
    }
}
