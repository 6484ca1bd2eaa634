//! Wire types exchanged with the recommendation service

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Exercise difficulty as labelled by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        write!(f, "{}", s)
    }
}

/// A single exercise, either from the calibration bundle or built from a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub skill_id: String,
    #[serde(default)]
    pub skill_external_id: Option<String>,
    pub prompt: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
}

impl Exercise {
    /// Multiple-choice options, if the exercise has a non-empty list
    pub fn choices(&self) -> Option<&[String]> {
        self.options.as_deref().filter(|opts| !opts.is_empty())
    }
}

/// One answered exercise as recorded by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub user_id: String,
    pub exercise_id: String,
    pub skill_id: String,
    pub correct: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub probability_before: Option<f64>,
    #[serde(default)]
    pub probability_after: Option<f64>,
}

/// Body of `POST /interactions/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionPayload {
    pub user_id: String,
    pub exercise_id: String,
    pub skill_id: String,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Next exercise chosen by the service, or a mastery signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub user_id: String,
    pub exercise_id: String,
    pub skill_id: String,
    #[serde(default)]
    pub skill_external_id: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub answer: Option<String>,
    pub probability: f64,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub mastery: bool,
}

impl Recommendation {
    /// True when the service signals mastery and offers no further exercise
    pub fn is_terminal_mastery(&self) -> bool {
        self.mastery && self.exercise_id.is_empty()
    }

    /// Build the exercise the learner should attempt next
    pub fn to_exercise(&self) -> Exercise {
        Exercise {
            id: self.exercise_id.clone(),
            skill_id: self.skill_id.clone(),
            skill_external_id: self.skill_external_id.clone(),
            prompt: self.prompt.clone(),
            difficulty: self.difficulty,
            options: self.options.clone(),
            answer: self.answer.clone(),
            solution: None,
        }
    }
}

/// Learner profile returned by `/auth/me` and `/auth/register`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
    pub created_at: String,
}

/// Response of `/auth/login`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub user_id: String,
    pub name: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl RegisterPayload {
    /// Credentials used for the login that follows a registration
    pub fn credentials(&self) -> LoginPayload {
        LoginPayload {
            user_id: self.user_id.clone(),
            password: self.password.clone(),
        }
    }
}

/// Parse a service timestamp; naive values are read as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_interaction_accepts_naive_timestamp() {
        let json = r#"{
            "id": "i1", "user_id": "alice", "exercise_id": "e1", "skill_id": "fractions",
            "correct": true, "timestamp": "2024-03-01T10:00:00.250",
            "probability_before": 0.4, "probability_after": 0.55
        }"#;
        let interaction: Interaction = serde_json::from_str(json).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + chrono::Duration::milliseconds(250);
        assert_eq!(interaction.timestamp, Some(expected));
        assert_eq!(interaction.probability_after, Some(0.55));
    }

    #[test]
    fn test_interaction_tolerates_missing_and_bad_fields() {
        let json = r#"{
            "id": "i1", "user_id": "alice", "exercise_id": "e1", "skill_id": "s",
            "correct": false, "timestamp": "yesterday", "probability_after": null
        }"#;
        let interaction: Interaction = serde_json::from_str(json).unwrap();
        assert_eq!(interaction.timestamp, None);
        assert_eq!(interaction.probability_before, None);
        assert_eq!(interaction.probability_after, None);
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let ts = parse_timestamp("2024-03-01T12:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_recommendation_mastery_defaults_to_false() {
        let json = r#"{
            "user_id": "alice", "exercise_id": "e9", "skill_id": "fractions",
            "prompt": "1/2 + 1/4 ?", "probability": 0.62, "difficulty": "medium"
        }"#;
        let reco: Recommendation = serde_json::from_str(json).unwrap();
        assert!(!reco.mastery);
        assert!(!reco.is_terminal_mastery());

        let exercise = reco.to_exercise();
        assert_eq!(exercise.id, "e9");
        assert_eq!(exercise.difficulty, Difficulty::Medium);
        assert_eq!(exercise.solution, None);
    }

    #[test]
    fn test_exercise_choices_ignores_empty_list() {
        let mut exercise = Exercise {
            id: "e1".to_string(),
            skill_id: "s".to_string(),
            skill_external_id: None,
            prompt: "?".to_string(),
            difficulty: Difficulty::Easy,
            options: Some(vec![]),
            answer: None,
            solution: None,
        };
        assert!(exercise.choices().is_none());

        exercise.options = Some(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(exercise.choices().map(|c| c.len()), Some(2));
    }

    #[test]
    fn test_register_payload_omits_missing_level() {
        let payload = RegisterPayload {
            user_id: "bob".to_string(),
            name: "Bob".to_string(),
            password: "pw".to_string(),
            level: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("level").is_none());
        assert_eq!(payload.credentials().user_id, "bob");
    }
}
