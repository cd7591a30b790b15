//! Suggestion validation
//!
//! Parses and type-checks a model's raw JSON output against the suggestion
//! schema. Coercible problems (non-integer or non-positive page refs, out of
//! range confidence, unrecognized type/difficulty) are fixed per entry; shape
//! problems that cannot be coerced (missing or empty front/back, missing
//! page refs) fail the entry, and any failed entry fails the whole batch.
//! A batch with zero suggestions is itself a validation failure.

use cardforge_common::errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Card difficulty as labeled by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Unrecognized labels default to medium
    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(|v| v.as_str()) {
            Some("easy") => Difficulty::Easy,
            Some("hard") => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

/// Suggestion kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Qa,
    Cloze,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Qa => "qa",
            SuggestionKind::Cloze => "cloze",
        }
    }

    /// Unrecognized labels default to qa
    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(|v| v.as_str()) {
            Some("cloze") => SuggestionKind::Cloze,
            _ => SuggestionKind::Qa,
        }
    }
}

/// A validated candidate flashcard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub front: String,
    pub back: String,
    pub page_refs: Vec<u32>,
    pub confidence: Option<f64>,
    pub difficulty: Difficulty,
}

impl Suggestion {
    /// The tag a materialized card carries for this suggestion
    pub fn difficulty_tag(&self) -> String {
        format!("difficulty:{}", self.difficulty.as_str())
    }

    /// Parse one suggestion entry, applying the schema's defaults and
    /// coercions. Shape problems that cannot be coerced are errors.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "suggestion must be an object".to_string())?;

        let front = required_text(obj.get("front"), "front")?;
        let back = required_text(obj.get("back"), "back")?;

        let refs = obj
            .get("pageRefs")
            .and_then(|v| v.as_array())
            .ok_or_else(|| "pageRefs must be an array".to_string())?;
        if refs.is_empty() {
            return Err("pageRefs must be non-empty".to_string());
        }
        let page_refs = refs
            .iter()
            .map(coerce_page_ref)
            .collect::<Result<Vec<u32>, String>>()?;

        let confidence = match obj.get("confidence") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_f64()
                    .ok_or_else(|| "confidence must be a number".to_string())?
                    .clamp(0.0, 1.0),
            ),
        };

        Ok(Suggestion {
            kind: SuggestionKind::parse(obj.get("type")),
            front,
            back,
            page_refs,
            confidence,
            difficulty: Difficulty::parse(obj.get("difficulty")),
        })
    }
}

fn required_text(value: Option<&Value>, field: &str) -> Result<String, String> {
    let text = value
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("{} must be a string", field))?
        .trim();
    if text.is_empty() {
        return Err(format!("{} must be non-empty", field));
    }
    Ok(text.to_string())
}

/// Floor and clamp to 1: page references are never zero or negative
fn coerce_page_ref(value: &Value) -> Result<u32, String> {
    let n = value
        .as_f64()
        .ok_or_else(|| "pageRefs entries must be numbers".to_string())?;
    Ok(n.floor().max(1.0) as u32)
}

/// Validate a whole suggestions payload.
///
/// The payload must be `{"suggestions": [...]}` with a non-empty array, and
/// every entry must pass [`Suggestion::from_value`].
pub fn validate_payload(value: &Value) -> Result<Vec<Suggestion>, AppError> {
    let entries = value
        .get("suggestions")
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Validation {
            message: "payload must contain a suggestions array".to_string(),
            field: Some("suggestions".to_string()),
        })?;

    if entries.is_empty() {
        return Err(AppError::Validation {
            message: "suggestions array must be non-empty".to_string(),
            field: Some("suggestions".to_string()),
        });
    }

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            Suggestion::from_value(entry).map_err(|e| AppError::Validation {
                message: format!("suggestion {}: {}", index, e),
                field: Some("suggestions".to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_payload_survives_with_defaults() {
        let payload = json!({
            "suggestions": [
                {
                    "front": "What is ATP?",
                    "back": "The cell's energy currency",
                    "pageRefs": [3]
                },
                {
                    "type": "cloze",
                    "front": "Water boils at {{c1::100}} degrees",
                    "back": "100",
                    "pageRefs": [1, 2],
                    "confidence": 0.9,
                    "difficulty": "hard"
                }
            ]
        });

        let suggestions = validate_payload(&payload).unwrap();
        assert_eq!(suggestions.len(), 2);

        // Defaulted fields
        assert_eq!(suggestions[0].kind, SuggestionKind::Qa);
        assert_eq!(suggestions[0].difficulty, Difficulty::Medium);
        assert_eq!(suggestions[0].confidence, None);

        // Explicit fields preserved
        assert_eq!(suggestions[1].kind, SuggestionKind::Cloze);
        assert_eq!(suggestions[1].difficulty, Difficulty::Hard);
        assert_eq!(suggestions[1].page_refs, vec![1, 2]);
        assert_eq!(suggestions[1].confidence, Some(0.9));
    }

    #[test]
    fn test_non_positive_page_refs_coerced_to_one() {
        let payload = json!({
            "suggestions": [{
                "front": "f",
                "back": "b",
                "pageRefs": [0, -3, 2.7]
            }]
        });

        let suggestions = validate_payload(&payload).unwrap();
        assert_eq!(suggestions[0].page_refs, vec![1, 1, 2]);
    }

    #[test]
    fn test_confidence_clamped() {
        let payload = json!({
            "suggestions": [{
                "front": "f",
                "back": "b",
                "pageRefs": [1],
                "confidence": 1.7
            }]
        });

        let suggestions = validate_payload(&payload).unwrap();
        assert_eq!(suggestions[0].confidence, Some(1.0));
    }

    #[test]
    fn test_unrecognized_type_and_difficulty_default() {
        let payload = json!({
            "suggestions": [{
                "type": "truefalse",
                "front": "f",
                "back": "b",
                "pageRefs": [1],
                "difficulty": "brutal"
            }]
        });

        let suggestions = validate_payload(&payload).unwrap();
        assert_eq!(suggestions[0].kind, SuggestionKind::Qa);
        assert_eq!(suggestions[0].difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_empty_suggestions_is_a_failure() {
        let payload = json!({ "suggestions": [] });
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn test_missing_suggestions_key_is_a_failure() {
        assert!(validate_payload(&json!({})).is_err());
        assert!(validate_payload(&json!(null)).is_err());
        assert!(validate_payload(&json!({"suggestions": "nope"})).is_err());
    }

    #[test]
    fn test_missing_front_fails_the_batch() {
        let payload = json!({
            "suggestions": [
                { "front": "ok", "back": "ok", "pageRefs": [1] },
                { "back": "no front", "pageRefs": [1] }
            ]
        });
        let err = validate_payload(&payload).unwrap_err();
        assert!(err.to_string().contains("suggestion 1"));
    }

    #[test]
    fn test_blank_front_fails() {
        let payload = json!({
            "suggestions": [{ "front": "   ", "back": "b", "pageRefs": [1] }]
        });
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn test_empty_page_refs_fails() {
        let payload = json!({
            "suggestions": [{ "front": "f", "back": "b", "pageRefs": [] }]
        });
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn test_non_numeric_page_ref_fails() {
        let payload = json!({
            "suggestions": [{ "front": "f", "back": "b", "pageRefs": ["three"] }]
        });
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn test_fields_are_trimmed() {
        let payload = json!({
            "suggestions": [{ "front": "  q  ", "back": "  a  ", "pageRefs": [1] }]
        });
        let suggestions = validate_payload(&payload).unwrap();
        assert_eq!(suggestions[0].front, "q");
        assert_eq!(suggestions[0].back, "a");
    }

    #[test]
    fn test_difficulty_tag() {
        let payload = json!({
            "suggestions": [{ "front": "f", "back": "b", "pageRefs": [1], "difficulty": "easy" }]
        });
        let suggestions = validate_payload(&payload).unwrap();
        assert_eq!(suggestions[0].difficulty_tag(), "difficulty:easy");
    }
}
