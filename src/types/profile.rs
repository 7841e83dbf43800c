//! Profile Record
//!
//! Structured representation of one synthesized profile between parsing and
//! persistence. Handles the messy edge of LLM output:
//! - Markdown code fence wrapping (```json ... ```)
//! - JSON embedded in explanatory text
//! - Mixed-case field names with spaces ("Languages Known")
//! - A single record wrapped in a one-element array
//!
//! Field keys are normalized (lowercase, spaces to underscores) and checked
//! against a column-identifier grammar before they may ever be interpolated
//! into an INSERT statement. Values are always bound as parameters, so only
//! the names need this gate.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::error::{ParseError, ParseErrorKind};

/// Field names every persisted profile must carry, in schema order.
pub const REQUIRED_FIELDS: [&str; 11] = [
    "name",
    "age",
    "gender",
    "biography",
    "location",
    "language",
    "languages_known",
    "occupation",
    "education",
    "date_of_birth",
    "personality",
];

// =============================================================================
// Key Normalization
// =============================================================================

/// Normalize a field key: trim, lowercase, spaces to underscores.
///
/// Idempotent: normalizing an already-normalized key is a no-op.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

/// Check that a normalized key is a legal column identifier.
///
/// Column names are the only part of the insert that is interpolated, so
/// they must come from this closed grammar: `[a-z_][a-z0-9_]*`.
pub fn is_column_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

// =============================================================================
// ProfileRecord
// =============================================================================

/// One normalized profile, ready for a single-row insert.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    fields: BTreeMap<String, Value>,
}

impl ProfileRecord {
    /// Parse raw generator output into a normalized record.
    ///
    /// Accepts one JSON object, or an array containing exactly one object
    /// (flattened). Any other shape is rejected.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let value = extract_json(raw).ok_or_else(|| ParseError::not_json(raw))?;

        let object = match value {
            Value::Object(map) => map,
            Value::Array(items) => match <[Value; 1]>::try_from(items) {
                Ok([Value::Object(map)]) => map,
                Ok([other]) => {
                    return Err(ParseError::new(
                        ParseErrorKind::NotOneRecord,
                        format!("array element is {}, expected an object", type_name(&other)),
                    ));
                }
                Err(items) => {
                    return Err(ParseError::new(
                        ParseErrorKind::NotOneRecord,
                        format!("expected exactly one record, got {}", items.len()),
                    ));
                }
            },
            other => {
                return Err(ParseError::new(
                    ParseErrorKind::NotOneRecord,
                    format!("expected a JSON object, got {}", type_name(&other)),
                ));
            }
        };

        let mut fields = BTreeMap::new();
        for (key, value) in object {
            let normalized = normalize_key(&key);
            if !is_column_ident(&normalized) {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidFieldName,
                    format!("field {key:?} normalizes to illegal column name {normalized:?}"),
                ));
            }
            fields.insert(normalized, value);
        }

        if fields.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::EmptyRecord,
                "record contains no fields",
            ));
        }

        Ok(Self { fields })
    }

    /// Check every required field is present.
    ///
    /// Unknown extra fields are allowed here; the store decides their fate.
    pub fn validate_required(&self) -> Result<(), ParseError> {
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| !self.fields.contains_key(*f))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ParseError::new(
                ParseErrorKind::MissingFields,
                missing.join(", "),
            ))
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Normalized field names in deterministic (sorted) order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record directly from normalized fields (test and seed paths).
    pub fn from_fields(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

// =============================================================================
// JSON Extraction
// =============================================================================

/// Extract a JSON value from raw LLM output.
///
/// Tries, in order: direct parse of the fence-stripped text, then the
/// outermost `{...}` span, then the outermost `[...]` span. Returns None
/// if nothing parses.
fn extract_json(raw: &str) -> Option<Value> {
    let cleaned = strip_code_fences(raw.trim().trim_start_matches('\u{feff}'));
    let cleaned = cleaned.trim();

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }

    extract_delimited(cleaned, '{', '}').or_else(|| extract_delimited(cleaned, '[', ']'))
}

/// Parse the outermost `open ... close` span embedded in mixed content.
fn extract_delimited(s: &str, open: char, close: char) -> Option<Value> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&s[start..=end]).ok()
}

/// Strip a markdown code fence (```json ... ``` or ``` ... ```).
fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let Some(first_newline) = trimmed.find('\n') else {
        return trimmed;
    };
    let body = &trimmed[first_newline + 1..];
    body.rfind("```").map_or(body, |end| &body[..end]).trim()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn full_profile_json() -> String {
        json!({
            "name": "Yuki Tanaka",
            "age": 34,
            "gender": "female",
            "biography": "Marine acoustician who maps whale song.",
            "location": "Hobart, Australia",
            "language": "Japanese",
            "languages_known": ["Japanese", "English", "Ainu"],
            "occupation": "Marine acoustician",
            "education": "PhD in Bioacoustics",
            "date_of_birth": "1991-04-12",
            "personality": "Patient, wry, methodical"
        })
        .to_string()
    }

    #[test]
    fn test_normalize_key_basic() {
        assert_eq!(normalize_key("Languages Known"), "languages_known");
        assert_eq!(normalize_key("  Date Of Birth "), "date_of_birth");
        assert_eq!(normalize_key("name"), "name");
    }

    #[test]
    fn test_column_ident_grammar() {
        assert!(is_column_ident("languages_known"));
        assert!(is_column_ident("_private"));
        assert!(!is_column_ident("1age"));
        assert!(!is_column_ident("age;drop"));
        assert!(!is_column_ident(""));
        assert!(!is_column_ident("Name"));
    }

    #[test]
    fn test_parse_plain_object() {
        let record = ProfileRecord::parse(&full_profile_json()).unwrap();
        assert_eq!(record.len(), 11);
        assert!(record.validate_required().is_ok());
    }

    #[test]
    fn test_parse_strips_code_fence() {
        let fenced = format!("```json\n{}\n```", full_profile_json());
        let record = ProfileRecord::parse(&fenced).unwrap();
        assert_eq!(record.get("name"), Some(&json!("Yuki Tanaka")));
    }

    #[test]
    fn test_parse_extracts_from_prose() {
        let mixed = format!("Here is the profile you asked for:\n{}\nEnjoy!", full_profile_json());
        assert!(ProfileRecord::parse(&mixed).is_ok());
    }

    #[test]
    fn test_parse_flattens_single_element_array() {
        let wrapped = format!("[{}]", full_profile_json());
        let record = ProfileRecord::parse(&wrapped).unwrap();
        assert_eq!(record.len(), 11);
    }

    #[test]
    fn test_parse_rejects_multi_element_array() {
        let two = format!("[{0},{0}]", full_profile_json());
        let err = ProfileRecord::parse(&two).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NotOneRecord);
    }

    #[test]
    fn test_parse_rejects_refusal_text() {
        let err = ProfileRecord::parse("Sorry, I cannot comply.").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NotJson);
    }

    #[test]
    fn test_parse_rejects_scalar() {
        let err = ProfileRecord::parse("42").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NotOneRecord);
    }

    #[test]
    fn test_parse_normalizes_mixed_case_keys() {
        let raw = r#"{"Languages Known": ["Basque"], "Name": "Ane"}"#;
        let record = ProfileRecord::parse(raw).unwrap();
        assert!(record.get("languages_known").is_some());
        assert!(record.get("name").is_some());
        assert!(record.get("Languages Known").is_none());
    }

    #[test]
    fn test_parse_rejects_illegal_column_name() {
        let raw = r#"{"age;drop table profiles": 3}"#;
        let err = ProfileRecord::parse(raw).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidFieldName);
    }

    #[test]
    fn test_parse_rejects_empty_object() {
        let err = ProfileRecord::parse("{}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::EmptyRecord);
    }

    #[test]
    fn test_validate_required_lists_missing() {
        let raw = r#"{"name": "Ane", "age": 29}"#;
        let record = ProfileRecord::parse(raw).unwrap();
        let err = record.validate_required().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingFields);
        assert!(err.message.contains("biography"));
        assert!(!err.message.contains("name,"));
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let mut raw: Value = serde_json::from_str(&full_profile_json()).unwrap();
        raw["favorite_color"] = json!("teal");
        let record = ProfileRecord::parse(&raw.to_string()).unwrap();
        assert_eq!(record.len(), 12);
        assert!(record.validate_required().is_ok());
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(key in "\\PC{0,40}") {
            let once = normalize_key(&key);
            prop_assert_eq!(normalize_key(&once), once);
        }
    }
}
