//! Core domain types for CoursePilot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoursePilotError, Result};

/// Literal used for prerequisites when a course lists none.
pub const NO_PREREQUISITES: &str = "None";

/// Metadata key holding the human-readable rendering of a course.
pub const DISPLAY_TEXT_KEY: &str = "display_text";

// ---------------------------------------------------------------------------
// CourseRecord
// ---------------------------------------------------------------------------

/// One raw course row as read from the tabular source.
///
/// Every field is optional free text; absent columns are simply `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub subject: Option<String>,
    pub title: Option<String>,
    pub catalog_number: Option<String>,
    pub course_type: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub grading: Option<String>,
    pub prerequisites: Option<String>,
}

// ---------------------------------------------------------------------------
// SearchableFields
// ---------------------------------------------------------------------------

/// Lowercased, cleaned per-field text of a course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchableFields {
    pub subject: String,
    pub title: String,
    pub catalog_number: String,
    pub course_type: String,
    pub description: String,
    pub keywords: String,
    pub grading: String,
    pub prerequisites: String,
}

impl SearchableFields {
    /// Fields keyed by name, in sorted key order.
    ///
    /// This is the canonical form hashed into a document id.
    pub fn to_sorted_map(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([
            ("catalog_number", self.catalog_number.as_str()),
            ("course_type", self.course_type.as_str()),
            ("description", self.description.as_str()),
            ("grading", self.grading.as_str()),
            ("keywords", self.keywords.as_str()),
            ("prerequisites", self.prerequisites.as_str()),
            ("subject", self.subject.as_str()),
            ("title", self.title.as_str()),
        ])
    }
}

// ---------------------------------------------------------------------------
// CourseDocument
// ---------------------------------------------------------------------------

/// The unit stored in the vector index, derived from one [`CourseRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDocument {
    /// Content address over [`SearchableFields`].
    pub document_id: String,
    /// Original-cased multi-line rendering shown to the model.
    pub display_text: String,
    /// Normalized per-field text.
    pub fields: SearchableFields,
    /// Labeled concatenation of `fields`; the embedding input.
    pub document_text: String,
}

impl CourseDocument {
    /// Metadata stored alongside the embedding: every searchable field plus
    /// the display text.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut meta: BTreeMap<String, String> = self
            .fields
            .to_sorted_map()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        meta.insert(DISPLAY_TEXT_KEY.to_string(), self.display_text.clone());
        meta
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A student's self-description: attribute name to free-text value.
///
/// Backed by a sorted map so rendering and derived search phrases do not
/// depend on the order attributes arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Profile(BTreeMap<String, String>);

impl Profile {
    /// Create an empty profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Attribute pairs in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Attribute values in sorted key order (duplicates included).
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a profile from a JSON object.
    ///
    /// Strings are taken as-is, numbers and booleans are stringified, `null`
    /// entries are dropped. Arrays, nested objects, and non-object roots are
    /// rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(CoursePilotError::validation(
                "profile must be a JSON object of attribute/value pairs",
            ));
        };

        let mut profile = Self::new();
        for (key, value) in map {
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => continue,
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(CoursePilotError::validation(format!(
                        "profile attribute '{key}' must be a scalar value"
                    )));
                }
            };
            profile.insert(key, text);
        }
        Ok(profile)
    }

    /// Parse a profile from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CoursePilotError::parse(format!("invalid profile JSON: {e}")))?;
        Self::from_json(value)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Profile {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for Profile {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_map_is_canonical() {
        let fields = SearchableFields {
            subject: "cs".into(),
            title: "intro".into(),
            ..Default::default()
        };
        let keys: Vec<_> = fields.to_sorted_map().into_keys().collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 8);
    }

    #[test]
    fn metadata_includes_display_text() {
        let doc = CourseDocument {
            document_id: "id".into(),
            display_text: "Subject: CS".into(),
            fields: SearchableFields::default(),
            document_text: String::new(),
        };
        let meta = doc.metadata();
        assert_eq!(meta.len(), 9);
        assert_eq!(meta[DISPLAY_TEXT_KEY], "Subject: CS");
    }

    #[test]
    fn profile_from_json_stringifies_scalars() {
        let profile = Profile::from_json_str(
            r#"{"Field_Of_Study": "Computer Science", "Years": 3, "Remote": true, "Gpa": null}"#,
        )
        .expect("parse profile");
        assert_eq!(profile.len(), 3);
        let pairs: Vec<_> = profile.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("Field_Of_Study", "Computer Science"),
                ("Remote", "true"),
                ("Years", "3"),
            ]
        );
    }

    #[test]
    fn profile_rejects_nested_values() {
        let err = Profile::from_json_str(r#"{"Hobbies": ["chess"]}"#).unwrap_err();
        assert!(err.to_string().contains("Hobbies"));

        let err = Profile::from_json_str(r#"["not", "an", "object"]"#).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn profile_deserializes_via_serde() {
        let profile: Profile =
            serde_json::from_str(r#"{"Primary_Hobby": "Chess"}"#).expect("deserialize");
        assert_eq!(profile.values().collect::<Vec<_>>(), vec!["Chess"]);
    }
}
