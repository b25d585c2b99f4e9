//! Generative model client.
//!
//! The recommendation chain talks to the model through [`GenerationClient`]
//! so tests can substitute a fake. [`GeminiClient`] is the production
//! implementation; build it once at startup and pass it down.

mod gemini;

use std::future::Future;

use coursepilot_shared::Result;
use serde::Serialize;

pub use gemini::GeminiClient;

/// Sends a fully composed prompt to a generative model.
pub trait GenerationClient: Send + Sync {
    /// The model's text answer, whitespace-trimmed. Fails with
    /// [`GenerationUnavailable`](coursepilot_shared::CoursePilotError::GenerationUnavailable)
    /// when the model is unreachable or returns no text.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Content categories the model may filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHarassment,
    HarmCategoryHateSpeech,
    HarmCategorySexuallyExplicit,
    HarmCategoryDangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        Self::HarmCategoryHarassment,
        Self::HarmCategoryHateSpeech,
        Self::HarmCategorySexuallyExplicit,
        Self::HarmCategoryDangerousContent,
    ];
}

/// How aggressively a category is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// One `safetySettings` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Per-category thresholds sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyPolicy {
    settings: Vec<SafetySetting>,
}

impl SafetyPolicy {
    /// Every category at the same threshold.
    pub fn uniform(threshold: HarmBlockThreshold) -> Self {
        Self {
            settings: HarmCategory::ALL
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold,
                })
                .collect(),
        }
    }

    pub fn settings(&self) -> &[SafetySetting] {
        &self.settings
    }
}

impl Default for SafetyPolicy {
    /// All categories at `BLOCK_NONE`.
    fn default() -> Self {
        Self::uniform(HarmBlockThreshold::BlockNone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_disables_all_four_filters() {
        let policy = SafetyPolicy::default();
        assert_eq!(policy.settings().len(), 4);
        assert!(
            policy
                .settings()
                .iter()
                .all(|s| s.threshold == HarmBlockThreshold::BlockNone)
        );
    }

    #[test]
    fn settings_serialize_with_api_names() {
        let json = serde_json::to_value(SafetyPolicy::default().settings()).expect("serialize");
        assert_eq!(
            json[0],
            serde_json::json!({"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE"})
        );
        assert_eq!(json[3]["category"], "HARM_CATEGORY_DANGEROUS_CONTENT");
    }
}
