//! Recommendation prompt: template validation and substitution.

use std::path::Path;
use std::sync::LazyLock;

use coursepilot_shared::{CoursePilotError, Profile, PromptConfig, Result};
use regex::{Captures, Regex};

/// Placeholder replaced by the rendered profile.
pub const PROFILE_PLACEHOLDER: &str = "formatted_background_and_interests";

/// Placeholder replaced by the candidate course list.
pub const COURSE_LIST_PLACEHOLDER: &str = "formatted_course_list";

const BUNDLED_TEMPLATE: &str = include_str!("../templates/course_recommendation.v1.txt");

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(formatted_background_and_interests|formatted_course_list)\}")
        .expect("valid regex")
});

/// A recommendation prompt template with both placeholders present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Validate `text` as a template.
    ///
    /// Both `{formatted_background_and_interests}` and `{formatted_course_list}`
    /// must appear; a template missing either can never produce a usable
    /// prompt, so this is a configuration error rather than a warning.
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let missing: Vec<&str> = [PROFILE_PLACEHOLDER, COURSE_LIST_PLACEHOLDER]
            .into_iter()
            .filter(|name| !text.contains(&format!("{{{name}}}")))
            .collect();
        if !missing.is_empty() {
            return Err(CoursePilotError::template(format!(
                "template is missing placeholder(s): {}",
                missing
                    .iter()
                    .map(|name| format!("{{{name}}}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        Ok(Self { text })
    }

    /// Read and validate a template file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CoursePilotError::io(path, e))?;
        Self::parse(text).map_err(|e| match e {
            CoursePilotError::Template { message } => {
                CoursePilotError::template(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// The configured override if any, otherwise the bundled template.
    pub fn from_config(config: &PromptConfig) -> Result<Self> {
        match &config.template_path {
            Some(path) => Self::load(Path::new(path)),
            None => Ok(Self::default()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Fill the template. Pure: identical inputs give byte-identical output.
    ///
    /// Substitution is a single scan of the template, so braces inside the
    /// profile or course text are copied through literally.
    pub fn compose(&self, profile: &Profile, candidates: &[String]) -> String {
        let profile_text = format_profile(profile);
        let course_list = format_course_list(candidates);
        PLACEHOLDER_RE
            .replace_all(&self.text, |caps: &Captures<'_>| {
                if &caps[1] == PROFILE_PLACEHOLDER {
                    profile_text.clone()
                } else {
                    course_list.clone()
                }
            })
            .into_owned()
    }
}

impl Default for PromptTemplate {
    /// The bundled `course_recommendation.v1` template.
    fn default() -> Self {
        Self {
            text: BUNDLED_TEMPLATE.to_string(),
        }
    }
}

/// `key: value` per line in key order, underscores in keys shown as spaces.
pub fn format_profile(profile: &Profile) -> String {
    profile
        .iter()
        .map(|(key, value)| format!("{}: {value}", key.replace('_', " ")))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Display texts separated by a blank line.
pub fn format_course_list(candidates: &[String]) -> String {
    candidates.join("\n\n").trim().to_string()
}
