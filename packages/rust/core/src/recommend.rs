//! The per-request chain: retrieve candidates, compose the prompt, generate.

use coursepilot_generation::GenerationClient;
use coursepilot_shared::{Profile, Result};
use coursepilot_store::{CollectionHandle, VectorStore};
use tracing::{info, instrument};

use crate::prompt::PromptTemplate;
use crate::query::{display_texts, search_courses, search_phrase};

/// Everything up to (not including) the model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPrompt {
    pub search_phrase: String,
    /// Candidate display texts, nearest first.
    pub candidates: Vec<String>,
    pub prompt: String,
}

/// A completed recommendation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub search_phrase: String,
    pub candidates: Vec<String>,
    pub prompt: String,
    /// Model answer, trimmed.
    pub response: String,
}

/// Retrieve candidates for `profile` and fill `template`.
#[instrument(skip_all, fields(collection = %handle.name, top_k = top_k, attributes = profile.len()))]
pub async fn prepare<S: VectorStore>(
    store: &S,
    handle: &CollectionHandle,
    template: &PromptTemplate,
    profile: &Profile,
    top_k: usize,
) -> Result<PreparedPrompt> {
    let phrase = search_phrase(profile);
    let matches = search_courses(store, handle, &phrase, top_k).await?;
    let candidates = display_texts(&matches);
    let prompt = template.compose(profile, &candidates);
    info!(
        candidates = candidates.len(),
        prompt_chars = prompt.len(),
        "prompt composed"
    );
    Ok(PreparedPrompt {
        search_phrase: phrase,
        candidates,
        prompt,
    })
}

/// Run the full chain. Any failure fails the whole request; nothing partial
/// is returned.
pub async fn recommend<S: VectorStore, G: GenerationClient>(
    store: &S,
    handle: &CollectionHandle,
    generator: &G,
    template: &PromptTemplate,
    profile: &Profile,
    top_k: usize,
) -> Result<Recommendation> {
    let prepared = prepare(store, handle, template, profile, top_k).await?;
    let response = generator.generate(&prepared.prompt).await?;
    Ok(Recommendation {
        search_phrase: prepared.search_phrase,
        candidates: prepared.candidates,
        prompt: prepared.prompt,
        response,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use coursepilot_shared::{CoursePilotError, DISPLAY_TEXT_KEY};
    use coursepilot_store::{HashingEmbedder, MemoryStore, Metadata};

    /// Echoes a fixed answer and remembers the prompts it was given.
    struct FakeGenerator {
        answer: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        fn answering(answer: &'static str) -> Self {
            Self {
                answer: Some(answer),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn unavailable() -> Self {
            Self {
                answer: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl GenerationClient for FakeGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            self.answer
                .map(|a| a.trim().to_string())
                .ok_or_else(|| CoursePilotError::GenerationUnavailable("model offline".into()))
        }
    }

    async fn catalog() -> (MemoryStore<HashingEmbedder>, CollectionHandle) {
        let store = MemoryStore::new(HashingEmbedder::new(1024));
        let handle = store.open_collection("courses").await.expect("open");
        for (id, text) in [
            ("sec", "network security cryptography"),
            ("ml", "machine learning"),
            ("art", "renaissance painting"),
        ] {
            let meta = Metadata::from([(DISPLAY_TEXT_KEY.to_string(), format!("Title: {text}"))]);
            store.upsert(&handle, id, text, &meta).await.expect("insert");
        }
        (store, handle)
    }

    fn template() -> PromptTemplate {
        PromptTemplate::parse(
            "Me:\n{formatted_background_and_interests}\nCourses:\n{formatted_course_list}",
        )
        .expect("parse")
    }

    fn profile() -> Profile {
        Profile::from_iter([("Desired_Career", "Security"), ("Hobby", "Cryptography")])
    }

    #[tokio::test]
    async fn chain_sends_composed_prompt_to_model() {
        let (store, handle) = catalog().await;
        let generator = FakeGenerator::answering("  1. Network Security  \n");

        let rec = recommend(&store, &handle, &generator, &template(), &profile(), 2)
            .await
            .expect("recommend");

        assert_eq!(rec.search_phrase, "cryptography security");
        assert_eq!(rec.candidates.len(), 2);
        assert_eq!(rec.candidates[0], "Title: network security cryptography");
        assert!(rec.prompt.starts_with("Me:\nDesired Career: Security\nHobby: Cryptography\n"));
        assert!(rec.prompt.contains("Courses:\nTitle: network security cryptography\n\n"));
        assert_eq!(rec.response, "1. Network Security");
        assert_eq!(*generator.prompts.lock().expect("lock"), vec![rec.prompt.clone()]);
    }

    #[tokio::test]
    async fn prepared_prompt_is_reproducible() {
        let (store, handle) = catalog().await;
        let a = prepare(&store, &handle, &template(), &profile(), 3)
            .await
            .expect("prepare");
        let b = prepare(&store, &handle, &template(), &profile(), 3)
            .await
            .expect("prepare");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn generation_failure_fails_the_request() {
        let (store, handle) = catalog().await;
        let generator = FakeGenerator::unavailable();
        let err = recommend(&store, &handle, &generator, &template(), &profile(), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, CoursePilotError::GenerationUnavailable(_)));
    }

    #[tokio::test]
    async fn empty_collection_still_reaches_the_model() {
        let store = MemoryStore::new(HashingEmbedder::new(64));
        let handle = store.open_collection("courses").await.expect("open");
        let generator = FakeGenerator::answering("No matching courses.");

        let rec = recommend(&store, &handle, &generator, &template(), &profile(), 5)
            .await
            .expect("recommend");
        assert!(rec.candidates.is_empty());
        assert!(rec.prompt.ends_with("Courses:\n"));
    }
}
