//! Profile → search phrase → candidate courses.

use std::collections::BTreeSet;

use coursepilot_shared::{DISPLAY_TEXT_KEY, Profile, Result};
use coursepilot_store::{CollectionHandle, QueryMatch, VectorStore};
use coursepilot_text::clean;
use tracing::{debug, instrument, warn};

/// Search phrase for a profile: its distinct values in sorted order, cleaned.
///
/// An empty profile yields an empty phrase.
pub fn search_phrase(profile: &Profile) -> String {
    let unique: BTreeSet<&str> = profile.values().collect();
    clean(&unique.into_iter().collect::<Vec<_>>().join(" "))
}

/// Nearest courses to free text, nearest first.
///
/// The text is cleaned first so queries share the canonical form of the
/// indexed documents. Cleaning is idempotent, so passing an existing search
/// phrase is fine.
#[instrument(skip_all, fields(collection = %handle.name, top_k = top_k))]
pub async fn search_courses<S: VectorStore>(
    store: &S,
    handle: &CollectionHandle,
    text: &str,
    top_k: usize,
) -> Result<Vec<QueryMatch>> {
    let phrase = clean(text);
    debug!(%phrase, "querying vector store");
    store.similarity_query(handle, &phrase, top_k).await
}

/// Display texts of the matches in ranked order. Matches stored without a
/// display text are skipped.
pub fn display_texts(matches: &[QueryMatch]) -> Vec<String> {
    matches
        .iter()
        .filter_map(|m| match m.metadata.get(DISPLAY_TEXT_KEY) {
            Some(text) => Some(text.clone()),
            None => {
                warn!(id = %m.id, "match has no display text, skipping");
                None
            }
        })
        .collect()
}

/// Up to `top_k` candidate display texts for a profile.
pub async fn recommend_candidates<S: VectorStore>(
    store: &S,
    handle: &CollectionHandle,
    profile: &Profile,
    top_k: usize,
) -> Result<Vec<String>> {
    let phrase = search_phrase(profile);
    let matches = search_courses(store, handle, &phrase, top_k).await?;
    Ok(display_texts(&matches))
}
