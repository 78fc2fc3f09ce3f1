//! Observations handed from the environment to agents.
use serde::{Deserialize, Serialize};

/// The number of components of [`EpisodeState::features`].
pub const FEATURE_DIM: usize = 4;

/// A retrieved document with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    /// Relevance score, higher is better.
    pub score: f32,

    /// Document text.
    pub doc: String,
}

impl ScoredDoc {
    /// Constructs a [`ScoredDoc`].
    pub fn new(score: f32, doc: impl Into<String>) -> Self {
        Self {
            score,
            doc: doc.into(),
        }
    }
}

/// Documents sorted by descending score, at most `top_k` of them.
pub type RetrievalResult = Vec<ScoredDoc>;

/// Number of whitespace separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Observation of the query rewriting environment.
///
/// `features` is `[top_score, mean_score, word_count(current_query), step_index]`, computed
/// from the retrieval result of `current_query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    /// The query after the rewrites applied so far.
    pub current_query: String,

    /// Feature vector fed to the agents.
    pub features: [f32; FEATURE_DIM],

    /// Number of steps taken in the episode.
    pub step_index: usize,
}

impl EpisodeState {
    /// Builds the state of `query` given its retrieval result.
    ///
    /// Scores are taken as `0.0` when `results` is empty.
    pub fn new(query: impl Into<String>, results: &[ScoredDoc], step_index: usize) -> Self {
        let current_query = query.into();
        let top_score = results.first().map(|r| r.score).unwrap_or(0.0);
        let mean_score =
            results.iter().map(|r| r.score).sum::<f32>() / results.len().max(1) as f32;
        let features = [
            top_score,
            mean_score,
            word_count(&current_query) as f32,
            step_index as f32,
        ];

        Self {
            current_query,
            features,
            step_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features() {
        let results = vec![ScoredDoc::new(3.0, "a"), ScoredDoc::new(1.0, "b")];
        let state = EpisodeState::new("treatment for  diabetes", &results, 2);
        assert_eq!(state.features, [3.0, 2.0, 3.0, 2.0]);
        assert_eq!(state.step_index, 2);
    }

    #[test]
    fn test_features_empty_result() {
        let state = EpisodeState::new("q", &[], 0);
        assert_eq!(state.features, [0.0, 0.0, 1.0, 0.0]);
    }
}
