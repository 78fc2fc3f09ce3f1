//! Reward model for query rewrites.
use requery_core::{word_count, ScoredDoc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use xxhash_rust::xxh3::xxh3_64;

/// Lower-cased, whitespace separated tokens of `text`.
pub fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Fraction of the distinct tokens of `a` that also appear in `b`.
///
/// The overlap is normalized by `a` only, so `token_overlap(a, b)` and
/// `token_overlap(b, a)` differ in general.
pub fn token_overlap(a: &str, b: &str) -> f32 {
    let sa = tokens(a);
    let sb = tokens(b);
    sa.intersection(&sb).count() as f32 / sa.len().max(1) as f32
}

/// Measures how much of the original query a rewrite preserves, in `[0, 1]`.
pub trait Similarity {
    /// Similarity of `rewritten` to `original`.
    fn similarity(&self, original: &str, rewritten: &str) -> f32;
}

/// [`token_overlap`] of the original query with the rewrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlap;

impl Similarity for TokenOverlap {
    fn similarity(&self, original: &str, rewritten: &str) -> f32 {
        token_overlap(original, rewritten)
    }
}

/// Cosine similarity of hashed bag-of-words embeddings.
///
/// Tokens are hashed into `dim` buckets. Negative cosines cannot occur with counts but
/// the value is clamped to `[0, 1]` anyway, and an empty text has similarity `0`.
/// Intended for evaluation runs, as a drop-in for [`TokenOverlap`].
#[derive(Debug, Clone, Copy)]
pub struct HashedEmbedding {
    dim: usize,
}

impl HashedEmbedding {
    /// Embeds into `dim` buckets (at least one).
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Embedding of `text`.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let h = xxh3_64(token.to_lowercase().as_bytes());
            v[(h % self.dim as u64) as usize] += 1.0;
        }
        v
    }
}

impl Similarity for HashedEmbedding {
    fn similarity(&self, original: &str, rewritten: &str) -> f32 {
        let x = self.embed(original);
        let y = self.embed(rewritten);
        let dot: f32 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
        let nx = x.iter().map(|a| a * a).sum::<f32>().sqrt();
        let ny = y.iter().map(|a| a * a).sum::<f32>().sqrt();
        if nx == 0.0 || ny == 0.0 {
            0.0
        } else {
            (dot / (nx * ny)).clamp(0.0, 1.0)
        }
    }
}

/// Which [`Similarity`] computes the semantic term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimilarityConfig {
    /// [`TokenOverlap`].
    TokenOverlap,

    /// [`HashedEmbedding`] with the given number of buckets.
    HashedEmbedding {
        /// Number of buckets.
        dim: usize,
    },
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self::TokenOverlap
    }
}

/// Weights of the reward terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Weight of the top score change.
    pub rank: f32,

    /// Weight of the semantic preservation term.
    pub semantic: f32,

    /// Weight of the grounding term.
    pub grounding: f32,

    /// Penalty per word added to the original query.
    pub length_penalty: f32,

    /// Similarity used for the semantic term.
    #[serde(default)]
    pub similarity: SimilarityConfig,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            rank: 1.0,
            semantic: 0.5,
            grounding: 0.3,
            length_penalty: 0.02,
            similarity: SimilarityConfig::TokenOverlap,
        }
    }
}

impl RewardConfig {
    /// Sets the weight of the top score change.
    pub fn rank(mut self, v: f32) -> Self {
        self.rank = v;
        self
    }

    /// Sets the weight of the semantic term.
    pub fn semantic(mut self, v: f32) -> Self {
        self.semantic = v;
        self
    }

    /// Sets the weight of the grounding term.
    pub fn grounding(mut self, v: f32) -> Self {
        self.grounding = v;
        self
    }

    /// Sets the per-word length penalty.
    pub fn length_penalty(mut self, v: f32) -> Self {
        self.length_penalty = v;
        self
    }

    /// Sets the similarity of the semantic term.
    pub fn similarity(mut self, v: SimilarityConfig) -> Self {
        self.similarity = v;
        self
    }
}

/// Terms of a reward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardBreakdown {
    /// `after[0].score - before[0].score`.
    pub rank_gain: f32,

    /// Similarity of the rewrite to the original query.
    pub semantic_sim: f32,

    /// [`token_overlap`] of the rewrite with the top document after the rewrite.
    pub grounding: f32,

    /// Weighted penalty on words added to the original query.
    pub length_penalty: f32,

    /// The weighted sum.
    pub reward: f32,
}

/// Shapes a scalar reward from retrieval results before and after a rewrite.
pub struct RewardModel {
    config: RewardConfig,
    similarity: Box<dyn Similarity>,
}

impl RewardModel {
    /// Builds the model, including the similarity selected in `config`.
    pub fn new(config: RewardConfig) -> Self {
        let similarity: Box<dyn Similarity> = match config.similarity {
            SimilarityConfig::TokenOverlap => Box::new(TokenOverlap),
            SimilarityConfig::HashedEmbedding { dim } => Box::new(HashedEmbedding::new(dim)),
        };
        Self { config, similarity }
    }

    /// Replaces the similarity of the semantic term.
    pub fn with_similarity(mut self, similarity: Box<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Computes the reward terms, `None` if either result is empty.
    pub fn breakdown(
        &self,
        before: &[ScoredDoc],
        after: &[ScoredDoc],
        original_query: &str,
        rewritten_query: &str,
    ) -> Option<RewardBreakdown> {
        let (top_before, top_after) = match (before.first(), after.first()) {
            (Some(b), Some(a)) => (b, a),
            _ => return None,
        };

        let rank_gain = top_after.score - top_before.score;
        let semantic_sim = self.similarity.similarity(original_query, rewritten_query);
        let grounding = token_overlap(rewritten_query, &top_after.doc);
        let added = word_count(rewritten_query).saturating_sub(word_count(original_query));
        let length_penalty = added as f32 * self.config.length_penalty;
        let reward = self.config.rank * rank_gain
            + self.config.semantic * semantic_sim
            + self.config.grounding * grounding
            - length_penalty;

        Some(RewardBreakdown {
            rank_gain,
            semantic_sim,
            grounding,
            length_penalty,
            reward,
        })
    }

    /// Computes the reward, `0.0` if either result is empty.
    pub fn compute(
        &self,
        before: &[ScoredDoc],
        after: &[ScoredDoc],
        original_query: &str,
        rewritten_query: &str,
    ) -> f32 {
        self.breakdown(before, after, original_query, rewritten_query)
            .map(|b| b.reward)
            .unwrap_or(0.0)
    }
}

impl Default for RewardModel {
    fn default() -> Self {
        Self::new(RewardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "Metformin is the first line treatment for type 2 diabetes.";

    fn result(score: f32) -> Vec<ScoredDoc> {
        vec![ScoredDoc::new(score, DOC)]
    }

    #[test]
    fn test_empty_results_give_zero() {
        let model = RewardModel::default();
        assert_eq!(model.compute(&[], &result(1.0), "a b", "a b c"), 0.0);
        assert_eq!(model.compute(&result(1.0), &[], "a b", "a b c"), 0.0);
        assert_eq!(model.compute(&[], &[], "", ""), 0.0);
    }

    #[test]
    fn test_token_overlap_is_case_and_space_insensitive() {
        assert_eq!(token_overlap("A B", "a b"), token_overlap("a b", "a b"));
        assert_eq!(token_overlap("  a   B ", "A b"), 1.0);
    }

    #[test]
    fn test_semantic_normalized_by_original() {
        // dropping words lowers the overlap, adding words keeps every original token
        assert_eq!(token_overlap("a b c", "a"), 1.0 / 3.0);
        assert_eq!(token_overlap("a", "a b c"), 1.0);
    }

    #[test]
    fn test_length_penalty_only_on_growth() {
        let model = RewardModel::new(RewardConfig::default().rank(0.0).semantic(0.0).grounding(0.0));
        let r = result(1.0);
        assert_eq!(model.compute(&r, &r, "a b c", "a"), 0.0);
        assert_eq!(model.compute(&r, &r, "a b", "a b"), 0.0);

        let mut prev = 0.0;
        for extra in 1..5 {
            let rewritten = format!("a b{}", " x".repeat(extra));
            let b = model.breakdown(&r, &r, "a b", &rewritten).unwrap();
            assert!(b.length_penalty >= prev);
            assert!((b.length_penalty - 0.02 * extra as f32).abs() < 1e-6);
            prev = b.length_penalty;
        }
    }

    #[test]
    fn test_weighted_sum() {
        let model = RewardModel::default();
        let b = model
            .breakdown(&result(1.0), &result(3.0), "treatment for diabetes", "treatment for diabetes metformin")
            .unwrap();
        assert_eq!(b.rank_gain, 2.0);
        assert_eq!(b.semantic_sim, 1.0);
        assert_eq!(b.grounding, 0.75);
        let expected = 2.0 + 0.5 * 1.0 + 0.3 * 0.75 - 0.02;
        assert!((b.reward - expected).abs() < 1e-6);
    }

    #[test]
    fn test_rank_gain_can_be_negative() {
        let model = RewardModel::default();
        let b = model.breakdown(&result(3.0), &result(1.0), "a", "a").unwrap();
        assert_eq!(b.rank_gain, -2.0);
    }

    #[test]
    fn test_hashed_embedding_substitute() {
        let emb = HashedEmbedding::new(64);
        assert!((emb.similarity("treatment for diabetes", "Treatment  for diabetes") - 1.0).abs() < 1e-6);
        assert_eq!(emb.similarity("", "a"), 0.0);

        // only the semantic term changes
        let config = RewardConfig::default().similarity(SimilarityConfig::HashedEmbedding { dim: 64 });
        let model = RewardModel::new(config);
        let lexical = RewardModel::default();
        let (before, after) = (result(1.0), result(2.0));
        let b1 = model.breakdown(&before, &after, "treatment for diabetes", "treatment").unwrap();
        let b2 = lexical.breakdown(&before, &after, "treatment for diabetes", "treatment").unwrap();
        assert_eq!(b1.rank_gain, b2.rank_gain);
        assert_eq!(b1.grounding, b2.grounding);
        assert_eq!(b1.length_penalty, b2.length_penalty);
    }
}
