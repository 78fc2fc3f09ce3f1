//! Query rewriting environment.
//!
//! [`QueryRewriteEnv`] implements [`requery_core::Env`]. Each step applies a rewrite from
//! the [`ActionCatalogue`](requery_core::ActionCatalogue) to the current query, retrieves
//! documents for the query before and after the rewrite with a [`Retriever`], and scores
//! the rewrite with a [`RewardModel`].
//!
//! ## Retrieval
//!
//! The environment treats retrieval as an oracle behind the [`Retriever`] trait.
//! [`Bm25Retriever`] ranks an in-memory corpus with BM25 Okapi.
//!
//! ## Reward
//!
//! The reward combines four terms weighted by [`RewardConfig`]: the change of the top
//! retrieval score, how much of the original query survives the rewrite, how well the
//! rewrite matches the top document, and a penalty on query growth.
//!
//! ## Evaluation
//!
//! The [`eval`] module measures recall@k and mean rank of the gold document for the
//! no-rewrite, random-rewrite, static-rewrite and learned-policy methods and appends
//! them to a CSV file.
mod corpus;
mod env;
pub mod eval;
mod retriever;
mod reward;
pub use corpus::{default_queries, load_corpus, load_domain_corpus, load_queries};
pub use env::{EnvConfig, Phase, QueryRewriteEnv, StepInfo};
pub use retriever::{Bm25Config, Bm25Retriever, Retriever};
pub use reward::{
    token_overlap, tokens, HashedEmbedding, RewardBreakdown, RewardConfig, RewardModel,
    Similarity, SimilarityConfig, TokenOverlap,
};
