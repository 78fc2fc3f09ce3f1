//! Retrieval metrics of rewriting methods.
use crate::{QueryRewriteEnv, Retriever};
use anyhow::{Context, Result};
use log::info;
use requery_core::{Env, Policy, ScoredDoc};
use serde::Serialize;
use std::{
    fs::{self, OpenOptions},
    path::Path,
};

/// `1.0` if `gold` is among the first `k` documents of `results`, `0.0` otherwise.
pub fn recall_at_k(results: &[ScoredDoc], gold: &str, k: usize) -> f32 {
    match results.iter().take(k).any(|r| r.doc == gold) {
        true => 1.0,
        false => 0.0,
    }
}

/// 1-based position of `gold` in `results`, `results.len() + 1` if it is absent.
pub fn mean_rank(results: &[ScoredDoc], gold: &str) -> f32 {
    let pos = results
        .iter()
        .position(|r| r.doc == gold)
        .unwrap_or(results.len());
    (pos + 1) as f32
}

/// Rewriting methods compared in evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// The query as is.
    NoRewrite,

    /// A uniformly random action of the catalogue.
    RandomRewrite,

    /// Always the first action of the catalogue.
    StaticRewrite,

    /// The action sampled by a trained policy on the reset state.
    LearnedPolicy,
}

impl Method {
    /// All methods in reporting order.
    pub const ALL: [Method; 4] = [
        Method::NoRewrite,
        Method::RandomRewrite,
        Method::StaticRewrite,
        Method::LearnedPolicy,
    ];

    /// Name used in the metrics file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::NoRewrite => "no-rewrite",
            Method::RandomRewrite => "random-rewrite",
            Method::StaticRewrite => "static-rewrite",
            Method::LearnedPolicy => "learned-policy",
        }
    }
}

/// A row of the metrics file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    /// Domain of the corpus.
    pub domain: String,

    /// See [`Method::as_str`].
    pub method: String,

    /// Recall@k averaged over the queries.
    pub recall_at_k: f32,

    /// Rank of the gold document averaged over the queries.
    pub mean_rank: f32,
}

/// Averages recall@k and rank of the gold documents after rewriting each query with `rewrite`.
///
/// `k` is the `top_k` of the environment.
pub fn evaluate_rewrites<R, F>(
    env: &QueryRewriteEnv<R>,
    queries: &[(String, String)],
    mut rewrite: F,
) -> Result<(f32, f32)>
where
    R: Retriever,
    F: FnMut(&str) -> Result<String>,
{
    if queries.is_empty() {
        return Ok((0.0, 0.0));
    }

    let k = env.config().top_k;
    let mut recall = 0.0;
    let mut rank = 0.0;
    for (query, gold) in queries.iter() {
        let rewritten = rewrite(query)?;
        let results = env.retrieve(&rewritten);
        recall += recall_at_k(&results, gold, k);
        rank += mean_rank(&results, gold);
    }

    let n = queries.len() as f32;
    Ok((recall / n, rank / n))
}

/// Evaluates the four [`Method`]s on `queries`.
///
/// `policy` provides the learned method: the environment is reset with each query and the
/// sampled action is applied once. `seed` fixes the random method.
pub fn evaluate_methods<R, P>(
    env: &mut QueryRewriteEnv<R>,
    policy: &mut P,
    queries: &[(String, String)],
    domain: &str,
    seed: u64,
) -> Result<Vec<MetricsRow>>
where
    R: Retriever,
    P: Policy + ?Sized,
{
    let catalogue = env.catalogue().clone();
    let rng = fastrand::Rng::new();
    rng.seed(seed);

    let mut rows = Vec::with_capacity(Method::ALL.len());
    for method in Method::ALL {
        let (recall, rank) = match method {
            Method::NoRewrite => evaluate_rewrites(env, queries, |q| Ok(q.to_string()))?,
            Method::RandomRewrite => evaluate_rewrites(env, queries, |q| {
                Ok(catalogue.apply(rng.usize(..catalogue.len()), q)?)
            })?,
            Method::StaticRewrite => {
                evaluate_rewrites(env, queries, |q| Ok(catalogue.apply(0, q)?))?
            }
            Method::LearnedPolicy => {
                let mut rewritten = Vec::with_capacity(queries.len());
                for (query, _) in queries.iter() {
                    let state = env.reset(query)?;
                    let index = policy.sample(&state)?.index;
                    rewritten.push(catalogue.apply(index, query)?);
                }
                let mut it = rewritten.into_iter();
                evaluate_rewrites(env, queries, |_| {
                    it.next().context("Missing rewrite of a query")
                })?
            }
        };
        info!(
            "{:<16} recall@k {:.3} mean rank {:.3}",
            method.as_str(),
            recall,
            rank
        );
        rows.push(MetricsRow {
            domain: domain.to_string(),
            method: method.as_str().to_string(),
            recall_at_k: recall,
            mean_rank: rank,
        });
    }

    Ok(rows)
}

/// Appends `rows` to the CSV file at `path`.
///
/// The header is written only when the file is new or empty.
pub fn append_metrics(path: impl AsRef<Path>, rows: &[MetricsRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let has_content = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open metrics file {:?}", path))?;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!has_content)
        .from_writer(file);
    for row in rows.iter() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!("Appended {} rows to {:?}", rows.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{default_queries, Bm25Retriever, EnvConfig};
    use requery_core::{ActionCatalogue, ActionSample, EpisodeState};
    use tempdir::TempDir;

    const GOLD: &str = "Metformin is the first line treatment for type 2 diabetes.";

    fn docs() -> Vec<ScoredDoc> {
        vec![
            ScoredDoc::new(3.0, "a"),
            ScoredDoc::new(2.0, GOLD),
            ScoredDoc::new(1.0, "b"),
        ]
    }

    struct Always(usize);

    impl Policy for Always {
        fn sample(&mut self, _state: &EpisodeState) -> Result<ActionSample> {
            Ok(ActionSample {
                index: self.0,
                log_prob: None,
            })
        }
    }

    #[test]
    fn test_recall_and_rank() {
        assert_eq!(recall_at_k(&docs(), GOLD, 3), 1.0);
        assert_eq!(recall_at_k(&docs(), GOLD, 1), 0.0);
        assert_eq!(mean_rank(&docs(), GOLD), 2.0);
        assert_eq!(mean_rank(&docs(), "missing"), 4.0);
        assert_eq!(mean_rank(&[], GOLD), 1.0);
    }

    #[test]
    fn test_evaluate_methods_single_document() -> Result<()> {
        let retriever = Bm25Retriever::new(vec![GOLD.to_string()])?;
        let mut env = QueryRewriteEnv::new(retriever, ActionCatalogue::default(), EnvConfig::default());
        let rows = evaluate_methods(&mut env, &mut Always(1), &default_queries(), "medical", 42)?;

        let methods: Vec<_> = rows.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(
            methods,
            vec!["no-rewrite", "random-rewrite", "static-rewrite", "learned-policy"]
        );
        for row in rows.iter() {
            assert_eq!(row.domain, "medical");
            assert_eq!(row.recall_at_k, 1.0);
            assert_eq!(row.mean_rank, 1.0);
        }
        Ok(())
    }

    #[test]
    fn test_append_metrics_writes_header_once() -> Result<()> {
        let dir = TempDir::new("metrics")?;
        let path = dir.path().join("results").join("metrics.csv");
        let row = MetricsRow {
            domain: "medical".to_string(),
            method: Method::NoRewrite.as_str().to_string(),
            recall_at_k: 1.0,
            mean_rank: 1.0,
        };

        append_metrics(&path, &[row.clone()])?;
        append_metrics(&path, &[row])?;

        let text = fs::read_to_string(&path)?;
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "domain,method,recall_at_k,mean_rank");
        assert_eq!(lines[1], lines[2]);
        assert!(lines[1].starts_with("medical,no-rewrite,"));
        Ok(())
    }
}
