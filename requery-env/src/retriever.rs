//! Retrieval oracle.
use anyhow::Result;
use requery_core::{error::RequeryError, RetrievalResult, ScoredDoc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashMap};

/// Ranks documents for a query.
///
/// Implementations must be deterministic for a fixed corpus and query, return at most
/// `top_k` documents and sort them by descending score.
pub trait Retriever {
    /// Returns the `top_k` best documents for `query`.
    fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult;
}

impl<T: Retriever + ?Sized> Retriever for &T {
    fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult {
        (**self).retrieve(query, top_k)
    }
}

/// Parameters of [`Bm25Retriever`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Config {
    /// Term frequency saturation.
    pub k1: f64,

    /// Document length normalization.
    pub b: f64,

    /// Floor of the idf of very common terms, as a fraction of the average idf.
    pub epsilon: f64,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// BM25 Okapi ranking over an in-memory corpus.
///
/// Documents and queries are lower-cased and split on whitespace. Terms whose idf is
/// negative, i.e. terms in more than half of the documents, get `epsilon` times the
/// average idf instead. Documents with equal scores keep their corpus order.
pub struct Bm25Retriever {
    config: Bm25Config,
    docs: Vec<String>,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<f64>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Retriever {
    /// Indexes `corpus` with the default parameters.
    pub fn new(corpus: Vec<String>) -> Result<Self> {
        Self::with_config(corpus, Bm25Config::default())
    }

    /// Indexes `corpus`.
    pub fn with_config(corpus: Vec<String>, config: Bm25Config) -> Result<Self> {
        if corpus.is_empty() {
            return Err(RequeryError::EmptyCorpus("no document to index".to_string()).into());
        }

        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for doc in corpus.iter() {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            let mut len = 0;
            for token in doc.to_lowercase().split_whitespace() {
                *freqs.entry(token.to_string()).or_insert(0) += 1;
                len += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
            doc_lens.push(len as f64);
        }

        let n = corpus.len() as f64;
        let avgdl = doc_lens.iter().sum::<f64>() / n;
        let mut idf: HashMap<String, f64> = doc_freqs
            .into_iter()
            .map(|(term, df)| {
                let df = df as f64;
                (term, (n - df + 0.5).ln() - (df + 0.5).ln())
            })
            .collect();

        if !idf.is_empty() {
            let eps = config.epsilon * idf.values().sum::<f64>() / idf.len() as f64;
            idf.values_mut().filter(|v| **v < 0.0).for_each(|v| *v = eps);
        }

        Ok(Self {
            config,
            docs: corpus,
            term_freqs,
            doc_lens,
            avgdl: if avgdl > 0.0 { avgdl } else { 1.0 },
            idf,
        })
    }

    /// The number of indexed documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Always `false`, an empty corpus is rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// BM25 scores of every document, in corpus order.
    pub fn scores(&self, query: &str) -> Vec<f64> {
        let Bm25Config { k1, b, .. } = self.config;
        let mut scores = vec![0f64; self.docs.len()];

        for term in query.to_lowercase().split_whitespace() {
            let idf = match self.idf.get(term) {
                Some(idf) => *idf,
                None => continue,
            };
            for (i, score) in scores.iter_mut().enumerate() {
                let tf = *self.term_freqs[i].get(term).unwrap_or(&0) as f64;
                let norm = tf + k1 * (1.0 - b + b * self.doc_lens[i] / self.avgdl);
                *score += idf * (tf * (k1 + 1.0) / norm);
            }
        }

        scores
    }
}

impl Retriever for Bm25Retriever {
    fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult {
        let mut ranked: Vec<(f64, usize)> = self
            .scores(query)
            .into_iter()
            .enumerate()
            .map(|(i, s)| (s, i))
            .collect();
        // Stable sort keeps corpus order among ties
        ranked.sort_by(|x, y| y.0.partial_cmp(&x.0).unwrap_or(Ordering::Equal));

        ranked
            .into_iter()
            .take(top_k)
            .map(|(score, i)| ScoredDoc::new(score as f32, self.docs[i].clone()))
            .collect()
    }
}
