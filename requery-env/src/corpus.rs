//! Loading corpora and labelled queries.
use anyhow::{Context, Result};
use log::info;
use requery_core::error::RequeryError;
use std::{collections::BTreeMap, fs, path::Path};

/// Reads one document per non-blank line.
///
/// Failing to read the file, or a file without documents, is an error: nothing can be
/// trained or evaluated without a corpus.
pub fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus from {:?}", path))?;
    let corpus: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();

    if corpus.is_empty() {
        return Err(RequeryError::EmptyCorpus(path.display().to_string()).into());
    }
    info!("Loaded {} documents from {:?}", corpus.len(), path);
    Ok(corpus)
}

/// Reads `<data_dir>/<domain>/corpus.txt`.
pub fn load_domain_corpus(data_dir: impl AsRef<Path>, domain: &str) -> Result<Vec<String>> {
    load_corpus(data_dir.as_ref().join(domain).join("corpus.txt"))
}

/// Reads a JSON object mapping queries to their gold documents.
///
/// Pairs are returned sorted by query.
pub fn load_queries(path: impl AsRef<Path>) -> Result<Vec<(String, String)>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read queries from {:?}", path))?;
    let queries: BTreeMap<String, String> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse queries in {:?}", path))?;
    Ok(queries.into_iter().collect())
}

/// The labelled query of the medical domain.
pub fn default_queries() -> Vec<(String, String)> {
    vec![(
        "treatment for diabetes".to_string(),
        "Metformin is the first line treatment for type 2 diabetes.".to_string(),
    )]
}
