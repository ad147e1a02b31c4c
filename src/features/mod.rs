//! Stylometric feature extraction.
//!
//! Every extractor implements [`FeatureExtractor`]: it reads a [`Snippet`]
//! (raw text plus the front end's tokens and tree) and returns a sparse
//! [`FeatureMap`]. Feature names are stable identifiers: downstream tables
//! key their columns by them.

pub mod layout;
pub mod lexical;
pub mod syntactic;

pub use layout::LayoutFeatures;
pub use lexical::LexicalFeatures;
pub use syntactic::SyntacticFeatures;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use thiserror::Error;

use crate::syntax::{SyntaxNode, Token};

/// Sparse feature name -> value mapping for one snippet.
///
/// Values may be infinite or NaN: degenerate ratios are reported as computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureMap(HashMap<String, f64>);

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the name.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Union with `other`; on duplicate names the value from `other` wins.
    pub fn merge(&mut self, other: FeatureMap) {
        self.0.extend(other.0);
    }

    /// Entries sorted by name.
    pub fn sorted(&self) -> BTreeMap<&str, f64> {
        self.iter().collect()
    }
}

impl FromIterator<(String, f64)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FeatureMap {
    type Item = (String, f64);
    type IntoIter = std::collections::hash_map::IntoIter<String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Errors raised while computing features for a parsed snippet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputationError {
    #[error("snippet is empty")]
    EmptySnippet,

    #[error("{feature}: denominator is zero")]
    ZeroDenominator { feature: &'static str },

    #[error("feature extraction panicked: {0}")]
    Panicked(String),
}

/// Everything an extractor may read about one snippet.
#[derive(Debug, Clone, Copy)]
pub struct Snippet<'a> {
    text: &'a str,
    tokens: &'a [Token],
    tree: &'a SyntaxNode,
    length: usize,
}

impl<'a> Snippet<'a> {
    /// Wrap a parsed snippet. Empty text is rejected: every ratio feature
    /// divides by its length.
    pub fn new(
        text: &'a str,
        tokens: &'a [Token],
        tree: &'a SyntaxNode,
    ) -> Result<Self, ComputationError> {
        let length = text.chars().count();
        if length == 0 {
            return Err(ComputationError::EmptySnippet);
        }
        Ok(Self {
            text,
            tokens,
            tree,
            length,
        })
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    pub fn tree(&self) -> &'a SyntaxNode {
        self.tree
    }

    /// Length of the text in characters.
    pub fn length(&self) -> usize {
        self.length
    }
}

/// A family of features computed from one snippet.
pub trait FeatureExtractor: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    fn extract(&self, snippet: &Snippet<'_>) -> Result<FeatureMap, ComputationError>;
}

/// The lexical, layout and syntactic extractors, in that order.
pub fn default_extractors() -> Vec<Box<dyn FeatureExtractor>> {
    vec![
        Box::new(LexicalFeatures),
        Box::new(LayoutFeatures),
        Box::new(SyntacticFeatures),
    ]
}

/// `ln(count / length)`. A zero count gives negative infinity.
pub(crate) fn log_ratio(count: usize, length: usize) -> f64 {
    (count as f64 / length as f64).ln()
}

/// Add `{prefix}{item}` = occurrences / total for every distinct item.
pub(crate) fn insert_term_frequencies<'a, I>(features: &mut FeatureMap, prefix: &str, items: I)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0usize;
    for item in items {
        *counts.entry(item).or_default() += 1;
        total += 1;
    }
    for (item, count) in counts {
        features.insert(format!("{prefix}{item}"), count as f64 / total as f64);
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; NaN for an empty slice.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
