//! Sparse-to-dense reconciliation.
//!
//! Every snippet yields its own set of feature names. A [`Dataset`] has one
//! column per name seen anywhere in the batch, in sorted order, and one row
//! per snippet; a name a snippet did not produce is [`MISSING`].

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array2, ArrayView1, Axis};
use tracing::debug;

use crate::batch::SnippetFeatures;
use crate::features::FeatureMap;

/// Marker for a feature absent from a row.
///
/// Distinct from every real value except NaN itself; test with
/// [`is_missing`], never with `==`.
pub const MISSING: f64 = f64::NAN;

#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Column position of every feature name in the union of `samples`.
///
/// Names are sorted, so the result does not depend on sample order.
pub fn vocabulary<'a, I>(samples: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a FeatureMap>,
{
    let names: BTreeSet<&str> = samples.into_iter().flat_map(|m| m.keys()).collect();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect()
}

/// Provenance of one dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowProvenance {
    pub identifier: String,
    pub index: usize,
}

/// Dense feature matrix with named columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    lookup: BTreeMap<String, usize>,
    values: Array2<f64>,
    provenance: Vec<RowProvenance>,
}

impl Dataset {
    /// Build a dataset whose rows follow the batch's sequence indices.
    ///
    /// The arrival order of `results` does not matter: the same batch always
    /// produces the same dataset.
    pub fn from_batch(results: &[SnippetFeatures]) -> Self {
        let mut ordered: Vec<&SnippetFeatures> = results.iter().collect();
        ordered.sort_by_key(|r| r.index);

        let provenance = ordered
            .iter()
            .map(|r| RowProvenance {
                identifier: r.identifier.clone(),
                index: r.index,
            })
            .collect();
        assemble(ordered.iter().map(|r| &r.features), provenance)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn provenance(&self) -> &[RowProvenance] {
        &self.provenance
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name)
            .map(|col| self.values.index_axis(Axis(1), col))
    }

    pub fn row(&self, row: usize) -> Option<ArrayView1<'_, f64>> {
        (row < self.n_rows()).then(|| self.values.index_axis(Axis(0), row))
    }

    /// Cell value, [`MISSING`] included. `None` for an unknown row or name.
    pub fn get(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.column_index(name)?;
        self.values.get((row, col)).copied()
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| is_missing(**v)).count()
    }
}

/// Build a dataset from plain feature maps, one row per map in input order.
///
/// Rows carry their position as provenance index and an empty identifier.
pub fn build_dataset(samples: &[FeatureMap]) -> Dataset {
    let provenance = (0..samples.len())
        .map(|index| RowProvenance {
            identifier: String::new(),
            index,
        })
        .collect();
    assemble(samples.iter(), provenance)
}

fn assemble<'a, I>(samples: I, provenance: Vec<RowProvenance>) -> Dataset
where
    I: IntoIterator<Item = &'a FeatureMap> + Clone,
{
    let lookup = vocabulary(samples.clone());
    let mut columns = vec![String::new(); lookup.len()];
    for (name, &col) in &lookup {
        columns[col] = name.clone();
    }

    let mut values = Array2::from_elem((provenance.len(), columns.len()), MISSING);
    for (mut row, sample) in values.rows_mut().into_iter().zip(samples) {
        for (name, value) in sample.iter() {
            if let Some(&col) = lookup.get(name) {
                row[col] = value;
            }
        }
    }

    debug!(rows = values.nrows(), columns = values.ncols(), "assembled dataset");

    Dataset {
        columns,
        lookup,
        values,
        provenance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> FeatureMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn sample(identifier: &str, index: usize, entries: &[(&str, f64)]) -> SnippetFeatures {
        SnippetFeatures {
            identifier: identifier.to_string(),
            features: map(entries),
            index,
        }
    }

    #[test]
    fn test_vocabulary_order_independent() {
        let a = map(&[("zeta", 1.0), ("alpha", 2.0)]);
        let b = map(&[("mid", 3.0), ("alpha", 4.0)]);

        let forward = vocabulary([&a, &b]);
        let backward = vocabulary([&b, &a]);
        assert_eq!(forward, backward);
        assert_eq!(
            forward.into_iter().collect::<Vec<_>>(),
            [
                ("alpha".to_string(), 0),
                ("mid".to_string(), 1),
                ("zeta".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_missing_cells() {
        let dataset = build_dataset(&[map(&[("a", 1.0)]), map(&[("b", 2.0)])]);

        assert_eq!(dataset.columns(), ["a", "b"]);
        assert_eq!(dataset.get(0, "a"), Some(1.0));
        assert!(is_missing(dataset.get(0, "b").unwrap()));
        assert!(is_missing(dataset.get(1, "a").unwrap()));
        assert_eq!(dataset.get(1, "b"), Some(2.0));
        assert_eq!(dataset.missing_count(), 2);
    }

    #[test]
    fn test_real_values_are_exact() {
        let dataset = build_dataset(&[map(&[
            ("neg", f64::NEG_INFINITY),
            ("zero", 0.0),
            ("tiny", 1e-300),
        ])]);
        assert_eq!(dataset.get(0, "neg"), Some(f64::NEG_INFINITY));
        assert_eq!(dataset.get(0, "zero"), Some(0.0));
        assert_eq!(dataset.get(0, "tiny"), Some(1e-300));
        assert_eq!(dataset.missing_count(), 0);
    }

    #[test]
    fn test_one_row_per_sample() {
        let samples = vec![map(&[("x", 1.0)]); 7];
        let dataset = build_dataset(&samples);
        assert_eq!(dataset.n_rows(), 7);
        assert_eq!(dataset.n_cols(), 1);
        assert_eq!(dataset.provenance()[6].index, 6);
    }

    #[test]
    fn test_empty_batch() {
        let dataset = build_dataset(&[]);
        assert!(dataset.is_empty());
        assert_eq!(dataset.n_cols(), 0);
        assert!(dataset.row(0).is_none());
    }

    #[test]
    fn test_from_batch_arrival_order_irrelevant() {
        let first = sample("alice", 0, &[("a", 1.0)]);
        let second = sample("bob", 3, &[("a", 2.0), ("b", 5.0)]);

        let forward = Dataset::from_batch(&[first.clone(), second.clone()]);
        let backward = Dataset::from_batch(&[second, first]);

        assert_eq!(forward.columns(), backward.columns());
        assert_eq!(forward.provenance(), backward.provenance());
        let bits = |d: &Dataset| d.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&forward), bits(&backward));

        assert_eq!(forward.provenance()[1].identifier, "bob");
        assert_eq!(forward.provenance()[1].index, 3);
    }

    #[test]
    fn test_column_and_row_views() {
        let dataset = build_dataset(&[map(&[("a", 1.0), ("b", 2.0)]), map(&[("a", 3.0)])]);

        let a = dataset.column("a").unwrap();
        assert_eq!(a.to_vec(), [1.0, 3.0]);
        assert!(dataset.column("missing").is_none());

        let row = dataset.row(0).unwrap();
        assert_eq!(row.to_vec(), [1.0, 2.0]);
        assert_eq!(dataset.column_index("b"), Some(1));
    }
}
