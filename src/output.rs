//! Output formatting for codestyle.
//!
//! Writes a [`Dataset`] as CSV or JSON, and a single snippet's
//! [`FeatureMap`] as text or JSON.

use std::io::Write;

use serde::Serialize;
use thiserror::Error;

use crate::dataset::{is_missing, Dataset};
use crate::features::FeatureMap;

/// Errors that can occur during output formatting.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Comma-separated values with a header row (default).
    #[default]
    Csv,
    /// JSON for programmatic access.
    Json,
}

/// How a single snippet's feature map is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureFormat {
    /// One `name<TAB>value` line per feature (default).
    #[default]
    Text,
    /// A JSON object keyed by feature name.
    Json,
}

/// Options controlling what to include in output.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Prefix every row with its `identifier` and `index`.
    pub include_provenance: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            include_provenance: true,
        }
    }
}

impl OutputOptions {
    pub fn json() -> Self {
        Self {
            format: OutputFormat::Json,
            ..Default::default()
        }
    }

    pub fn without_provenance(mut self) -> Self {
        self.include_provenance = false;
        self
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Write a dataset in the requested format.
pub fn write_dataset<W: Write>(
    dataset: &Dataset,
    writer: &mut W,
    options: &OutputOptions,
) -> Result<(), OutputError> {
    match options.format {
        OutputFormat::Csv => write_csv(dataset, writer, options.include_provenance),
        OutputFormat::Json => {
            let json = to_json(dataset, options.include_provenance)?;
            writeln!(writer, "{json}")?;
            Ok(())
        }
    }
}

// ============================================================================
// CSV Formatting
// ============================================================================

/// Write a header row then one row per dataset row.
///
/// Missing cells are empty; infinities are written as `inf` and `-inf`.
pub fn write_csv<W: Write>(
    dataset: &Dataset,
    writer: &mut W,
    with_provenance: bool,
) -> Result<(), OutputError> {
    let mut header: Vec<String> = Vec::with_capacity(dataset.n_cols() + 2);
    if with_provenance {
        header.push("identifier".to_string());
        header.push("index".to_string());
    }
    header.extend(dataset.columns().iter().map(|c| csv_field(c)));
    writeln!(writer, "{}", header.join(","))?;

    for (row, provenance) in dataset.values().rows().into_iter().zip(dataset.provenance()) {
        let mut cells: Vec<String> = Vec::with_capacity(header.len());
        if with_provenance {
            cells.push(csv_field(&provenance.identifier));
            cells.push(provenance.index.to_string());
        }
        cells.extend(row.iter().map(|v| csv_number(*v)));
        writeln!(writer, "{}", cells.join(","))?;
    }

    writer.flush()?;
    Ok(())
}

fn csv_number(value: f64) -> String {
    if is_missing(value) {
        String::new()
    } else {
        // Display already spells infinities as inf / -inf
        value.to_string()
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// ============================================================================
// JSON Formatting
// ============================================================================

#[derive(Serialize)]
struct JsonDataset<'a> {
    columns: &'a [String],
    rows: Vec<JsonRow<'a>>,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    values: Vec<Option<f64>>,
}

/// Render a dataset as pretty JSON. Non-finite cells become `null`.
pub fn to_json(dataset: &Dataset, with_provenance: bool) -> Result<String, OutputError> {
    let rows = dataset
        .values()
        .rows()
        .into_iter()
        .zip(dataset.provenance())
        .map(|(row, provenance)| JsonRow {
            identifier: with_provenance.then_some(provenance.identifier.as_str()),
            index: with_provenance.then_some(provenance.index),
            values: row.iter().map(|v| json_number(*v)).collect(),
        })
        .collect();

    let output = JsonDataset {
        columns: dataset.columns(),
        rows,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn json_number(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

// ============================================================================
// Single Snippet
// ============================================================================

/// Render one snippet's features sorted by name.
///
/// Text shows missing values as `NaN`. JSON maps non-finite values to `null`.
pub fn format_features(
    features: &FeatureMap,
    format: FeatureFormat,
) -> Result<String, OutputError> {
    let sorted = features.sorted();
    match format {
        FeatureFormat::Text => {
            let mut out = String::new();
            for (name, value) in sorted {
                out.push_str(name);
                out.push('\t');
                out.push_str(&value.to_string());
                out.push('\n');
            }
            Ok(out)
        }
        FeatureFormat::Json => {
            let map: std::collections::BTreeMap<&str, Option<f64>> = sorted
                .into_iter()
                .map(|(name, value)| (name, json_number(value)))
                .collect();
            Ok(serde_json::to_string_pretty(&map)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::SnippetFeatures;

    fn dataset() -> Dataset {
        let row = |identifier: &str, index: usize, entries: &[(&str, f64)]| SnippetFeatures {
            identifier: identifier.to_string(),
            features: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            index,
        };
        Dataset::from_batch(&[
            row("alice", 0, &[("a", 0.5), ("b", f64::NEG_INFINITY)]),
            row("o'neil, jr", 1, &[("a", 1.0)]),
        ])
    }

    fn csv(with_provenance: bool) -> String {
        let mut out = Vec::new();
        write_csv(&dataset(), &mut out, with_provenance).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_output_options_default() {
        let opts = OutputOptions::default();
        assert_eq!(opts.format, OutputFormat::Csv);
        assert!(opts.include_provenance);
        assert!(!OutputOptions::json().without_provenance().include_provenance);
    }

    #[test]
    fn test_csv_with_provenance() {
        assert_eq!(
            csv(true),
            "identifier,index,a,b\nalice,0,0.5,-inf\n\"o'neil, jr\",1,1,\n"
        );
    }

    #[test]
    fn test_csv_without_provenance() {
        assert_eq!(csv(false), "a,b\n0.5,-inf\n1,\n");
    }

    #[test]
    fn test_csv_quotes() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_json_output() {
        let json = to_json(&dataset(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["columns"], serde_json::json!(["a", "b"]));
        assert_eq!(value["rows"][0]["identifier"], "alice");
        assert_eq!(value["rows"][0]["values"], serde_json::json!([0.5, null]));
        assert_eq!(value["rows"][1]["index"], 1);
        assert_eq!(value["rows"][1]["values"], serde_json::json!([1.0, null]));
    }

    #[test]
    fn test_json_without_provenance() {
        let json = to_json(&dataset(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["rows"][0].get("identifier").is_none());
        assert!(value["rows"][0].get("index").is_none());
    }

    #[test]
    fn test_format_features_text() {
        let features: FeatureMap = [("b".to_string(), 2.0), ("a".to_string(), f64::NAN)]
            .into_iter()
            .collect();
        assert_eq!(
            format_features(&features, FeatureFormat::Text).unwrap(),
            "a\tNaN\nb\t2\n"
        );

        let json = format_features(&features, FeatureFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["a"], serde_json::Value::Null);
        assert_eq!(value["b"], 2.0);
    }

    #[test]
    fn test_format_features_defaults_to_text() {
        let features: FeatureMap = [("x".to_string(), f64::NEG_INFINITY)].into_iter().collect();
        let text = format_features(&features, FeatureFormat::default()).unwrap();
        assert_eq!(text, "x\t-inf\n");
        assert!(!text.contains(','));
    }
}
