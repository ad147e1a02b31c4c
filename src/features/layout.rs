//! Whitespace and formatting features, computed from raw text only.
//!
//! The `ln(...)` names are historical: these are plain ratios.

use crate::syntax::non_empty_lines;

use super::{ComputationError, FeatureExtractor, FeatureMap, Snippet};

#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutFeatures;

impl FeatureExtractor for LayoutFeatures {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn extract(&self, snippet: &Snippet<'_>) -> Result<FeatureMap, ComputationError> {
        let text = snippet.text();
        let length = snippet.length() as f64;
        let mut features = FeatureMap::new();

        let tabs = bytecount::count(text.as_bytes(), b'\t');
        let spaces = bytecount::count(text.as_bytes(), b' ');
        features.insert("ln(numTabs/length)", tabs as f64 / length);
        features.insert("ln(numSpaces/length)", spaces as f64 / length);

        // Blank lines of the trimmed text, over character length.
        let empty_lines = text
            .trim_matches(is_space)
            .split('\n')
            .filter(|l| l.is_empty())
            .count();
        features.insert("ln(numEmptyLines/length)", empty_lines as f64 / length);

        features.insert("whiteSpaceRatio", white_space_ratio(text, snippet.length())?);
        features.insert("newLineBeforeOpenBrace", flag(brace_on_own_line(text)));
        features.insert("tabsLeadLines", flag(tabs_lead_lines(text)));

        Ok(features)
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Unicode whitespace plus the information separators U+001C..=U+001F.
fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

fn white_space_ratio(text: &str, length: usize) -> Result<f64, ComputationError> {
    let whitespace = text.chars().filter(|&c| is_space(c)).count();
    let other = length - whitespace;
    if other == 0 {
        return Err(ComputationError::ZeroDenominator {
            feature: "whiteSpaceRatio",
        });
    }
    Ok(whitespace as f64 / other as f64)
}

/// More than half of the lines containing `{` hold nothing else.
fn brace_on_own_line(text: &str) -> bool {
    let mut alone = 0usize;
    let mut total = 0usize;
    for line in text.split('\n') {
        if line.trim_matches(is_space) == "{" {
            alone += 1;
        }
        if line.contains('{') {
            total += 1;
        }
    }
    2 * alone > total
}

/// More non-empty lines start with a tab than with a space.
fn tabs_lead_lines(text: &str) -> bool {
    let mut tabs = 0usize;
    let mut spaces = 0usize;
    for line in non_empty_lines(text) {
        match line.chars().next() {
            Some('\t') => tabs += 1,
            Some(' ') => spaces += 1,
            _ => {}
        }
    }
    tabs > spaces
}
