//! Token- and line-level features.

use std::collections::HashMap;

use crate::syntax::{collect_kind, identifiers, keywords, literals, non_empty_lines, Child};

use super::{
    insert_term_frequencies, log_ratio, mean, std_dev, ComputationError, FeatureExtractor,
    FeatureMap, Snippet,
};

const METHOD_DECLARATION: &str = "MethodDeclaration";
const TERNARY_EXPRESSION: &str = "TernaryExpression";

/// Identifier frequencies, keyword and construct densities, line lengths and
/// parameter counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalFeatures;

impl FeatureExtractor for LexicalFeatures {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn extract(&self, snippet: &Snippet<'_>) -> Result<FeatureMap, ComputationError> {
        let mut features = FeatureMap::new();

        word_unigram_tf(snippet, &mut features);
        keyword_densities(snippet, &mut features);
        token_densities(snippet, &mut features);
        construct_densities(snippet, &mut features);
        comment_density(snippet, &mut features);
        line_lengths(snippet, &mut features);
        parameter_counts(snippet, &mut features);

        Ok(features)
    }
}

fn word_unigram_tf(snippet: &Snippet<'_>, features: &mut FeatureMap) {
    let values = identifiers(snippet.tokens()).map(|t| t.value.as_str());
    insert_term_frequencies(features, "WordUnigramTF_", values);
}

/// `ln(num_{keyword}/length)` for every distinct keyword.
fn keyword_densities(snippet: &Snippet<'_>, features: &mut FeatureMap) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in keywords(snippet.tokens()) {
        *counts.entry(token.value.as_str()).or_default() += 1;
    }
    for (keyword, count) in counts {
        features.insert(
            format!("ln(num_{keyword}/length)"),
            log_ratio(count, snippet.length()),
        );
    }
}

fn token_densities(snippet: &Snippet<'_>, features: &mut FeatureMap) {
    let tokens = snippet.tokens();
    let length = snippet.length();

    features.insert(
        "ln(numTokens/length)",
        log_ratio(identifiers(tokens).count(), length),
    );
    features.insert(
        "ln(numLiterals/length)",
        log_ratio(literals(tokens).count(), length),
    );
    // Aggregate over all keywords, distinct from the per-keyword densities.
    features.insert(
        "ln(numKeywords/length)",
        log_ratio(keywords(tokens).count(), length),
    );
}

fn construct_densities(snippet: &Snippet<'_>, features: &mut FeatureMap) {
    let tree = snippet.tree();
    let length = snippet.length();

    features.insert(
        "ln(numFunctions/length)",
        log_ratio(collect_kind(tree, METHOD_DECLARATION).len(), length),
    );
    features.insert(
        "ln(numTernary/length)",
        log_ratio(collect_kind(tree, TERNARY_EXPRESSION).len(), length),
    );
}

fn comment_density(snippet: &Snippet<'_>, features: &mut FeatureMap) {
    let comments = non_empty_lines(snippet.text())
        .filter(|line| line.trim().starts_with("//"))
        .count();
    features.insert(
        "ln(numComments/length)",
        log_ratio(comments, snippet.length()),
    );
}

fn line_lengths(snippet: &Snippet<'_>, features: &mut FeatureMap) {
    let lengths: Vec<f64> = snippet
        .text()
        .split('\n')
        .map(|line| line.chars().count() as f64)
        .collect();
    features.insert("avgLineLength", mean(&lengths));
    features.insert("stdDevLineLength", std_dev(&lengths));
}

fn parameter_counts(snippet: &Snippet<'_>, features: &mut FeatureMap) {
    let counts: Vec<f64> = collect_kind(snippet.tree(), METHOD_DECLARATION)
        .into_iter()
        .map(|method| {
            method
                .field("parameters")
                .map_or(0, Child::node_count) as f64
        })
        .collect();
    features.insert("avgParams", mean(&counts));
    features.insert("stdDevNumParams", std_dev(&counts));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Frontend, JavaFrontend, SyntaxNode, Token};
    use approx::assert_relative_eq;

    fn extract(code: &str) -> FeatureMap {
        let (tokens, tree) = JavaFrontend.analyze(code).unwrap();
        let snippet = Snippet::new(code, &tokens, &tree).unwrap();
        LexicalFeatures.extract(&snippet).unwrap()
    }

    #[test]
    fn test_single_method_without_parameters() {
        let code = "class A { void f() { int x = 1; } }";
        let features = extract(code);
        let length = code.chars().count() as f64;

        assert_relative_eq!(
            features.get("ln(numFunctions/length)").unwrap(),
            (1.0 / length).ln()
        );
        assert_eq!(features.get("avgParams"), Some(0.0));
        assert_eq!(features.get("stdDevNumParams"), Some(0.0));
    }

    #[test]
    fn test_missing_constructs_are_negative_infinity() {
        let features = extract("class A { void f() { int x = 1; } }");
        assert_eq!(
            features.get("ln(numTernary/length)"),
            Some(f64::NEG_INFINITY)
        );
        assert_eq!(
            features.get("ln(numComments/length)"),
            Some(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn test_ternary_density() {
        let code = "class A { int f(int a) { return a > 0 ? a : -a; } }";
        let features = extract(code);
        let length = code.len() as f64;
        assert_relative_eq!(
            features.get("ln(numTernary/length)").unwrap(),
            (1.0 / length).ln()
        );

        let nested = "class A { int g(int a) { return a > 0 ? a : a < -9 ? 9 : -a; } }";
        let features = extract(nested);
        assert_relative_eq!(
            features.get("ln(numTernary/length)").unwrap(),
            (2.0 / nested.len() as f64).ln()
        );
    }

    #[test]
    fn test_identifier_term_frequency() {
        let features = extract("class A { int x; int y = x; }");
        // A, x, y, x
        assert_relative_eq!(features.get("WordUnigramTF_x").unwrap(), 0.5);
        assert_relative_eq!(features.get("WordUnigramTF_A").unwrap(), 0.25);
        assert_relative_eq!(features.get("WordUnigramTF_y").unwrap(), 0.25);
    }

    #[test]
    fn test_keyword_densities() {
        let code = "class A { int x; int y; }";
        let features = extract(code);
        let length = code.chars().count() as f64;

        assert_relative_eq!(
            features.get("ln(num_int/length)").unwrap(),
            (2.0 / length).ln()
        );
        assert_relative_eq!(
            features.get("ln(num_class/length)").unwrap(),
            (1.0 / length).ln()
        );
        assert_relative_eq!(
            features.get("ln(numKeywords/length)").unwrap(),
            (3.0 / length).ln()
        );
    }

    #[test]
    fn test_parameter_statistics() {
        let features = extract("class A { void f(int a) {} void g(int a, int b, int c) {} }");
        assert_relative_eq!(features.get("avgParams").unwrap(), 2.0);
        assert_relative_eq!(features.get("stdDevNumParams").unwrap(), 1.0);
    }

    #[test]
    fn test_no_methods_gives_nan_parameter_statistics() {
        let features = extract("class A { int x; }");
        assert!(features.get("avgParams").unwrap().is_nan());
        assert!(features.get("stdDevNumParams").unwrap().is_nan());
    }

    #[test]
    fn test_comment_lines() {
        let code = "// one\nclass A {\n    // two\n    int x; // trailing\n}";
        let features = extract(code);
        let length = code.chars().count() as f64;
        assert_relative_eq!(
            features.get("ln(numComments/length)").unwrap(),
            (2.0 / length).ln()
        );
    }

    #[test]
    fn test_line_length_statistics() {
        let code = "ab\n\nabcd";
        let tree = SyntaxNode::new("Program");
        let snippet = Snippet::new(code, &[], &tree).unwrap();
        let features = LexicalFeatures.extract(&snippet).unwrap();

        assert_relative_eq!(features.get("avgLineLength").unwrap(), 2.0);
        assert_relative_eq!(
            features.get("stdDevLineLength").unwrap(),
            (8.0f64 / 3.0).sqrt()
        );
    }

    #[test]
    fn test_literal_and_token_counts_from_stream() {
        let tokens = vec![
            Token::identifier("a"),
            Token::literal("1"),
            Token::literal("2"),
        ];
        let tree = SyntaxNode::new("Program");
        let snippet = Snippet::new("a 1 2 pad.", &tokens, &tree).unwrap();
        let features = LexicalFeatures.extract(&snippet).unwrap();

        assert_relative_eq!(
            features.get("ln(numLiterals/length)").unwrap(),
            (2.0f64 / 10.0).ln()
        );
        assert_relative_eq!(
            features.get("ln(numTokens/length)").unwrap(),
            (1.0f64 / 10.0).ln()
        );
        assert_eq!(
            features.get("ln(numKeywords/length)"),
            Some(f64::NEG_INFINITY)
        );
    }
}
