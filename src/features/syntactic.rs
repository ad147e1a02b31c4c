//! Structural features of the syntax tree.

use crate::syntax::{collect, keywords, SyntaxNode};

use super::{insert_term_frequencies, ComputationError, FeatureExtractor, FeatureMap, Snippet};

/// Tree depth, node-type bigrams, node-type census and keyword distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntacticFeatures;

impl FeatureExtractor for SyntacticFeatures {
    fn name(&self) -> &'static str {
        "syntactic"
    }

    fn extract(&self, snippet: &Snippet<'_>) -> Result<FeatureMap, ComputationError> {
        let tree = snippet.tree();
        let mut features = FeatureMap::new();

        features.insert("MaxDepthASTNode", max_depth(tree) as f64);

        let bigrams = node_bigrams(tree);
        insert_term_frequencies(
            &mut features,
            "ASTNodeBigramsTF_",
            bigrams.iter().map(String::as_str),
        );

        let nodes = collect(tree, |_| true);
        insert_term_frequencies(
            &mut features,
            "ASTNodeTypesTF_",
            nodes.iter().map(|node| node.kind()),
        );

        insert_term_frequencies(
            &mut features,
            "javaKeywords_",
            keywords(snippet.tokens()).map(|t| t.value.as_str()),
        );

        Ok(features)
    }
}

/// Number of nodes on the longest root-to-leaf chain.
pub fn max_depth(node: &SyntaxNode) -> usize {
    1 + node.child_nodes().map(max_depth).max().unwrap_or(0)
}

/// `{parent}_{child}` for every parent -> child node edge, pre-order.
pub fn node_bigrams(node: &SyntaxNode) -> Vec<String> {
    fn walk(node: &SyntaxNode, out: &mut Vec<String>) {
        for child in node.child_nodes() {
            out.push(format!("{}_{}", node.kind(), child.kind()));
            walk(child, out);
        }
    }

    let mut out = Vec::new();
    walk(node, &mut out);
    out
}
