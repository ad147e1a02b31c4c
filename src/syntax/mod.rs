//! Tokens, syntax trees and the front end that produces them.
//!
//! The feature extractors never talk to a parser directly. They consume the
//! [`Token`] stream and [`SyntaxNode`] tree handed over by a [`Frontend`],
//! and walk them with the classifier functions defined here.

mod java;

pub use java::{JavaFrontend, MAX_TREE_DEPTH};

use std::fmt;

use compact_str::CompactString;
use smallvec::SmallVec;
use thiserror::Error;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Literal,
    /// Operators, separators and anything else.
    Other,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Keyword => write!(f, "keyword"),
            TokenKind::Literal => write!(f, "literal"),
            TokenKind::Other => write!(f, "other"),
        }
    }
}

/// A lexical unit in read order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: CompactString,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<CompactString>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn identifier(value: impl Into<CompactString>) -> Self {
        Self::new(TokenKind::Identifier, value)
    }

    pub fn keyword(value: impl Into<CompactString>) -> Self {
        Self::new(TokenKind::Keyword, value)
    }

    pub fn literal(value: impl Into<CompactString>) -> Self {
        Self::new(TokenKind::Literal, value)
    }

    pub fn other(value: impl Into<CompactString>) -> Self {
        Self::new(TokenKind::Other, value)
    }
}

/// 1-indexed source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The front end rejected a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .location.map(|l| format!(" at {l}")).unwrap_or_default())]
pub struct ParseError {
    pub message: String,
    /// Where the first offending construct starts, when the front end knows.
    pub location: Option<Location>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// One child slot of a [`SyntaxNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Node(SyntaxNode),
    /// A slot holding several nodes, e.g. a parameter list.
    List(Vec<SyntaxNode>),
    /// Leaf text that is not a node of its own (names, primitive types).
    Value(String),
}

impl Child {
    /// Number of tree nodes held by this slot.
    pub fn node_count(&self) -> usize {
        match self {
            Child::Node(_) => 1,
            Child::List(nodes) => nodes.len(),
            Child::Value(_) => 0,
        }
    }
}

/// A child after list slots have been flattened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChildRef<'a> {
    Node(&'a SyntaxNode),
    Value(&'a str),
}

impl<'a> ChildRef<'a> {
    pub fn as_node(self) -> Option<&'a SyntaxNode> {
        match self {
            ChildRef::Node(node) => Some(node),
            ChildRef::Value(_) => None,
        }
    }
}

/// A node of the abstract syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    kind: String,
    slots: Vec<Child>,
    /// Field name -> index into `slots`.
    fields: SmallVec<[(&'static str, usize); 4]>,
}

impl SyntaxNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            slots: Vec::new(),
            fields: SmallVec::new(),
        }
    }

    /// Builder-style [`push`](Self::push).
    pub fn with_child(mut self, child: Child) -> Self {
        self.push(child);
        self
    }

    /// Builder-style [`push_field`](Self::push_field).
    pub fn with_field(mut self, name: &'static str, child: Child) -> Self {
        self.push_field(name, child);
        self
    }

    /// Grammar category of the node, e.g. `MethodDeclaration`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Raw child slots, list slots not flattened.
    pub fn slots(&self) -> &[Child] {
        &self.slots
    }

    pub fn push(&mut self, child: Child) {
        self.slots.push(child);
    }

    /// Append a slot under a field name.
    ///
    /// A field that is pushed again accumulates its nodes into a single list
    /// slot at the position of its first occurrence. Only nodes accumulate: a
    /// repeated value, or a node pushed onto a value, is kept as an unnamed
    /// slot, so [`field`](Self::field) returns the first occurrence while
    /// [`children`](Self::children) still yields every slot.
    pub fn push_field(&mut self, name: &'static str, child: Child) {
        let Some(at) = self.field_index(name) else {
            self.fields.push((name, self.slots.len()));
            self.slots.push(child);
            return;
        };

        let rest = match (&mut self.slots[at], child) {
            (Child::List(nodes), Child::Node(node)) => {
                nodes.push(node);
                return;
            }
            (Child::List(nodes), Child::List(more)) => {
                nodes.extend(more);
                return;
            }
            (slot, Child::Node(node)) if matches!(*slot, Child::Node(_)) => {
                *slot = match std::mem::replace(slot, Child::List(Vec::new())) {
                    Child::Node(first) => Child::List(vec![first, node]),
                    other => other,
                };
                return;
            }
            (slot, Child::List(more)) if matches!(*slot, Child::Node(_)) => {
                *slot = match std::mem::replace(slot, Child::List(Vec::new())) {
                    Child::Node(first) => {
                        Child::List(std::iter::once(first).chain(more).collect())
                    }
                    other => other,
                };
                return;
            }
            (_, other) => other,
        };
        self.slots.push(rest);
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|&(_, index)| index)
    }

    /// Look up a structural field by name.
    pub fn field(&self, name: &str) -> Option<&Child> {
        self.field_index(name).map(|index| &self.slots[index])
    }

    /// Direct children with list slots flattened, order preserved.
    pub fn children(&self) -> Vec<ChildRef<'_>> {
        let mut out = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            match slot {
                Child::Node(node) => out.push(ChildRef::Node(node)),
                Child::List(nodes) => out.extend(nodes.iter().map(ChildRef::Node)),
                Child::Value(value) => out.push(ChildRef::Value(value)),
            }
        }
        out
    }

    /// Direct children that are nodes.
    pub fn child_nodes(&self) -> impl Iterator<Item = &SyntaxNode> + '_ {
        self.children().into_iter().filter_map(ChildRef::as_node)
    }
}

/// Produces tokens and a tree from snippet text.
pub trait Frontend: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, ParseError>;

    fn parse(&self, text: &str) -> Result<SyntaxNode, ParseError>;

    /// Tokenize and parse in one go. Implementations that parse once for both
    /// should override this.
    fn analyze(&self, text: &str) -> Result<(Vec<Token>, SyntaxNode), ParseError> {
        Ok((self.tokenize(text)?, self.parse(text)?))
    }
}

fn of_kind(tokens: &[Token], kind: TokenKind) -> impl Iterator<Item = &Token> {
    tokens.iter().filter(move |token| token.kind == kind)
}

/// Identifier tokens in read order.
pub fn identifiers(tokens: &[Token]) -> impl Iterator<Item = &Token> {
    of_kind(tokens, TokenKind::Identifier)
}

/// Keyword tokens in read order.
pub fn keywords(tokens: &[Token]) -> impl Iterator<Item = &Token> {
    of_kind(tokens, TokenKind::Keyword)
}

/// Literal tokens in read order.
pub fn literals(tokens: &[Token]) -> impl Iterator<Item = &Token> {
    of_kind(tokens, TokenKind::Literal)
}

/// Direct children of `node`, list slots flattened.
pub fn children(node: &SyntaxNode) -> Vec<ChildRef<'_>> {
    node.children()
}

/// All nodes under `node` (itself included) matching `predicate`, pre-order.
pub fn collect<'a, P>(node: &'a SyntaxNode, predicate: P) -> Vec<&'a SyntaxNode>
where
    P: Fn(&SyntaxNode) -> bool,
{
    fn walk<'a, P>(node: &'a SyntaxNode, predicate: &P, out: &mut Vec<&'a SyntaxNode>)
    where
        P: Fn(&SyntaxNode) -> bool,
    {
        if predicate(node) {
            out.push(node);
        }
        for child in node.child_nodes() {
            walk(child, predicate, out);
        }
    }

    let mut out = Vec::new();
    walk(node, &predicate, &mut out);
    out
}

/// Nodes of exactly the given type tag.
pub fn collect_kind<'a>(node: &'a SyntaxNode, kind: &str) -> Vec<&'a SyntaxNode> {
    collect(node, |n| n.kind() == kind)
}

/// Lines of `text` whose trimmed content is not empty.
pub fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').filter(|line| !line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tokens() -> Vec<Token> {
        vec![
            Token::keyword("int"),
            Token::identifier("x"),
            Token::other("="),
            Token::literal("1"),
            Token::other(";"),
            Token::identifier("y"),
        ]
    }

    #[test]
    fn test_token_filters_preserve_order() {
        let tokens = sample_tokens();
        let ids: Vec<_> = identifiers(&tokens).map(|t| t.value.as_str()).collect();
        assert_eq!(ids, ["x", "y"]);
        assert_eq!(keywords(&tokens).count(), 1);
        assert_eq!(literals(&tokens).next().unwrap().value, "1");
    }

    #[test]
    fn test_children_flattens_lists() {
        let node = SyntaxNode::new("MethodDeclaration")
            .with_child(Child::Value("f".into()))
            .with_field(
                "parameters",
                Child::List(vec![
                    SyntaxNode::new("FormalParameter"),
                    SyntaxNode::new("SpreadParameter"),
                ]),
            )
            .with_field("body", Child::Node(SyntaxNode::new("Block")));

        let kinds: Vec<_> = children(&node)
            .into_iter()
            .map(|c| match c {
                ChildRef::Node(n) => n.kind().to_string(),
                ChildRef::Value(v) => format!("={v}"),
            })
            .collect();
        assert_eq!(kinds, ["=f", "FormalParameter", "SpreadParameter", "Block"]);
        assert_eq!(node.child_nodes().count(), 3);
    }

    #[test]
    fn test_field_lookup_by_name() {
        let node = SyntaxNode::new("MethodDeclaration")
            .with_field("name", Child::Value("f".into()))
            .with_field("parameters", Child::List(Vec::new()));

        assert_eq!(node.field("parameters").map(Child::node_count), Some(0));
        assert_eq!(node.field("name"), Some(&Child::Value("f".into())));
        assert!(node.field("body").is_none());
    }

    #[test]
    fn test_repeated_field_becomes_list() {
        let mut node = SyntaxNode::new("LocalVariableDeclaration");
        node.push_field("declarator", Child::Node(SyntaxNode::new("VariableDeclarator")));
        node.push_field("declarator", Child::Node(SyntaxNode::new("VariableDeclarator")));
        node.push_field("declarator", Child::Node(SyntaxNode::new("VariableDeclarator")));

        assert_eq!(node.slots().len(), 1);
        assert_eq!(node.field("declarator").map(Child::node_count), Some(3));
    }

    #[test]
    fn test_repeated_value_field_keeps_first() {
        let mut node = SyntaxNode::new("ArrayType");
        node.push_field("dimensions", Child::Value("[]".into()));
        node.push_field("dimensions", Child::Value("[][]".into()));

        assert_eq!(node.field("dimensions"), Some(&Child::Value("[]".into())));
        assert_eq!(node.slots().len(), 2);
        let values: Vec<_> = children(&node)
            .into_iter()
            .filter_map(|c| match c {
                ChildRef::Value(v) => Some(v.to_string()),
                ChildRef::Node(_) => None,
            })
            .collect();
        assert_eq!(values, ["[]", "[][]"]);
    }

    #[test]
    fn test_node_then_list_field_merges() {
        let mut node = SyntaxNode::new("Call");
        node.push_field("arg", Child::Node(SyntaxNode::new("Identifier")));
        node.push_field(
            "arg",
            Child::List(vec![SyntaxNode::new("Literal"), SyntaxNode::new("Literal")]),
        );

        assert_eq!(node.slots().len(), 1);
        assert_eq!(node.field("arg").map(Child::node_count), Some(3));
    }

    #[test]
    fn test_collect_pre_order() {
        let tree = SyntaxNode::new("A")
            .with_child(Child::Node(
                SyntaxNode::new("B").with_child(Child::Node(SyntaxNode::new("A"))),
            ))
            .with_child(Child::Node(SyntaxNode::new("A")));

        let all: Vec<_> = collect(&tree, |_| true).iter().map(|n| n.kind()).collect();
        assert_eq!(all, ["A", "B", "A", "A"]);
        assert_eq!(collect_kind(&tree, "A").len(), 3);
        assert!(collect_kind(&tree, "C").is_empty());
    }

    #[test]
    fn test_non_empty_lines() {
        let lines: Vec<_> = non_empty_lines("a\n\n   \n\tb\n").collect();
        assert_eq!(lines, ["a", "\tb"]);
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("missing `;`", Some(Location::new(3, 7)));
        assert_eq!(err.to_string(), "missing `;` at 3:7");
        let err = ParseError::new("parser unavailable", None);
        assert_eq!(err.to_string(), "parser unavailable");
    }
}
