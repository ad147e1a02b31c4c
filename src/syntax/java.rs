//! Java front end using tree-sitter.

use std::cell::RefCell;

use tree_sitter::{Node, Parser, Tree};

use super::{Child, Frontend, Location, ParseError, SyntaxNode, Token, TokenKind};

// Thread-local parser caching to avoid re-initialization overhead. Batch
// workers each get their own parser, nothing is shared across threads.
thread_local! {
    static JAVA_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn init_java_parser() -> Result<Parser, ParseError> {
    let mut p = Parser::new();
    p.set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| ParseError::new(format!("failed to initialize java parser: {e}"), None))?;
    Ok(p)
}

fn with_java_parser<F, R>(f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut Parser) -> R,
{
    JAVA_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let mut parser = match slot.take() {
            Some(parser) => parser,
            None => init_java_parser()?,
        };
        let result = f(&mut parser);
        *slot = Some(parser);
        Ok(result)
    })
}

/// Reserved words, primitive types and modifiers.
const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "void", "volatile", "while",
];

const LITERAL_KINDS: &[&str] = &[
    "decimal_integer_literal",
    "hex_integer_literal",
    "octal_integer_literal",
    "binary_integer_literal",
    "decimal_floating_point_literal",
    "hex_floating_point_literal",
    "character_literal",
    "string_literal",
    "text_block",
    "true",
    "false",
    "null_literal",
];

/// Deepest concrete tree accepted, counted in tree-sitter levels below the root.
///
/// Conversion and feature extraction recurse once per level, so anything
/// deeper is rejected as a parse error before a [`SyntaxNode`] is built.
pub const MAX_TREE_DEPTH: usize = 2048;

/// Wrapper nodes whose named children become a single list slot on the parent.
const SEQUENCE_KINDS: &[&str] = &["formal_parameters"];

fn is_comment(kind: &str) -> bool {
    matches!(kind, "line_comment" | "block_comment")
}

fn is_literal(kind: &str) -> bool {
    LITERAL_KINDS.contains(&kind)
}

fn node_text<'a>(node: Node, content: &'a str) -> &'a str {
    &content[node.byte_range()]
}

/// `method_declaration` -> `MethodDeclaration`.
fn type_tag(kind: &str) -> String {
    kind.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Tokenizer and parser for Java source.
///
/// # Examples
///
/// ```
/// use codestyle::syntax::{Frontend, JavaFrontend};
///
/// let (tokens, tree) = JavaFrontend.analyze("class A { void f() {} }").unwrap();
/// assert_eq!(tree.kind(), "Program");
/// assert!(tokens.iter().any(|t| t.value == "void"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaFrontend;

impl JavaFrontend {
    fn parse_checked(content: &str) -> Result<Tree, ParseError> {
        let tree = with_java_parser(|parser| parser.parse(content, None))?
            .ok_or_else(|| ParseError::new("parser returned no tree", None))?;

        if let Some(bad) = first_error(tree.root_node()) {
            let point = bad.start_position();
            let location = Some(Location::new(point.row + 1, point.column + 1));
            let message = if bad.is_missing() {
                format!("missing `{}`", bad.kind())
            } else {
                let text: String = node_text(bad, content).chars().take(24).collect();
                format!("unexpected `{}`", text.trim())
            };
            return Err(ParseError::new(message, location));
        }

        if let Some(deep) = too_deep(tree.root_node(), MAX_TREE_DEPTH) {
            let point = deep.start_position();
            return Err(ParseError::new(
                format!("nesting deeper than {MAX_TREE_DEPTH} levels"),
                Some(Location::new(point.row + 1, point.column + 1)),
            ));
        }

        Ok(tree)
    }
}

impl Frontend for JavaFrontend {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, ParseError> {
        let tree = Self::parse_checked(text)?;
        let mut tokens = Vec::new();
        collect_tokens(tree.root_node(), text, &mut tokens);
        Ok(tokens)
    }

    fn parse(&self, text: &str) -> Result<SyntaxNode, ParseError> {
        let tree = Self::parse_checked(text)?;
        Ok(convert(tree.root_node(), text))
    }

    fn analyze(&self, text: &str) -> Result<(Vec<Token>, SyntaxNode), ParseError> {
        let tree = Self::parse_checked(text)?;
        let mut tokens = Vec::new();
        collect_tokens(tree.root_node(), text, &mut tokens);
        Ok((tokens, convert(tree.root_node(), text)))
    }
}

/// First `ERROR` or `MISSING` node in document order.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        // Subtrees without errors are skipped whole.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// First node more than `limit` levels below `root`, found without recursion.
fn too_deep(root: Node<'_>, limit: usize) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        if cursor.goto_first_child() {
            depth += 1;
            if depth > limit {
                return Some(cursor.node());
            }
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
            depth -= 1;
        }
    }
}

fn collect_tokens(node: Node, content: &str, tokens: &mut Vec<Token>) {
    let kind = node.kind();
    if is_comment(kind) {
        return;
    }
    if is_literal(kind) {
        tokens.push(Token::literal(node_text(node, content)));
        return;
    }
    if node.child_count() == 0 {
        let text = node_text(node, content);
        let token_kind = match kind {
            "identifier" | "type_identifier" => TokenKind::Identifier,
            _ if KEYWORDS.contains(&text) => TokenKind::Keyword,
            _ => TokenKind::Other,
        };
        tokens.push(Token::new(token_kind, text));
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_tokens(child, content, tokens);
    }
}

fn convert(node: Node, content: &str) -> SyntaxNode {
    let mut out = SyntaxNode::new(type_tag(node.kind()));

    if is_literal(node.kind()) {
        out.push(Child::Value(node_text(node, content).to_string()));
        return out;
    }

    let mut cursor = node.walk();
    if !cursor.goto_first_child() {
        return out;
    }
    loop {
        let child = cursor.node();
        if child.is_named() && !is_comment(child.kind()) {
            let slot = convert_slot(child, content);
            match cursor.field_name() {
                Some(field) => out.push_field(field, slot),
                None => out.push(slot),
            }
        }
        if !cursor.goto_next_sibling() {
            break;
        }
    }
    out
}

fn convert_slot(node: Node, content: &str) -> Child {
    let kind = node.kind();
    if SEQUENCE_KINDS.contains(&kind) {
        let mut cursor = node.walk();
        let items = node
            .named_children(&mut cursor)
            .filter(|c| !is_comment(c.kind()))
            .map(|c| convert(c, content))
            .collect();
        return Child::List(items);
    }
    if !is_literal(kind) && node.child_count() == 0 {
        return Child::Value(node_text(node, content).to_string());
    }
    Child::Node(convert(node, content))
}
