use super::error::TreeError;
use super::node::{AttrValue, NodeId};
use super::tree::{ops, Tree};
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map, map_res, opt, recognize},
    error::{context, ContextError, ErrorKind, FromExternalError, ParseError},
    multi::{many1, separated_list1},
    sequence::{delimited, preceded},
    IResult, Offset, Parser,
};
use std::collections::BTreeMap;

type Attributes = BTreeMap<String, AttrValue>;

// ================================================================================================
// Error Handling Structures
// ================================================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum DetailedErrorKind {
    Context(&'static str),
    Nom(ErrorKind),
}

/// A nom error that keeps every context it passed through, innermost first.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailedError<'a> {
    pub errors: Vec<(&'a str, DetailedErrorKind)>,
}

impl<'a> ParseError<&'a str> for DetailedError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }

    fn append(input: &'a str, kind: ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Nom(kind)));
        other
    }
}

impl<'a> ContextError<&'a str> for DetailedError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Context(ctx)));
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for DetailedError<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }
}

// ================================================================================================
// Intermediate Structure
// ================================================================================================

/// Recursive parse result, flattened into the `Tree` arena by `to_tree`.
#[derive(Debug, Default)]
struct ParsedNode {
    name: Option<String>,
    length: Option<f64>,
    attributes: Attributes,
    children: Vec<ParsedNode>,
}

impl ParsedNode {
    /// Moves this node and its descendants into the arena, children in
    /// source order. Returns the id of this node.
    fn to_tree(self, tree: &mut Tree) -> NodeId {
        let id = tree.add_node();
        for child in self.children {
            let child_id = child.to_tree(tree);
            ops::link(tree, child_id, id);
        }
        if let Some(node) = tree.get_node_mut(id) {
            node.name = self.name;
            node.length = self.length;
            node.attributes = self.attributes;
        }
        id
    }

    fn into_tree(self) -> Tree {
        let mut tree = Tree::new();
        let root_id = self.to_tree(&mut tree);
        tree.set_root(root_id);
        tree
    }
}

// ================================================================================================
// Parsers
// ================================================================================================

// Wraps a parser and ignores surrounding whitespace (spaces, tabs, newlines).
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

// Node label: unquoted (up to a reserved char), 'single' or "double" quoted.
// A doubled quote inside a quoted label stands for one quote.
fn parse_label(input: &str) -> IResult<&str, String, DetailedError<'_>> {
    let unquoted = map(
        take_while(|c: char| !"():;,[]".contains(c)),
        |s: &str| s.trim().to_string(),
    );

    let single_quoted = delimited(
        char('\''),
        map(is_not("'"), |s: &str| s.replace("''", "'")),
        char('\''),
    );

    let double_quoted = delimited(
        char('"'),
        map(is_not("\""), |s: &str| s.replace("\"\"", "\"")),
        char('"'),
    );

    context("label", alt((single_quoted, double_quoted, unquoted))).parse(input)
}

// Branch length after a colon, scientific notation allowed.
fn parse_length(input: &str) -> IResult<&str, f64, DetailedError<'_>> {
    context(
        "length",
        preceded(
            ws(char(':')),
            // A ':' commits us to a number
            cut(map_res(
                recognize((
                    opt(char('-')),
                    digit1,
                    opt((char('.'), digit1)),
                    opt((
                        alt((char('e'), char('E'))),
                        opt(alt((char('+'), char('-')))),
                        digit1,
                    )),
                )),
                |s: &str| s.parse::<f64>(),
            )),
        ),
    )
    .parse(input)
}

/// Split `s` on `sep`, ignoring separators inside braces or quotes.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '{' => depth += 1,
                '}' => depth -= 1,
                _ if c == sep && depth == 0 => {
                    parts.push(&s[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Attributes carried by the body of a `[...]` comment.
///
/// * NHX: `&&NHX:S=human:E=1.5`
/// * BEAST: `&clade={B.1,B.1.1},height=0.5`
/// * plain: `S=Gorilla T=9606`
///
/// Anything else is an ordinary comment and yields nothing.
pub fn parse_attributes(body: &str) -> Attributes {
    let mut attrs = Attributes::new();

    let (pairs, keep_bare): (Vec<&str>, bool) = if let Some(rest) = body.strip_prefix("&&NHX") {
        (rest.split(':').collect(), true)
    } else if let Some(rest) = body.strip_prefix('&') {
        (split_top_level(rest, ','), false)
    } else {
        (body.split_whitespace().collect(), false)
    };

    for part in pairs {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((k, v)) => {
                attrs.insert(k.trim().to_string(), AttrValue::parse(v));
            }
            None if keep_bare => {
                attrs.insert(part.to_string(), AttrValue::Text(String::new()));
            }
            None => {}
        }
    }

    attrs
}

// Optional `[...]` comment, reduced to its attributes.
fn parse_comment(input: &str) -> IResult<&str, Attributes, DetailedError<'_>> {
    let comment_content = delimited(ws(char('[')), is_not("]"), char(']'));

    context(
        "comment",
        map(opt(comment_content), |content: Option<&str>| {
            content.map(parse_attributes).unwrap_or_default()
        }),
    )
    .parse(input)
}

// (child1,child2,...)Label[comment]:Length[comment]
fn parse_subtree(input: &str) -> IResult<&str, ParsedNode, DetailedError<'_>> {
    let (input, children) = context(
        "children",
        opt(delimited(
            ws(char('(')),
            separated_list1(ws(char(',')), parse_subtree),
            ws(char(')')),
        )),
    )
    .parse(input)?;

    let (input, label) = opt(parse_label).parse(input)?;

    // Comments may sit before or after the length
    let (input, comment1) = parse_comment(input)?;
    let (input, length) = opt(parse_length).parse(input)?;
    let (input, comment2) = parse_comment(input)?;

    let mut node = ParsedNode {
        children: children.unwrap_or_default(),
        name: label.filter(|l| !l.is_empty()),
        length,
        attributes: comment1,
    };
    node.attributes.extend(comment2);

    Ok((input, node))
}

// ================================================================================================
// Entry Points
// ================================================================================================

/// Parses a single Newick tree, which must end with ';'.
pub fn parse_newick(input: &str) -> Result<Tree, TreeError> {
    let mut parser = (ws(parse_subtree), ws(char(';')));

    match parser.parse(input) {
        Ok((_, (root_node, _))) => Ok(root_node.into_tree()),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(make_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(incomplete()),
    }
}

/// Parses every tree in a string.
///
/// Top-level `[...]` blocks between trees, such as file headers or `[&R]`
/// markers, are skipped.
pub fn parse_newick_multi(input: &str) -> Result<Vec<Tree>, TreeError> {
    let valid_tree = map((ws(parse_subtree), ws(char(';'))), |(root, _)| Some(root));

    let garbage = map(
        ws(delimited(char('['), take_while(|c| c != ']'), char(']'))),
        |_| None,
    );

    let mut parser = many1(alt((valid_tree, garbage)));

    match parser.parse(input) {
        Ok((_, trees_data)) => Ok(trees_data
            .into_iter()
            .flatten()
            .map(ParsedNode::into_tree)
            .collect()),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(make_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(incomplete()),
    }
}

fn incomplete() -> TreeError {
    TreeError::ParseError {
        message: "Incomplete input".to_string(),
        line: 0,
        column: 0,
        snippet: "".to_string(),
    }
}

// nom error -> TreeError with line/column of the innermost failure
fn make_tree_error(input: &str, e: DetailedError) -> TreeError {
    let remaining = match e.errors.first() {
        Some((remaining, _)) => *remaining,
        None => input,
    };
    let offset = input.offset(remaining);

    let prefix = &input[..offset];
    let line = prefix.chars().filter(|&c| c == '\n').count() + 1;
    let last_newline = prefix.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let column = offset - last_newline + 1;

    let mut msg = String::new();
    for (_, kind) in e.errors.iter().rev() {
        match kind {
            DetailedErrorKind::Context(ctx) => {
                msg.push_str(&format!("while parsing {}:\n", ctx));
            }
            DetailedErrorKind::Nom(k) => {
                msg.push_str(&format!("  error: {:?}\n", k));
            }
        }
    }

    TreeError::ParseError {
        message: msg,
        line,
        column,
        snippet: remaining.chars().take(50).collect(),
    }
}

impl Tree {
    /// Parse a Newick string into a Tree.
    ///
    /// # Example
    /// ```
    /// use clade::libs::phylo::tree::Tree;
    ///
    /// let tree = Tree::from_newick("(A:0.1,B:0.2)Root;").unwrap();
    /// assert_eq!(tree.len(), 3);
    ///
    /// let result = Tree::from_newick("(A,B:invalid)C;");
    /// assert!(result.is_err());
    /// ```
    pub fn from_newick(input: &str) -> Result<Self, TreeError> {
        parse_newick(input)
    }

    pub fn from_newick_multi(input: &str) -> Result<Vec<Self>, TreeError> {
        parse_newick_multi(input)
    }
}
