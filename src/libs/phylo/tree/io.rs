use super::Tree;
use crate::libs::phylo::error::TreeError;
use crate::libs::phylo::node::{AttrValue, Node, NodeId};
use crate::libs::phylo::parser;
use indexmap::IndexSet;
use regex::Regex;
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

/// Output format for a list of trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One tree per line, attributes as NHX comments
    Newick,
    /// A `trees` block with a translate table, attributes as BEAST comments
    Nexus,
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newick" | "nwk" => Ok(Format::Newick),
            "nexus" | "nex" => Ok(Format::Nexus),
            _ => Err(anyhow::anyhow!("Unknown tree format: {}", s)),
        }
    }
}

/// Read trees from a file, Newick or Nexus.
///
/// # Arguments
/// * `infile` - Path to the input file (or "stdin" for stdin).
pub fn from_file(infile: &str) -> anyhow::Result<Vec<Tree>> {
    let mut reader = intspan::reader(infile);
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| anyhow::anyhow!("Read error: {}", e))?;
    Ok(from_str(&text)?)
}

/// Parse trees from text, detecting Nexus by its `#NEXUS` header.
pub fn from_str(text: &str) -> Result<Vec<Tree>, TreeError> {
    let head = text.trim_start();
    let is_nexus = head
        .as_bytes()
        .get(..6)
        .is_some_and(|h| h.eq_ignore_ascii_case(b"#nexus"));
    if is_nexus {
        parse_nexus(text)
    } else {
        parser::parse_newick_multi(text)
    }
}

/// Split on `;`, ignoring semicolons inside comments or quotes.
fn statements(text: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' => depth += 1,
                ']' => depth -= 1,
                ';' if depth == 0 => {
                    result.push(text[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        result.push(rest);
    }
    result
}

fn unquote_label(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        s[1..s.len() - 1].replace("''", "'")
    } else if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].replace("\"\"", "\"")
    } else {
        s.to_string()
    }
}

fn nexus_error(message: &str) -> TreeError {
    TreeError::ParseError {
        message: message.to_string(),
        line: 0,
        column: 0,
        snippet: String::new(),
    }
}

/// Parse the `trees` block of a Nexus document.
///
/// Tip labels found in a `translate` table are replaced by their taxon
/// names. Leading `[&R]`/`[&U]` markers are dropped.
pub fn parse_nexus(text: &str) -> Result<Vec<Tree>, TreeError> {
    let re_begin = Regex::new(r"(?i)begin\s+trees\s*;").map_err(|e| nexus_error(&e.to_string()))?;
    let re_tree =
        Regex::new(r"(?is)^u?tree\s+\*?\s*[^=]*=\s*(.*)$").map_err(|e| nexus_error(&e.to_string()))?;

    let block_start = re_begin
        .find(text)
        .ok_or_else(|| nexus_error("No trees block found in Nexus input"))?
        .end();

    let mut translate: HashMap<String, String> = HashMap::new();
    let mut trees = Vec::new();

    for stmt in statements(&text[block_start..]) {
        let keyword = stmt
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        match keyword.as_str() {
            "end" | "endblock" => break,
            "translate" => {
                let body = stmt["translate".len()..].trim();
                for entry in parser::split_top_level(body, ',') {
                    let entry = entry.trim();
                    if entry.is_empty() {
                        continue;
                    }
                    let (key, label) = entry
                        .split_once(char::is_whitespace)
                        .ok_or_else(|| nexus_error(&format!("Bad translate entry: {}", entry)))?;
                    translate.insert(key.to_string(), unquote_label(label));
                }
            }
            _ => {
                let caps = match re_tree.captures(stmt) {
                    Some(c) => c,
                    None => continue,
                };
                let mut newick = caps.get(1).map_or("", |m| m.as_str()).trim();
                while newick.starts_with('[') {
                    match newick.find(']') {
                        Some(end) => newick = newick[end + 1..].trim_start(),
                        None => break,
                    }
                }

                let mut tree = parser::parse_newick(&format!("{};", newick))?;
                if !translate.is_empty() {
                    for node in tree.nodes.iter_mut().filter(|n| n.children.is_empty()) {
                        if let Some(name) = node.name.as_ref().and_then(|n| translate.get(n)) {
                            node.name = Some(name.clone());
                        }
                    }
                }
                trees.push(tree);
            }
        }
    }

    Ok(trees)
}

/// How node labels and comments are written.
struct Style<'a> {
    indent: &'a str,
    beast: bool,
    translate: Option<&'a IndexSet<String>>,
}

/// Serialize tree to Newick string.
pub fn to_newick(tree: &Tree) -> String {
    to_newick_with_format(tree, "")
}

/// Serialize tree to Newick string, indenting nested clades with `indent`
/// (empty for a single line).
pub fn to_newick_with_format(tree: &Tree, indent: &str) -> String {
    match tree.get_root() {
        Some(root) => to_newick_subtree(tree, root, indent),
        None => ";".to_string(),
    }
}

/// Serialize a specific subtree to a Newick string.
pub fn to_newick_subtree(tree: &Tree, root: NodeId, indent: &str) -> String {
    let style = Style {
        indent,
        beast: false,
        translate: None,
    };
    let mut s = to_newick_recursive(tree, root, &style, 0);
    s.push(';');
    s
}

/// Serialize trees as one Nexus document.
///
/// Tip names go into a translate table in order of first appearance; the
/// tree descriptions refer to tips by their 1-based index.
pub fn to_nexus(trees: &[Tree]) -> String {
    let mut labels: IndexSet<String> = IndexSet::new();
    for tree in trees {
        for name in tree.get_leaf_names().into_iter().flatten() {
            labels.insert(name);
        }
    }

    let mut s = String::from("#NEXUS\n\nBegin trees;\n");
    if !labels.is_empty() {
        s.push_str("\tTranslate\n");
        for (i, label) in labels.iter().enumerate() {
            s.push_str(&format!("\t\t{} {}", i + 1, quote_label(label)));
            if i + 1 < labels.len() {
                s.push(',');
            }
            s.push('\n');
        }
        s.push_str("\t\t;\n");
    }

    let style = Style {
        indent: "",
        beast: true,
        translate: Some(&labels),
    };
    for (i, tree) in trees.iter().enumerate() {
        if let Some(root) = tree.get_root() {
            s.push_str(&format!(
                "\ttree tree_{} = [&R] {};\n",
                i + 1,
                to_newick_recursive(tree, root, &style, 0)
            ));
        }
    }
    s.push_str("End;\n");
    s
}

/// Serialize trees in the given format.
pub fn write_trees(trees: &[Tree], format: Format) -> String {
    match format {
        Format::Newick => trees
            .iter()
            .map(|t| format!("{}\n", to_newick(t)))
            .collect(),
        Format::Nexus => to_nexus(trees),
    }
}

fn nhx_comment(node: &Node) -> String {
    let mut s = String::from("[&&NHX");
    for (k, v) in &node.attributes {
        match v {
            AttrValue::Text(t) if t.is_empty() => s.push_str(&format!(":{}", k)),
            _ => s.push_str(&format!(":{}={}", k, v)),
        }
    }
    s.push(']');
    s
}

fn beast_value(v: &AttrValue) -> String {
    match v {
        AttrValue::Text(t) => {
            let plain = !t.is_empty()
                && !t.chars().any(|c| ",=[]{}\"' :;()".contains(c))
                && t.parse::<f64>().is_err();
            if plain {
                t.clone()
            } else {
                format!("\"{}\"", t)
            }
        }
        other => other.to_string(),
    }
}

fn beast_comment(node: &Node) -> String {
    let body: Vec<String> = node
        .attributes
        .iter()
        .map(|(k, v)| format!("{}={}", k, beast_value(v)))
        .collect();
    format!("[&{}]", body.join(","))
}

fn to_newick_recursive(tree: &Tree, node_id: NodeId, style: &Style, depth: usize) -> String {
    let node = match tree.get_node(node_id) {
        Some(n) => n,
        None => return String::new(),
    };
    let is_pretty = !style.indent.is_empty();

    let my_indent = if is_pretty {
        style.indent.repeat(depth)
    } else {
        String::new()
    };

    // Label + Length + Comment
    let mut node_info = String::new();

    if let Some(name) = &node.name {
        let translated = style
            .translate
            .filter(|_| node.children.is_empty())
            .and_then(|labels| labels.get_index_of(name));
        match translated {
            Some(idx) => node_info.push_str(&(idx + 1).to_string()),
            None => node_info.push_str(&quote_label(name)),
        }
    }

    let has_attrs = !node.attributes.is_empty();
    if style.beast && has_attrs {
        node_info.push_str(&beast_comment(node));
    }
    if let Some(len) = node.length {
        node_info.push_str(&format!(":{}", len));
    }
    if !style.beast && has_attrs {
        node_info.push_str(&nhx_comment(node));
    }

    if node.children.is_empty() {
        format!("{}{}", my_indent, node_info)
    } else {
        let children_strs: Vec<String> = node
            .children
            .iter()
            .map(|&child| to_newick_recursive(tree, child, style, depth + 1))
            .collect();

        if is_pretty {
            format!(
                "{}(\n{}\n{}){}",
                my_indent,
                children_strs.join(",\n"),
                my_indent,
                node_info
            )
        } else {
            format!("({}){}", children_strs.join(","), node_info)
        }
    }
}

fn quote_label(label: &str) -> String {
    let needs_quote = label.chars().any(|c| "(),:;[]' \t\n".contains(c));
    if needs_quote {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_newick() {
        let mut tree = Tree::new();
        //    Root
        //   /    \
        //  A:0.1  B:0.2
        let n0 = tree.add_node();
        let n1 = tree.add_node();
        let n2 = tree.add_node();

        tree.set_root(n0);
        tree.attach(n1, n0).unwrap();
        tree.attach(n2, n0).unwrap();

        tree.get_node_mut(n0).unwrap().set_name("Root");
        tree.get_node_mut(n1).unwrap().set_name("A");
        tree.get_node_mut(n1).unwrap().length = Some(0.1);
        tree.get_node_mut(n2).unwrap().set_name("B");
        tree.get_node_mut(n2).unwrap().length = Some(0.2);

        assert_eq!(to_newick(&tree), "(A:0.1,B:0.2)Root;");

        let expected_pretty = "(\n  A:0.1,\n  B:0.2\n)Root;";
        assert_eq!(to_newick_with_format(&tree, "  "), expected_pretty);
    }

    #[test]
    fn test_to_newick_nested_indent() {
        let tree = Tree::from_newick("((A,B)I1,C)Root;").unwrap();
        let expected = "(\n\t(\n\t\tA,\n\t\tB\n\t)I1,\n\tC\n)Root;";
        assert_eq!(to_newick_with_format(&tree, "\t"), expected);
    }

    #[test]
    fn test_to_newick_special_chars() {
        let mut tree = Tree::new();
        let n0 = tree.create_external("Homo sapiens");
        tree.set_root(n0);
        assert_eq!(to_newick(&tree), "'Homo sapiens';");

        tree.get_node_mut(n0).unwrap().set_name("O'Brien");
        let out = to_newick(&tree);
        assert_eq!(out, "'O''Brien';");
    }

    #[test]
    fn test_to_newick_attributes() {
        let mut tree = Tree::from_newick("(A:1,B:2);").unwrap();
        let a = tree.get_node_by_name("A").unwrap();
        tree.get_node_mut(a).unwrap().set_attribute("color", "red");
        tree.get_node_mut(a).unwrap().add_tag("clade", "X");

        let out = to_newick(&tree);
        assert_eq!(out, "(A:1[&&NHX:clade={X}:color=red],B:2);");

        let back = Tree::from_newick(&out).unwrap();
        let a = back.get_node(back.get_node_by_name("A").unwrap()).unwrap();
        assert!(a.get_attribute("clade").unwrap().as_set().is_some());
    }

    #[test]
    fn test_nexus_round_trip() {
        let mut tree = Tree::from_newick("((A:1,'B b':2):0.5,C:3);").unwrap();
        let root = tree.get_root().unwrap();
        tree.get_node_mut(root).unwrap().add_tag("clade", "X");
        let c = tree.get_node_by_name("C").unwrap();
        tree.get_node_mut(c)
            .unwrap()
            .set_attribute("country", "New Zealand");

        let text = to_nexus(&[tree]);
        assert!(text.starts_with("#NEXUS"));
        assert!(text.contains("\t\t2 'B b',"));
        assert!(text.contains("3[&country=\"New Zealand\"]:3"));

        let trees = from_str(&text).unwrap();
        assert_eq!(trees.len(), 1);
        let back = &trees[0];
        let names: Vec<String> = back.get_leaf_names().into_iter().flatten().collect();
        assert_eq!(names, vec!["A", "B b", "C"]);
        let c = back.get_node(back.get_node_by_name("C").unwrap()).unwrap();
        assert_eq!(
            c.get_attribute("country"),
            Some(&AttrValue::Text("New Zealand".to_string()))
        );
        let root = back.get_node(back.get_root().unwrap()).unwrap();
        assert!(root.get_attribute("clade").unwrap().has("X"));
    }

    #[test]
    fn test_nexus_translate_quoted_comma() {
        let tree = Tree::from_newick("('Cardiff, UK':1,B:2);").unwrap();
        let text = to_nexus(&[tree]);
        assert!(text.contains("\t\t1 'Cardiff, UK',"));

        let trees = from_str(&text).unwrap();
        let names: Vec<String> = trees[0].get_leaf_names().into_iter().flatten().collect();
        assert_eq!(names, vec!["Cardiff, UK", "B"]);
    }

    #[test]
    fn test_from_str_non_ascii_first_label() {
        let trees = from_str("(αβγ:1,B:2);").unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].to_newick(), "(αβγ:1,B:2);");

        let trees = from_str("#nexus\nbegin trees;\ntree t = (α,β);\nend;\n").unwrap();
        assert_eq!(trees[0].to_newick(), "(α,β);");
    }

    #[test]
    fn test_parse_nexus_beast() {
        let text = "#NEXUS\n\
            Begin taxa;\n\tDimensions ntax=2;\nEnd;\n\
            BEGIN TREES;\n\
            \tTRANSLATE\n\t\t1 A,\n\t\t2 B\n;\n\
            \tTREE STATE_0 = [&U] (1:1,2[&height=0]:2);\n\
            \ttree second = (2,1);\n\
            END;\n";
        let trees = parse_nexus(text).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].to_newick(), "(A:1,B:2[&&NHX:height=0]);");
        assert_eq!(trees[1].to_newick(), "(B,A);");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("nexus".parse::<Format>().unwrap(), Format::Nexus);
        assert_eq!("Newick".parse::<Format>().unwrap(), Format::Newick);
        assert!("phylip".parse::<Format>().is_err());
    }
}
