use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// NodeId is an index into the Tree's node vector.
/// It is lightweight (Copy) and safe (no pointers).
pub type NodeId = usize;

/// Value of a node attribute.
///
/// Comments in tree files carry either free text or numbers. `Set` holds
/// accumulated clade tags, e.g. the values a node was found monophyletic for.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Set(BTreeSet<String>),
}

impl AttrValue {
    /// Interpret a raw comment value.
    ///
    /// ```
    /// use clade::libs::phylo::node::AttrValue;
    /// assert_eq!(AttrValue::parse("0.5"), AttrValue::Number(0.5));
    /// assert_eq!(AttrValue::parse("\"B.1\""), AttrValue::Text("B.1".to_string()));
    /// assert_eq!(AttrValue::parse("{X,Y}").as_set().map(|s| s.len()), Some(2));
    /// ```
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let set = inner
                .split(',')
                .map(|e| unquote(e.trim()).to_string())
                .filter(|e| !e.is_empty())
                .collect();
            return AttrValue::Set(set);
        }
        if raw.starts_with('"') || raw.starts_with('\'') {
            return AttrValue::Text(unquote(raw).to_string());
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => AttrValue::Number(v),
            _ => AttrValue::Text(raw.to_string()),
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            AttrValue::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value is, or contains, `value`.
    pub fn has(&self, value: &str) -> bool {
        match self {
            AttrValue::Set(s) => s.contains(value),
            other => other.to_string() == value,
        }
    }
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::Number(v) => write!(f, "{}", v),
            AttrValue::Set(s) => {
                write!(f, "{{")?;
                for (i, e) in s.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(v)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier for the node (index in the arena)
    pub id: NodeId,

    /// Parent node ID (None for root)
    pub parent: Option<NodeId>,

    /// List of child node IDs, in output order
    pub children: Vec<NodeId>,

    // --- Payload ---

    /// Taxon name for tips, optional label (e.g. support) for internal nodes
    pub name: Option<String>,

    /// Branch length to parent
    /// In rooted trees, edge length is an attribute of the child node.
    /// `None` is read as 0.0 by every distance computation.
    pub length: Option<f64>,

    /// Annotations from tree comments ([&&NHX:k=v] or [&k=v])
    /// Using BTreeMap ensures deterministic output order.
    pub attributes: BTreeMap<String, AttrValue>,

    /// Soft deletion flag.
    /// If true, this node is considered removed.
    /// Use Tree::compact() to permanently remove deleted nodes and reclaim memory.
    pub deleted: bool,
}

impl Node {
    /// Create a new empty node with a specific ID
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            name: None,
            length: None,
            attributes: BTreeMap::new(),
            deleted: false,
        }
    }

    /// Set the name of the node
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Set the name of the node (builder pattern)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the branch length
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    /// Branch length, with a missing length read as zero
    pub fn edge(&self) -> f64 {
        self.length.unwrap_or(0.0)
    }

    /// Set an attribute, replacing any previous value
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn get_attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Add `tag` to the set stored under `key`.
    /// A non-set value already present becomes the first member of the set.
    pub fn add_tag(&mut self, key: &str, tag: &str) {
        let entry = self
            .attributes
            .entry(key.to_string())
            .or_insert_with(|| AttrValue::Set(BTreeSet::new()));
        if let AttrValue::Set(set) = entry {
            set.insert(tag.to_string());
        } else {
            let mut set = BTreeSet::new();
            set.insert(entry.to_string());
            set.insert(tag.to_string());
            *entry = AttrValue::Set(set);
        }
    }

    /// Check if the node is a leaf (no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
