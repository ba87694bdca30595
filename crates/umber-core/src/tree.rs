//! The tagged tree node shared by every pass.

use indexmap::IndexMap;

use crate::num::{self, Num};

/// A tagged tree node: tag, ordered attribute map, ordered children.
///
/// Syntactic nodes carry a `line` attribute; literal nodes (`int`, `float`,
/// `bool`, `str`) and `sym` nodes carry `val`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub tag: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn attr(mut self, name: impl Into<String>, val: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), val.into());
        self
    }

    /// Builder-style child appender.
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Copy tag and attributes without children.
    pub fn shell(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, val: impl Into<String>) {
        self.attrs.insert(name.into(), val.into());
    }

    /// The `val` attribute; panics if absent (front-end contract).
    pub fn val(&self) -> &str {
        self.get("val")
            .unwrap_or_else(|| panic!("{} node without val attribute", self.tag))
    }

    /// Source line for diagnostics. Zero when the front-end omitted it.
    pub fn line(&self) -> u32 {
        self.get("line").and_then(|s| s.parse().ok()).unwrap_or(0)
    }

    /// Whether this is an `int` or `float` literal.
    pub fn is_num(&self) -> bool {
        self.tag == "int" || self.tag == "float"
    }

    /// Numeric value of an `int`/`float` literal node.
    pub fn num(&self) -> Option<Num> {
        match self.tag.as_str() {
            "int" => Some(Num::Int(num::parse_int(self.val()))),
            "float" => Some(Num::Float(num::parse_float(self.val()))),
            _ => None,
        }
    }

    /// Literal node for a numeric value, tagged `int` or `float`.
    pub fn from_num(n: Num, line: u32) -> Self {
        let (tag, val) = match n {
            Num::Int(v) => ("int", v.to_string()),
            Num::Float(v) => ("float", num::render_float(v)),
        };
        Node::new(tag).attr("val", val).attr("line", line.to_string())
    }

    /// Whether this node is a numeric literal equal to `n` of the same type.
    pub fn num_eq(&self, n: Num) -> bool {
        match (self.tag.as_str(), n) {
            ("int", Num::Int(v)) => num::parse_int(self.val()) == v,
            ("float", Num::Float(v)) => num::parse_float(self.val()) == v,
            _ => false,
        }
    }
}
