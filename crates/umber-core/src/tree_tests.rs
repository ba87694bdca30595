//! Unit tests for tree nodes and the JSON interchange form.

use indoc::indoc;

use crate::{Node, Num};

#[test]
fn builder_and_access() {
    let n = Node::new("assign")
        .attr("line", "3")
        .child(Node::new("obj1").child(Node::new("sym").attr("val", "a")))
        .child(Node::new("int").attr("val", "5").attr("line", "3"));

    assert_eq!(n.tag, "assign");
    assert_eq!(n.line(), 3);
    assert_eq!(n.children.len(), 2);
    assert_eq!(n.children[0].children[0].val(), "a");
}

#[test]
fn shell_drops_children() {
    let n = Node::new("add").attr("line", "1").child(Node::new("int").attr("val", "2"));
    let s = n.shell();
    assert_eq!(s.tag, "add");
    assert_eq!(s.get("line"), Some("1"));
    assert!(s.children.is_empty());
}

#[test]
fn num_predicates() {
    let i = Node::new("int").attr("val", "0x10");
    assert!(i.is_num());
    assert_eq!(i.num(), Some(Num::Int(16)));

    let f = Node::new("float").attr("val", "2.5");
    assert_eq!(f.num(), Some(Num::Float(2.5)));

    assert!(!Node::new("str").attr("val", "x").is_num());
    assert!(Node::new("int").attr("val", "0").num_eq(Num::Int(0)));
    assert!(!Node::new("int").attr("val", "0").num_eq(Num::Float(0.0)));
}

#[test]
fn from_num_keeps_type() {
    let n = Node::from_num(Num::Float(3.0), 7);
    assert_eq!(n.tag, "float");
    assert_eq!(n.val(), "3.0");
    assert_eq!(n.line(), 7);

    let n = Node::from_num(Num::Int(-8), 1);
    assert_eq!(n.tag, "int");
    assert_eq!(n.val(), "-8");
}

#[test]
fn json_round_trip_preserves_order() {
    let text = indoc! {r#"
        {
          "tag": "module",
          "attrs": { "val": "m", "line": "1" },
          "children": [
            { "tag": "int", "attrs": { "val": "1", "line": "2" } },
            { "tag": "nil", "attrs": { "line": "3" } }
          ]
        }
    "#};

    let n: Node = serde_json::from_str(text).unwrap();
    assert_eq!(n.val(), "m");
    assert_eq!(n.children[1].tag, "nil");

    let keys: Vec<_> = n.attrs.keys().cloned().collect();
    assert_eq!(keys, vec!["val", "line"]);

    let back = serde_json::to_string(&n).unwrap();
    let again: Node = serde_json::from_str(&back).unwrap();
    assert_eq!(n, again);
}
