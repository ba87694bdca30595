//! Interface declarations and structural conformance checks.
//!
//! An interface lists parent interfaces, method/classmethod declarations,
//! and class-variable requirements. Conformance is checked structurally
//! against the class body; mismatches produce diagnostics but never stop
//! compilation.

use indexmap::IndexMap;
use umber_core::Node;

use crate::diagnostics::DiagnosticKind;

use super::Gen;

/// Declarations collected from one scan of a class body.
pub(super) struct ClassInfo {
    pub methods: IndexMap<String, Node>,
    pub clmethods: IndexMap<String, Node>,
    pub clvars: Vec<String>,
}

/// Collect declared methods, class methods, and class variables from a
/// class node's body (child 3).
pub(super) fn class_scan(nd: &Node) -> ClassInfo {
    let mut info = ClassInfo {
        methods: IndexMap::new(),
        clmethods: IndexMap::new(),
        clvars: Vec::new(),
    };
    for c in &nd.children[3].children {
        match c.tag.as_str() {
            "method" => {
                let decl = &c.children[0];
                info.methods
                    .insert(decl.children[0].val().to_string(), decl.clone());
            }
            "clmethod" => {
                let decl = &c.children[0];
                info.clmethods
                    .insert(decl.children[0].val().to_string(), decl.clone());
            }
            t if t.starts_with("assign1") => {
                info.clvars
                    .push(c.children[0].children[0].val().to_string());
            }
            _ => {}
        }
    }
    info
}

/// Structural match of two declaration nodes: equal tags, equal attributes
/// except `line`, equal arity, recursive children match. Parameter names do
/// not matter, so `val` is ignored on `sym` nodes.
fn decl_match(a: &Node, b: &Node) -> bool {
    if a.tag != b.tag {
        return false;
    }
    let strip = |nd: &Node| {
        let mut attrs = nd.attrs.clone();
        attrs.shift_remove("line");
        if nd.tag == "sym" {
            attrs.shift_remove("val");
        }
        attrs
    };
    if strip(a) != strip(b) {
        return false;
    }
    if a.children.len() != b.children.len() {
        return false;
    }
    a.children
        .iter()
        .zip(&b.children)
        .all(|(ca, cb)| decl_match(ca, cb))
}

impl Gen {
    pub(super) fn iface_decl(&mut self, nd: &Node) {
        self.ifaces
            .insert(nd.children[0].val().to_string(), nd.clone());
    }

    /// Check that a class satisfies one interface, recursing through the
    /// interface's parents.
    pub(super) fn check_implements(
        &mut self,
        class_nd: &Node,
        info: &ClassInfo,
        iface_name: &str,
    ) -> bool {
        let class = class_nd.children[0].val().to_string();
        let line = class_nd.line();
        let Some(iface) = self.ifaces.get(iface_name).cloned() else {
            self.diags
                .push(line, DiagnosticKind::UnknownInterface(iface_name.to_string()));
            return false;
        };

        let mut ok = true;
        for parent in &iface.children[1].children {
            if !self.check_implements(class_nd, info, parent.val()) {
                ok = false;
            }
        }
        for c in &iface.children[2].children {
            match c.tag.as_str() {
                "methoddecl" => {
                    let method = c.children[0].val();
                    let found = info
                        .methods
                        .get(method)
                        .is_some_and(|d| decl_match(d, c));
                    if !found {
                        self.diags.push(
                            line,
                            DiagnosticKind::ClassMissingMethod {
                                class: class.clone(),
                                method: method.to_string(),
                            },
                        );
                        ok = false;
                    }
                }
                "clmethoddecl" => {
                    let method = c.children[0].val();
                    let found = info
                        .clmethods
                        .get(method)
                        .is_some_and(|d| decl_match(d, c));
                    if !found {
                        self.diags.push(
                            line,
                            DiagnosticKind::ClassMissingClassMethod {
                                class: class.clone(),
                                method: method.to_string(),
                            },
                        );
                        ok = false;
                    }
                }
                "clvars" => {
                    for s in &c.children[0].children {
                        if !info.clvars.iter().any(|v| v == s.val()) {
                            self.diags.push(
                                line,
                                DiagnosticKind::ClassMissingClassVar {
                                    class: class.clone(),
                                    var: s.val().to_string(),
                                },
                            );
                            ok = false;
                        }
                    }
                }
                other => panic!("unexpected node '{other}' in interface body"),
            }
        }
        if !ok {
            self.diags.push(
                line,
                DiagnosticKind::InterfaceMismatch {
                    class,
                    iface: iface_name.to_string(),
                },
            );
        }
        ok
    }
}
