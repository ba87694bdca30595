//! Expression lowering: literals with context, containers, operator
//! chains, variable and index access, assignments, method calls.

use umber_bytecode::{Instr, Loc};
use umber_core::Node;

use crate::diagnostics::DiagnosticKind;

use super::{
    adj, emit_call, emit_environ, emit_int, emit_stack_alloc, emit_stack_free, emit_str,
    emit_strh, loc_from_ofs, Dest, Gen,
};
use super::scope::VarState;

impl Gen {
    /// `@module` / `@ns` / `@class` / `@method` context strings.
    pub(super) fn at_form(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let s = match nd.tag.as_str() {
            "atmodule" => self.modname.clone(),
            "atns" => self
                .cstack
                .ns_current()
                .map(|n| n.name.clone())
                .unwrap_or_else(|| self.modname.clone()),
            "atclass" => match self.cstack.class_current() {
                Some(c) => c.name.clone(),
                None => {
                    self.diags.push(
                        nd.line(),
                        DiagnosticKind::ContextError(
                            "@class expression not within class".to_string(),
                        ),
                    );
                    String::new()
                }
            },
            _ => match self.cstack.method_current() {
                Some(m) => m
                    .funcname
                    .rsplit('$')
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                None => {
                    self.diags.push(
                        nd.line(),
                        DiagnosticKind::ContextError(
                            "@method expression not within method".to_string(),
                        ),
                    );
                    String::new()
                }
            },
        };
        emit_str(out, dst, &s);
    }

    pub(super) fn pair(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        if dst == Dest::None {
            return;
        }
        emit_stack_alloc(out, 3);
        emit_environ(out, Dest::Loc(Loc::Sp(0)), "#Pair");
        self.node(out, Dest::Loc(Loc::Sp(1)), &nd.children[0]);
        self.node(out, Dest::Loc(Loc::Sp(2)), &nd.children[1]);
        let wdst = match dst {
            Dest::Loc(l) => adj(l, 3),
            _ => Loc::Sp(2),
        };
        emit_call(out, wdst, "new", 3);
        emit_stack_free(out, if dst == Dest::Push { 2 } else { 3 });
    }

    pub(super) fn list(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        if dst == Dest::None {
            return;
        }
        let elems = &nd.children[0].children;
        if elems.is_empty() {
            super::emit_nil(out, dst);
            return;
        }
        emit_stack_alloc(out, 2);
        for c in elems {
            self.node(out, Dest::Loc(Loc::Sp(1)), c);
            emit_call(out, Loc::Sp(0), "cons", 2);
        }
        let wdst = match dst {
            Dest::Loc(l) => adj(l, 2),
            _ => Loc::Sp(1),
        };
        emit_call(out, wdst, "reverse", 1);
        emit_stack_free(out, if dst == Dest::Push { 1 } else { 2 });
    }

    pub(super) fn array(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        if dst == Dest::None {
            return;
        }
        let elems = &nd.children[0].children;
        emit_int(out, Dest::Push, elems.len() as i64);
        emit_environ(out, Dest::Push, "#Array");
        emit_call(out, Loc::Sp(0), "new", 2);
        out.push(Instr::StackPush { src: Loc::Sp(0) });
        for (i, c) in elems.iter().enumerate() {
            emit_int(out, Dest::Loc(Loc::Sp(1)), i as i64);
            self.node(out, Dest::Loc(Loc::Sp(2)), c);
            emit_call(out, Loc::Sp(2), "atput", 3);
        }
        if dst == Dest::Push {
            out.push(Instr::InstAssign {
                dst: Loc::Sp(2),
                src: Loc::Sp(0),
            });
            emit_stack_free(out, 2);
            return;
        }
        let Dest::Loc(l) = dst else { unreachable!() };
        out.push(Instr::InstAssign {
            dst: adj(l, 3),
            src: Loc::Sp(0),
        });
        emit_stack_free(out, 3);
    }

    pub(super) fn set(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        if dst == Dest::None {
            return;
        }
        emit_environ(out, Dest::Push, "#Set");
        emit_call(out, Loc::Sp(0), "new", 1);
        out.push(Instr::StackPush { src: Loc::Sp(0) });
        for c in &nd.children[0].children {
            self.node(out, Dest::Loc(Loc::Sp(1)), c);
            emit_call(out, Loc::Sp(1), "put", 2);
        }
        if dst == Dest::Push {
            out.push(Instr::InstAssign {
                dst: Loc::Sp(1),
                src: Loc::Sp(0),
            });
            emit_stack_free(out, 1);
            return;
        }
        let Dest::Loc(l) = dst else { unreachable!() };
        out.push(Instr::InstAssign {
            dst: adj(l, 2),
            src: Loc::Sp(0),
        });
        emit_stack_free(out, 2);
    }

    pub(super) fn dict(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        if dst == Dest::None {
            return;
        }
        emit_environ(out, Dest::Push, "#Dictionary");
        emit_call(out, Loc::Sp(0), "new", 1);
        emit_stack_alloc(out, 2);
        out.push(Instr::InstAssign {
            dst: Loc::Sp(0),
            src: Loc::Sp(2),
        });
        for pair in &nd.children[0].children {
            let k = &pair.children[0];
            if k.tag == "str" {
                emit_strh(out, Dest::Loc(Loc::Sp(1)), k.val());
            } else {
                self.node(out, Dest::Loc(Loc::Sp(1)), k);
            }
            self.node(out, Dest::Loc(Loc::Sp(2)), &pair.children[1]);
            emit_call(out, Loc::Sp(2), "atput", 3);
        }
        if dst == Dest::Push {
            out.push(Instr::InstAssign {
                dst: Loc::Sp(2),
                src: Loc::Sp(0),
            });
            emit_stack_free(out, 2);
            return;
        }
        let Dest::Loc(l) = dst else { unreachable!() };
        out.push(Instr::InstAssign {
            dst: adj(l, 3),
            src: Loc::Sp(0),
        });
        emit_stack_free(out, 3);
    }

    /// Left-fold chain of 2-argument selector calls.
    pub(super) fn multiop(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node, sel: &str) {
        if nd.children.len() == 1 {
            self.node(out, dst, &nd.children[0]);
            return;
        }
        emit_stack_alloc(out, 2);
        let wdst = match dst {
            Dest::None | Dest::Push => Loc::Sp(1),
            Dest::Loc(l) => adj(l, 2),
        };
        self.node(out, Dest::Loc(Loc::Sp(0)), &nd.children[0]);
        let n = nd.children.len() - 1;
        for (i, c) in nd.children[1..].iter().enumerate() {
            self.node(out, Dest::Loc(Loc::Sp(1)), c);
            let target = if i + 1 < n { Loc::Sp(0) } else { wdst };
            emit_call(out, target, sel, 2);
        }
        emit_stack_free(out, if dst == Dest::Push { 1 } else { 2 });
    }

    /// Operands push in reverse order to match the runtime convention.
    pub(super) fn div(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        self.node(out, Dest::Push, &nd.children[1]);
        self.node(out, Dest::Push, &nd.children[0]);
        let wdst = match dst {
            Dest::None | Dest::Push => Loc::Sp(1),
            Dest::Loc(l) => adj(l, 2),
        };
        emit_call(out, wdst, "div", 2);
        emit_stack_free(out, if dst == Dest::Push { 1 } else { 2 });
    }

    /// Short-circuit `land`/`lor`: operands evaluate left to right into
    /// sp[0]; after each but the last, a conditional jump exits early.
    pub(super) fn land_lor(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node, is_and: bool) {
        let done = self.new_label();
        emit_stack_alloc(out, 1);
        let n = nd.children.len();
        for (i, c) in nd.children.iter().enumerate() {
            self.node(out, Dest::Loc(Loc::Sp(0)), c);
            if i + 1 < n {
                out.push(if is_and {
                    Instr::Jf {
                        src: Loc::Sp(0),
                        label: done.clone(),
                    }
                } else {
                    Instr::Jt {
                        src: Loc::Sp(0),
                        label: done.clone(),
                    }
                });
            }
        }
        self.label(out, &done);
        match dst {
            Dest::None => emit_stack_free(out, 1),
            Dest::Push => {}
            Dest::Loc(l) => {
                out.push(Instr::InstAssign {
                    dst: adj(l, 1),
                    src: Loc::Sp(0),
                });
                emit_stack_free(out, 1);
            }
        }
    }

    pub(super) fn lnot(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        self.node(out, Dest::Push, &nd.children[0]);
        let wdst = match dst {
            Dest::None | Dest::Push => Loc::Sp(0),
            Dest::Loc(l) => adj(l, 1),
        };
        emit_call(out, wdst, "not", 1);
        if dst != Dest::Push {
            emit_stack_free(out, 1);
        }
    }

    pub(super) fn notequal(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        emit_stack_alloc(out, 2);
        self.node(out, Dest::Loc(Loc::Sp(0)), &nd.children[0]);
        self.node(out, Dest::Loc(Loc::Sp(1)), &nd.children[1]);
        emit_call(out, Loc::Sp(1), "equal", 2);
        emit_stack_free(out, 1);
        let wdst = match dst {
            Dest::None | Dest::Push => Loc::Sp(0),
            Dest::Loc(l) => adj(l, 1),
        };
        emit_call(out, wdst, "not", 1);
        if dst != Dest::Push {
            emit_stack_free(out, 1);
        }
    }

    /// Bare-name access: a Defined local reads its slot, anything else is a
    /// dynamic environment lookup.
    pub(super) fn obj1(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        if dst == Dest::None {
            return;
        }
        let name = nd.children[0].val();
        match self.cstack.var_lookup(name, VarState::Defined) {
            None => emit_environ(out, dst, name),
            Some(ofs) => {
                let src = loc_from_ofs(ofs);
                match dst {
                    Dest::Push => out.push(Instr::StackPush { src }),
                    Dest::Loc(l) => out.push(Instr::InstAssign { dst: l, src }),
                    Dest::None => unreachable!(),
                }
            }
        }
    }

    pub(super) fn obj2(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let wdst = self.index_prologue(out, dst);
        let k = &nd.children[1];
        if k.tag == "str" {
            emit_strh(out, Dest::Push, k.val());
        } else {
            self.node(out, Dest::Push, k);
        }
        self.index_epilogue(out, dst, wdst, nd, "at");
    }

    /// Attribute-style access: the bare name hashes to a selector key.
    pub(super) fn obj2e(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let wdst = self.index_prologue(out, dst);
        emit_strh(out, Dest::Push, nd.children[1].val());
        self.index_epilogue(out, dst, wdst, nd, "ate");
    }

    fn index_prologue(&mut self, out: &mut Vec<Instr>, dst: Dest) -> Loc {
        match dst {
            Dest::None | Dest::Push => {
                emit_stack_alloc(out, 1);
                Loc::Sp(0)
            }
            Dest::Loc(l) => l,
        }
    }

    fn index_epilogue(
        &mut self,
        out: &mut Vec<Instr>,
        dst: Dest,
        wdst: Loc,
        nd: &Node,
        sel: &str,
    ) {
        self.node(out, Dest::Push, &nd.children[0]);
        emit_call(out, adj(wdst, 2), sel, 2);
        emit_stack_free(out, 2);
        if dst == Dest::None {
            emit_stack_free(out, 1);
        }
    }

    /// Top-level assignment inside a class/namespace/module body: write the
    /// attribute on the object under construction.
    fn module_or_class_assign(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        self.node(out, Dest::Push, &nd.children[1]);
        let lvar = nd.children[0].children[0].val();
        emit_strh(out, Dest::Push, lvar);
        out.push(Instr::StackPush { src: Loc::Sp(2) });
        emit_call(out, Loc::Sp(2), "atput", 3);
        emit_stack_free(out, 3);
    }

    pub(super) fn assign11(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        if self.cstack.method_current().is_none() {
            self.module_or_class_assign(out, nd);
            return;
        }
        let rvar = nd.children[1].children[0].val().to_string();
        let lvar = nd.children[0].children[0].val().to_string();
        let rofs = self.cstack.var_lookup(&rvar, VarState::Defined);
        let ldst = loc_from_ofs(self.cstack.var_mark_defined(&lvar));
        match rofs {
            None => out.push(Instr::EnvironAt {
                dst: ldst,
                name: rvar,
            }),
            Some(ofs) => out.push(Instr::InstAssign {
                dst: ldst,
                src: loc_from_ofs(ofs),
            }),
        }
    }

    pub(super) fn assign1c(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        if self.cstack.method_current().is_none() {
            self.module_or_class_assign(out, nd);
            return;
        }
        let lvar = nd.children[0].children[0].val().to_string();
        let ldst = Dest::Loc(loc_from_ofs(self.cstack.var_mark_defined(&lvar)));
        let rhs = &nd.children[1];
        match rhs.tag.as_str() {
            "nil" => super::emit_nil(out, ldst),
            "bool" => super::emit_bool(out, ldst, rhs.val() == "#true"),
            "int" => emit_int(out, ldst, umber_core::num::parse_int(rhs.val())),
            "float" => super::emit_float(out, ldst, umber_core::num::parse_float(rhs.val())),
            "str" => emit_str(out, ldst, rhs.val()),
            other => panic!("assign1c with non-constant rhs '{other}'"),
        }
    }

    pub(super) fn assign1(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        if self.cstack.method_current().is_none() {
            self.module_or_class_assign(out, nd);
            return;
        }
        let lvar = nd.children[0].children[0].val().to_string();
        let lofs = self
            .cstack
            .var_lookup(&lvar, VarState::Declared)
            .unwrap_or_else(|| panic!("assignment target {lvar} not declared"));
        self.node(out, Dest::Loc(loc_from_ofs(lofs)), &nd.children[1]);
        self.cstack.var_mark_defined(&lvar);
    }

    /// Indexed/attribute assignment: rhs, key, receiver push, `atput(3)`.
    pub(super) fn assign_indexed(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        let lhs = &nd.children[0];
        assert!(
            lhs.tag == "obj2" || lhs.tag == "obj2e",
            "assignment lhs must be indexed, got '{}'",
            lhs.tag
        );
        self.node(out, Dest::Push, &nd.children[1]);
        if lhs.tag == "obj2" {
            self.node(out, Dest::Push, &lhs.children[1]);
        } else {
            emit_strh(out, Dest::Push, lhs.children[1].val());
        }
        self.node(out, Dest::Push, &lhs.children[0]);
        emit_call(out, Loc::Sp(2), "atput", 3);
        emit_stack_free(out, 3);
    }

    pub(super) fn methodcall(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let args = &nd.children[2].children;
        let argc = 1 + args.len() as u64;
        let wdst = match dst {
            Dest::None | Dest::Push => {
                emit_stack_alloc(out, 1);
                Loc::Sp(0)
            }
            Dest::Loc(l) => l,
        };
        emit_stack_alloc(out, argc);
        let wdst = adj(wdst, argc as i64);
        self.node(out, Dest::Loc(Loc::Sp(0)), &nd.children[0]);
        for (i, a) in args.iter().enumerate() {
            self.node(out, Dest::Loc(Loc::Sp(1 + i as i64)), a);
        }
        emit_call(out, wdst, nd.children[1].val(), argc);
        emit_stack_free(out, argc);
        if dst == Dest::None {
            emit_stack_free(out, 1);
        }
    }
}
