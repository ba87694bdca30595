//! IR generator: lowers the optimized tree into stack-machine IR.
//!
//! Lowering is destination-driven: `node(out, dst, nd)` delivers the value
//! of `nd` according to `dst` (discarded, pushed, stored into a slot, or
//! the caller's abstract destination). Output lands in two sections: method
//! bodies plus anonymous-function bodies, and the module init function that
//! assembles classes, namespaces, and method tables at load time.
//!
//! # Module Organization
//!
//! - `scope`: the compile stack of block/method/class/namespace/except/
//!   break/loop frames
//! - `exprs`: literals, containers, operator chains, variable and index
//!   access, method calls
//! - `stmts`: blocks, control flow, loops, exception handling
//! - `decls`: methods, function literals, classes, namespaces
//! - `interface`: interface declarations and structural conformance checks

pub(crate) mod scope;

mod decls;
mod exprs;
mod interface;
mod stmts;

#[cfg(test)]
mod gen_tests;

use indexmap::IndexMap;
use umber_bytecode::{Func, Instr, Loc, Module, Visibility};
use umber_core::Node;

use crate::diagnostics::Diagnostics;
use scope::CompileStack;

/// Where an expression's value goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dest {
    /// Result discarded; side-effect-free work may be skipped.
    None,
    /// Result pushed on the stack (becomes sp[0]).
    Push,
    /// Result stored into a concrete slot or the caller's destination.
    Loc(Loc),
}

/// Shift a stack-relative slot by `n`; other bases are unaffected by pushes.
pub(crate) fn adj(loc: Loc, n: i64) -> Loc {
    match loc {
        Loc::Sp(k) => Loc::Sp(k + n),
        other => other,
    }
}

/// Slot descriptor for a block-variable offset: non-negative offsets are
/// argument slots, negative offsets are base-pointer locals.
pub(crate) fn loc_from_ofs(ofs: i64) -> Loc {
    if ofs >= 0 { Loc::Ap(ofs) } else { Loc::Bp(ofs) }
}

/// Generator state threaded through the lowering walk.
pub struct Gen {
    pub(crate) modname: String,
    pub(crate) cstack: CompileStack,
    pub(crate) diags: Diagnostics,
    pub(crate) ifaces: IndexMap<String, Node>,
    /// Compiled method bodies.
    pub(crate) body: Vec<Func>,
    /// Compiled anonymous/named function-literal bodies.
    pub(crate) anon: Vec<Func>,
    label_num: u32,
    anon_num: u32,
}

/// Lower a module tree to IR. Diagnostics accumulate; the module is always
/// produced so one run reports every error.
pub fn generate(root: &Node) -> (Module, Diagnostics) {
    assert_eq!(root.tag, "module", "generator input must be a module tree");
    let mut g = Gen {
        modname: root.val().to_string(),
        cstack: CompileStack::new(),
        diags: Diagnostics::new(),
        ifaces: IndexMap::new(),
        body: Vec::new(),
        anon: Vec::new(),
        label_num: 0,
        anon_num: 0,
    };

    let mut init = Vec::new();
    for c in &root.children {
        g.node(&mut init, Dest::None, c);
    }
    init.push(Instr::Retd);

    let init_func = Func {
        name: format!("__{}_init__", g.modname),
        argc: 1,
        arrayarg: false,
        visibility: Visibility::Public,
        body: init,
    };

    let mut funcs = g.anon;
    funcs.extend(g.body);
    funcs.push(init_func);

    (
        Module {
            name: g.modname,
            funcs,
        },
        g.diags,
    )
}

impl Gen {
    /// Lower one node, delivering its value per `dst`.
    pub(crate) fn node(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        match nd.tag.as_str() {
            "nil" => emit_nil(out, dst),
            "bool" => emit_bool(out, dst, nd.val() == "#true"),
            "int" => emit_int(out, dst, umber_core::num::parse_int(nd.val())),
            "float" => emit_float(out, dst, umber_core::num::parse_float(nd.val())),
            "str" => emit_str(out, dst, nd.val()),
            "atmodule" | "atns" | "atclass" | "atmethod" => self.at_form(out, dst, nd),
            "pair" => self.pair(out, dst, nd),
            "list" => self.list(out, dst, nd),
            "array" => self.array(out, dst, nd),
            "set" => self.set(out, dst, nd),
            "dict" => self.dict(out, dst, nd),
            "add" | "sub" | "mul" | "band" | "bor" | "bxor" | "equal" | "lt" | "gt" | "le"
            | "ge" => {
                let sel = nd.tag.clone();
                self.multiop(out, dst, nd, &sel);
            }
            "div" => self.div(out, dst, nd),
            "land" => self.land_lor(out, dst, nd, true),
            "lor" => self.land_lor(out, dst, nd, false),
            "lnot" => self.lnot(out, dst, nd),
            "notequal" => self.notequal(out, dst, nd),
            "obj1" => self.obj1(out, dst, nd),
            "obj2" => self.obj2(out, dst, nd),
            "obj2e" => self.obj2e(out, dst, nd),
            "assign11" => self.assign11(out, nd),
            "assign1c" => self.assign1c(out, nd),
            "assign1" => self.assign1(out, nd),
            "assign" => self.assign_indexed(out, nd),
            "methodcall" => self.methodcall(out, dst, nd),
            "block" => self.block(out, dst, nd, false),
            "if" => self.if_stmt(out, nd, false),
            "ifnot" => self.if_stmt(out, nd, true),
            "condexpr" => self.condexpr(out, dst, nd),
            "cond" => self.cond(out, dst, nd),
            "for" => self.for_stmt(out, nd),
            "loop" => self.loop_stmt(out, dst, nd),
            "while" => self.while_until(out, dst, nd, false),
            "until" => self.while_until(out, dst, nd, true),
            "break" => self.break_stmt(out, nd),
            "continue" => self.continue_stmt(out, nd),
            "return" => self.return_stmt(out, nd),
            "var" => self.var_stmt(out, dst, nd),
            "try" => self.try_stmt(out, nd, false, false),
            "tryany" => self.try_stmt(out, nd, true, false),
            "trynone" => self.try_stmt(out, nd, false, true),
            "tryanynone" => self.try_stmt(out, nd, true, true),
            "raise" => self.raise(out, nd),
            "reraise" => out.push(Instr::ExceptReraise),
            "method" | "clmethod" => self.method_decl(out, nd),
            "anon" => self.anon_fn(out, dst, nd),
            "func" => self.func_fn(out, dst, nd),
            "recurse" => {
                let fq = self.cstack.func_name("", &self.modname);
                emit_method_const(out, dst, &fq);
            }
            "iface" => self.iface_decl(nd),
            "class" => self.class_decl(out, dst, nd),
            "namespace" => self.namespace_decl(out, dst, nd),
            "parent" => self.parent(out, dst, nd),
            other => panic!("unhandled node tag '{other}'"),
        }
    }

    pub(crate) fn new_label(&mut self) -> String {
        self.label_num += 1;
        format!("label{}", self.label_num)
    }

    pub(crate) fn label(&self, out: &mut Vec<Instr>, name: &str) {
        out.push(Instr::Label {
            name: name.to_string(),
        });
    }

    /// Pop a block frame, freeing its slots unless the enclosing `ret`
    /// unwinds the whole activation record.
    pub(crate) fn block_pop(
        &mut self,
        out: &mut Vec<Instr>,
        id: scope::FrameId,
        noclean: bool,
    ) {
        let size = self.cstack.block_frame_mut(id).size;
        self.cstack.pop(id);
        if !noclean {
            emit_stack_free(out, size);
        }
    }

    pub(crate) fn break_pop(&mut self, out: &mut Vec<Instr>, id: scope::FrameId) {
        let (used, exit_label) = {
            let b = self.cstack.break_frame(id);
            (b.used, b.exit_label.clone())
        };
        self.cstack.pop(id);
        if used {
            self.label(out, &exit_label);
        }
    }
}

pub(crate) fn emit_stack_alloc(out: &mut Vec<Instr>, n: u64) {
    if n > 0 {
        out.push(Instr::StackAlloc { size: n });
    }
}

pub(crate) fn emit_stack_free(out: &mut Vec<Instr>, n: u64) {
    if n > 0 {
        out.push(Instr::StackFree { size: n });
    }
}

pub(crate) fn emit_except_pop(out: &mut Vec<Instr>, n: u64) {
    if n > 0 {
        out.push(Instr::ExceptPop { cnt: n });
    }
}

pub(crate) fn emit_call(out: &mut Vec<Instr>, dst: Loc, sel: &str, argc: u64) {
    out.push(Instr::MethodCall {
        dst,
        sel: sel.to_string(),
        argc,
    });
}

pub(crate) fn emit_nil(out: &mut Vec<Instr>, dst: Dest) {
    match dst {
        Dest::None => {}
        Dest::Push => out.push(Instr::NilPush),
        Dest::Loc(l) => out.push(Instr::NilAssign { dst: l }),
    }
}

pub(crate) fn emit_bool(out: &mut Vec<Instr>, dst: Dest, val: bool) {
    match dst {
        Dest::None => {}
        Dest::Push => out.push(Instr::BoolPushc { val }),
        Dest::Loc(l) => out.push(Instr::BoolNewc { dst: l, val }),
    }
}

pub(crate) fn emit_int(out: &mut Vec<Instr>, dst: Dest, val: i64) {
    match dst {
        Dest::None => {}
        Dest::Push => out.push(Instr::IntPushc { val }),
        Dest::Loc(l) => out.push(Instr::IntNewc { dst: l, val }),
    }
}

pub(crate) fn emit_float(out: &mut Vec<Instr>, dst: Dest, val: f64) {
    match dst {
        Dest::None => {}
        Dest::Push => out.push(Instr::FloatPushc { val }),
        Dest::Loc(l) => out.push(Instr::FloatNewc { dst: l, val }),
    }
}

pub(crate) fn emit_str(out: &mut Vec<Instr>, dst: Dest, val: &str) {
    match dst {
        Dest::None => {}
        Dest::Push => out.push(Instr::StrPushc {
            val: val.to_string(),
        }),
        Dest::Loc(l) => out.push(Instr::StrNewc {
            dst: l,
            val: val.to_string(),
        }),
    }
}

pub(crate) fn emit_strh(out: &mut Vec<Instr>, dst: Dest, val: &str) {
    match dst {
        Dest::None => {}
        Dest::Push => out.push(Instr::StrPushch {
            val: val.to_string(),
        }),
        Dest::Loc(l) => out.push(Instr::StrNewch {
            dst: l,
            val: val.to_string(),
        }),
    }
}

pub(crate) fn emit_method_const(out: &mut Vec<Instr>, dst: Dest, func: &str) {
    match dst {
        Dest::None => {}
        Dest::Push => out.push(Instr::MethodPushc {
            func: func.to_string(),
        }),
        Dest::Loc(l) => out.push(Instr::MethodNewc {
            dst: l,
            func: func.to_string(),
        }),
    }
}

pub(crate) fn emit_environ(out: &mut Vec<Instr>, dst: Dest, name: &str) {
    match dst {
        Dest::None => {}
        Dest::Push => out.push(Instr::EnvironAtPush {
            name: name.to_string(),
        }),
        Dest::Loc(l) => out.push(Instr::EnvironAt {
            dst: l,
            name: name.to_string(),
        }),
    }
}
