//! Declaration lowering: methods, function literals, classes, namespaces.

use umber_bytecode::{Func, Instr, Loc, Visibility};
use umber_core::Node;

use crate::diagnostics::DiagnosticKind;

use super::{
    emit_call, emit_method_const, emit_nil, emit_stack_alloc, emit_stack_free, emit_strh,
    Dest, Gen,
};

impl Gen {
    /// Compile a function body under fresh Method and parameter-block
    /// frames. Parameters occupy argument slots ap[0..argc-1]; a trailing
    /// `methodarrayarg` receives the remainder in a reserved local slot and
    /// flips the function's prologue to `array_arg_push`.
    fn build_func(&mut self, funcname: &str, params: &Node, body: &Node) -> Func {
        let mut func = Func {
            name: funcname.to_string(),
            argc: params.children.len() as u64,
            arrayarg: false,
            visibility: Visibility::Private,
            body: Vec::new(),
        };

        let fr_method = self.cstack.push_method(funcname);
        let fr_block = self.cstack.push_block();
        let mut ofs: i64 = 0;
        for p in &params.children {
            match p.tag.as_str() {
                "sym" => {
                    self.cstack.param_add(p.val(), ofs);
                    ofs += 1;
                }
                "methodarrayarg" => {
                    self.cstack.param_add(p.children[0].val(), -1);
                    self.cstack.block_frame_mut(fr_block).size = 1;
                    func.arrayarg = true;
                }
                other => panic!("unexpected parameter node '{other}'"),
            }
        }

        let mut code = Vec::new();
        // The activation record is unwound by ret/retd, not by stack_free.
        self.block(&mut code, Dest::None, body, true);
        self.cstack.pop(fr_block);
        code.push(Instr::Retd);
        self.cstack.pop(fr_method);

        func.body = code;
        func
    }

    /// `method`/`clmethod` declaration: compile the body into the method
    /// section, then register it on the object under construction in the
    /// init stream.
    pub(super) fn method_decl(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        let decl = &nd.children[0];
        let name = decl.children[0].val().to_string();
        let funcname = self.cstack.func_name(&name, &self.modname);
        let func = self.build_func(&funcname, &decl.children[1], &nd.children[1]);
        self.body.push(func);

        let table = if nd.tag == "clmethod" {
            "classmethods"
        } else {
            "methods"
        };
        emit_stack_alloc(out, 3);
        out.push(Instr::InstAssign {
            dst: Loc::Sp(0),
            src: Loc::Sp(3),
        });
        emit_call(out, Loc::Sp(0), table, 1);
        emit_strh(out, Dest::Loc(Loc::Sp(1)), &name);
        out.push(Instr::MethodNewc {
            dst: Loc::Sp(2),
            func: funcname,
        });
        emit_call(out, Loc::Sp(2), "atput", 3);
        emit_stack_free(out, 3);
    }

    /// Anonymous function literal: body compiles into the anon section, the
    /// use site materializes a method constant.
    pub(super) fn anon_fn(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        self.anon_num += 1;
        let funcname = format!("{}$__anon__${}", self.modname, self.anon_num);
        let func = self.build_func(&funcname, &nd.children[0], &nd.children[1]);
        self.anon.push(func);
        emit_method_const(out, dst, &funcname);
    }

    /// Named function expression: like `anon`, but with a composed name.
    pub(super) fn func_fn(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let decl = &nd.children[0];
        let funcname = self
            .cstack
            .func_name(decl.children[0].val(), &self.modname);
        let func = self.build_func(&funcname, &decl.children[1], &nd.children[1]);
        self.anon.push(func);
        emit_method_const(out, dst, &funcname);
    }

    /// Class declaration: verify interfaces, build the class object via
    /// `#Metaclass.new(name, parent, receiver)`, then lower the body with
    /// the class object as the implicit attribute receiver.
    pub(super) fn class_decl(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let name = nd.children[0].val().to_string();
        if !nd.children[2].children.is_empty() {
            let info = super::interface::class_scan(nd);
            let ifaces: Vec<String> = nd.children[2]
                .children
                .iter()
                .map(|c| c.val().to_string())
                .collect();
            for iface in ifaces {
                self.check_implements(nd, &info, &iface);
            }
        }

        emit_stack_alloc(out, 5);
        out.push(Instr::EnvironAt {
            dst: Loc::Sp(0),
            name: "#Metaclass".to_string(),
        });
        out.push(Instr::StrNewch {
            dst: Loc::Sp(1),
            val: name.clone(),
        });
        self.node(out, Dest::Loc(Loc::Sp(2)), &nd.children[1]);
        out.push(Instr::InstAssign {
            dst: Loc::Sp(3),
            src: Loc::Ap(0),
        });
        emit_call(out, Loc::Sp(4), "new", 4);
        emit_stack_free(out, 4);

        let fr = self.cstack.push_class(&name, nd.children[1].clone());
        for c in &nd.children[3].children {
            self.node(out, dst, c);
        }
        self.cstack.pop(fr);
        emit_stack_free(out, 1);
    }

    /// Namespace declaration: `#Namespace.new(name, receiver)`, body lowered
    /// with the namespace object on the stack.
    pub(super) fn namespace_decl(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let fr = self.cstack.push_ns(nd.children[0].val());
        out.push(Instr::StrPushc {
            val: nd.children[0].val().to_string(),
        });
        out.push(Instr::EnvironAtPush {
            name: "#Namespace".to_string(),
        });
        emit_call(out, Loc::Sp(1), "new", 3);
        emit_stack_free(out, 1);
        for c in &nd.children[1].children {
            self.node(out, dst, c);
        }
        emit_stack_free(out, 1);
        self.cstack.pop(fr);
    }

    /// Re-lower the enclosing class's parent expression at the use site.
    pub(super) fn parent(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let Some(parent) = self.cstack.class_current().map(|c| c.parent.clone()) else {
            self.diags.push(
                nd.line(),
                DiagnosticKind::ContextError("parent expression not within class".to_string()),
            );
            emit_nil(out, dst);
            return;
        };
        self.node(out, dst, &parent);
    }
}
