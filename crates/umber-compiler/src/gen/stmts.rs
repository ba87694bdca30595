//! Statement lowering: blocks, conditionals, loops, unwinding, exceptions.

use umber_bytecode::{Instr, Loc};
use umber_core::Node;

use crate::diagnostics::DiagnosticKind;

use super::scope::Frame;
use super::{
    emit_call, emit_except_pop, emit_stack_alloc, emit_stack_free, loc_from_ofs, Dest, Gen,
};

impl Gen {
    /// Statement sequence: scan for declarations, allocate the frame in one
    /// adjustment, lower each statement, free on exit.
    pub(super) fn block(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node, noclean: bool) {
        let fr = self.cstack.push_block();
        self.block_scan(nd);
        let size = self.cstack.block_current().expect("block frame").size;
        emit_stack_alloc(out, size);
        for s in &nd.children {
            self.node(out, dst, s);
        }
        self.block_pop(out, fr, noclean);
    }

    /// One pass over the statements to declare names before any lowering:
    /// simple-assignment targets soft (Declared), `var` bindings and
    /// `for`/`try` binders hard (Defined; the binder produces the value).
    fn block_scan(&mut self, nd: &Node) {
        for s in &nd.children {
            if s.tag.starts_with("assign1") {
                let lvar = s.children[0].children[0].val().to_string();
                self.cstack.var_add_soft(&lvar);
                continue;
            }
            if s.tag == "var" {
                for c in &s.children {
                    if c.tag == "sym" {
                        self.cstack.var_add_hard(c.val());
                    } else if c.tag.starts_with("assign1") {
                        let name = c.children[0].children[0].val().to_string();
                        self.cstack.var_add_hard(&name);
                    } else {
                        panic!("unexpected node '{}' in var statement", c.tag);
                    }
                }
                continue;
            }
            if s.tag == "for" || s.tag.starts_with("try") {
                self.cstack.var_add_binder(s.children[0].val());
            }
        }
    }

    pub(super) fn var_stmt(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        for c in &nd.children {
            if c.tag.starts_with("assign1") {
                self.node(out, dst, c);
            }
        }
    }

    pub(super) fn if_stmt(&mut self, out: &mut Vec<Instr>, nd: &Node, negated: bool) {
        let has_else = nd.children.len() > 2;
        let label_else = self.new_label();
        let label_end = self.new_label();
        self.node(out, Dest::Push, &nd.children[0]);
        let target = if has_else { &label_else } else { &label_end };
        out.push(if negated {
            Instr::Popjt {
                label: target.clone(),
            }
        } else {
            Instr::Popjf {
                label: target.clone(),
            }
        });
        self.node(out, Dest::None, &nd.children[1]);
        if has_else {
            out.push(Instr::Jmp {
                label: label_end.clone(),
            });
            self.label(out, &label_else);
            self.node(out, Dest::None, &nd.children[2]);
        }
        self.label(out, &label_end);
    }

    pub(super) fn condexpr(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let label_false = self.new_label();
        let label_done = self.new_label();
        self.node(out, Dest::Push, &nd.children[0]);
        out.push(Instr::Popjf {
            label: label_false.clone(),
        });
        self.node(out, dst, &nd.children[1]);
        out.push(Instr::Jmp {
            label: label_done.clone(),
        });
        self.label(out, &label_false);
        self.node(out, dst, &nd.children[2]);
        self.label(out, &label_done);
    }

    /// Breakable wrapper: `break 1` inside exits past the child.
    pub(super) fn cond(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let exit = self.new_label();
        let fr = self.cstack.push_break("cond", exit);
        self.node(out, dst, &nd.children[0]);
        self.break_pop(out, fr);
    }

    /// `for var in iter`: materialize the iterable as a linked list in
    /// sp[0], then test/bind/advance around the body.
    pub(super) fn for_stmt(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        let exit = self.new_label();
        let fr_break = self.cstack.push_break("for", exit);
        let fr_block = self.cstack.push_block();
        let label_continue = self.new_label();
        let fr_loop = self.cstack.push_loop("for", label_continue.clone());

        self.node(out, Dest::Push, &nd.children[1]);
        emit_call(out, Loc::Sp(0), "List", 1);
        self.cstack.block_frame_mut(fr_block).size = 1;

        let var = nd.children[0].val().to_string();
        if self.cstack.var_add_binder(&var) {
            out.push(Instr::StackPush { src: Loc::Sp(0) });
        }
        let vdst = loc_from_ofs(self.cstack.var_mark_defined(&var));

        let label_loop = self.new_label();
        let label_done = self.new_label();
        self.label(out, &label_loop);
        out.push(Instr::StackPush { src: Loc::Sp(0) });
        emit_call(out, Loc::Sp(0), "isnil", 1);
        out.push(Instr::Popjt {
            label: label_done.clone(),
        });
        emit_call(out, vdst, "car", 1);
        self.node(out, Dest::None, &nd.children[2]);
        if self.cstack.loop_frame(fr_loop).used {
            self.label(out, &label_continue);
        }
        emit_call(out, Loc::Sp(0), "cdr", 1);
        out.push(Instr::Jmp { label: label_loop });
        self.label(out, &label_done);

        self.cstack.pop(fr_loop);
        self.block_pop(out, fr_block, false);
        self.break_pop(out, fr_break);
    }

    pub(super) fn loop_stmt(&mut self, out: &mut Vec<Instr>, dst: Dest, nd: &Node) {
        let exit = self.new_label();
        let fr_break = self.cstack.push_break("loop", exit);
        let label_loop = self.new_label();
        let fr_loop = self.cstack.push_loop("loop", label_loop.clone());
        self.label(out, &label_loop);
        self.node(out, dst, &nd.children[0]);
        out.push(Instr::Jmp { label: label_loop });
        self.cstack.pop(fr_loop);
        self.break_pop(out, fr_break);
    }

    /// Jump-to-condition loop; `continue` targets the condition.
    pub(super) fn while_until(
        &mut self,
        out: &mut Vec<Instr>,
        dst: Dest,
        nd: &Node,
        until: bool,
    ) {
        let exit = self.new_label();
        let fr_break = self.cstack.push_break("while", exit);
        let label_begin = self.new_label();
        let label_loop = self.new_label();
        let fr_loop = self.cstack.push_loop("while", label_begin.clone());
        out.push(Instr::Jmp {
            label: label_begin.clone(),
        });
        self.label(out, &label_loop);
        self.node(out, dst, &nd.children[1]);
        self.label(out, &label_begin);
        self.node(out, Dest::Push, &nd.children[0]);
        out.push(if until {
            Instr::Popjf { label: label_loop }
        } else {
            Instr::Popjt { label: label_loop }
        });
        self.cstack.pop(fr_loop);
        self.break_pop(out, fr_break);
    }

    /// Walk the compile stack to the nth Break frame, accumulating stack
    /// cleanup from Block frames. An Except frame owns every slot above it,
    /// so it resets the stack cleanup and adds an exception-frame pop.
    pub(super) fn break_stmt(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        let mut n: i64 = nd.get("val").and_then(|s| s.parse().ok()).unwrap_or(0);
        if n > 0 {
            let mut stack_cleanup = 0u64;
            let mut except_cleanup = 0u64;
            let mut target = None;
            for (i, f) in self.cstack.frames().iter().enumerate().rev() {
                match f {
                    Frame::Method(_) => break,
                    Frame::Block(b) => stack_cleanup += b.size,
                    Frame::Except => {
                        except_cleanup += 1;
                        stack_cleanup = 0;
                    }
                    Frame::Break(_) => {
                        n -= 1;
                        if n == 0 {
                            target = Some(i);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            if let Some(i) = target {
                emit_except_pop(out, except_cleanup);
                emit_stack_free(out, stack_cleanup);
                let Frame::Break(b) = self.cstack.frame_mut(i) else {
                    unreachable!()
                };
                b.used = true;
                out.push(Instr::Jmp {
                    label: b.exit_label.clone(),
                });
                return;
            }
        }
        self.diags.push(
            nd.line(),
            DiagnosticKind::ContextError("invalid break count".to_string()),
        );
    }

    pub(super) fn continue_stmt(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        let mut stack_cleanup = 0u64;
        let mut except_cleanup = 0u64;
        let mut target = None;
        for (i, f) in self.cstack.frames().iter().enumerate().rev() {
            match f {
                Frame::Method(_) => break,
                Frame::Block(b) => stack_cleanup += b.size,
                Frame::Except => {
                    except_cleanup += 1;
                    stack_cleanup = 0;
                }
                Frame::Loop(_) => {
                    target = Some(i);
                    break;
                }
                _ => {}
            }
        }
        if let Some(i) = target {
            emit_except_pop(out, except_cleanup);
            emit_stack_free(out, stack_cleanup);
            let Frame::Loop(l) = self.cstack.frame_mut(i) else {
                unreachable!()
            };
            l.used = true;
            out.push(Instr::Jmp {
                label: l.continue_label.clone(),
            });
            return;
        }
        self.diags.push(
            nd.line(),
            DiagnosticKind::ContextError("continue not within for/while/until/loop".to_string()),
        );
    }

    pub(super) fn return_stmt(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        if nd.children.is_empty() {
            out.push(Instr::Retd);
            return;
        }
        self.node(out, Dest::Loc(Loc::Dst), &nd.children[0]);
        out.push(Instr::Ret);
    }

    /// `try var { body } catches [any] [none]`.
    pub(super) fn try_stmt(
        &mut self,
        out: &mut Vec<Instr>,
        nd: &Node,
        has_any: bool,
        has_none: bool,
    ) {
        let fr_block = self.cstack.push_block();
        let var = nd.children[0].val().to_string();
        if !self.cstack.var_is_declared(&var) {
            self.cstack.var_add_hard(&var);
        }
        let ofs = self.cstack.var_mark_defined(&var);

        let label_ex = self.new_label();
        let label_cleanup = self.new_label();
        let label_done = self.new_label();

        out.push(Instr::ExceptPush {
            var: loc_from_ofs(ofs),
        });
        out.push(Instr::Jx {
            label: label_ex.clone(),
        });
        let fr_except = self.cstack.push_except();

        self.node(out, Dest::None, &nd.children[1]);
        emit_except_pop(out, 1);
        if has_none {
            let idx = if has_any { 4 } else { 3 };
            self.node(out, Dest::None, &nd.children[idx]);
        }
        out.push(Instr::Jmp {
            label: label_done.clone(),
        });

        self.label(out, &label_ex);
        for c in &nd.children[2].children {
            if c.children.len() == 1 {
                self.node(out, Dest::None, &c.children[0]);
                out.push(Instr::Jmp {
                    label: label_cleanup.clone(),
                });
                continue;
            }
            let label_no = self.new_label();
            self.node(out, Dest::Push, &c.children[0]);
            out.push(Instr::Popjf {
                label: label_no.clone(),
            });
            self.node(out, Dest::None, &c.children[1]);
            out.push(Instr::Jmp {
                label: label_cleanup.clone(),
            });
            self.label(out, &label_no);
        }
        out.push(Instr::ExceptReraise);

        self.label(out, &label_cleanup);
        emit_except_pop(out, 1);
        self.cstack.pop(fr_except);
        if has_any {
            self.node(out, Dest::None, &nd.children[3]);
        }
        self.label(out, &label_done);
        self.block_pop(out, fr_block, false);
    }

    pub(super) fn raise(&mut self, out: &mut Vec<Instr>, nd: &Node) {
        self.node(out, Dest::Push, &nd.children[0]);
        out.push(Instr::ExceptRaise { src: Loc::Sp(0) });
    }
}
