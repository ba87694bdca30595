//! Peephole optimizer over the flat IR.
//!
//! Runs per function. Adjacent stack adjustments coalesce into single
//! instructions; code between an unconditional control transfer and the
//! next label is unreachable and dropped. The pass is idempotent.

use umber_bytecode::{Instr, Module};

/// Optimize every function in the module.
pub fn optimize(module: &mut Module) {
    for f in &mut module.funcs {
        f.body = optimize_body(std::mem::take(&mut f.body));
    }
}

/// One peephole pass over a function body.
///
/// `last` holds the most recent kept instruction so a fusion can rewrite it
/// before it is committed; `dead` is set after `jmp`/`ret` and cleared by
/// the next label.
fn optimize_body(body: Vec<Instr>) -> Vec<Instr> {
    let mut out = Vec::with_capacity(body.len());
    let mut last: Option<Instr> = None;
    let mut dead = false;

    for instr in body {
        if instr.is_label() {
            dead = false;
        }
        if dead {
            continue;
        }

        match (last.take(), instr) {
            (Some(Instr::StackAlloc { size: a }), Instr::StackAlloc { size: b }) => {
                last = Some(Instr::StackAlloc { size: a + b });
            }
            (Some(Instr::StackFree { size: a }), Instr::StackFree { size: b }) => {
                last = Some(Instr::StackFree { size: a + b });
            }
            (Some(Instr::StackFree { size: a }), Instr::StackAlloc { size: b }) => {
                last = Some(Instr::StackFreeAlloc {
                    size_free: a,
                    size_alloc: b,
                });
            }
            (
                Some(Instr::StackFreeAlloc {
                    size_free,
                    size_alloc,
                }),
                Instr::StackAlloc { size },
            ) => {
                last = Some(Instr::StackFreeAlloc {
                    size_free,
                    size_alloc: size_alloc + size,
                });
            }
            (Some(Instr::StackFree { .. }), Instr::Ret) => {
                // ret unwinds the activation record; the free is redundant.
                dead = true;
                last = Some(Instr::Ret);
            }
            (prev, instr) => {
                if matches!(instr, Instr::Jmp { .. } | Instr::Ret) {
                    dead = true;
                }
                if let Some(p) = prev {
                    out.push(p);
                }
                last = Some(instr);
            }
        }
    }
    if let Some(l) = last {
        out.push(l);
    }
    out
}
