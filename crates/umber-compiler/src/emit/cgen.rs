//! C source back-end: one call into the runtime C API per IR instruction.
//!
//! Labels become C labels, jumps become gotos, `except_push` wraps the
//! runtime's jump buffer in `setjmp`. Each function opens with an arity
//! check (or the array-rest prologue) and declares a base pointer only when
//! some operand is bp-relative.

use std::fmt::Write;

use umber_bytecode::{Func, Instr, Loc, Module, Visibility};
use umber_core::num::render_float;

/// Render the whole module as a C translation unit.
pub fn write_c(module: &Module) -> String {
    let mut out = String::new();
    out.push_str("#include \"umber_rt.h\"\n");
    for f in &module.funcs {
        if f.visibility == Visibility::Private {
            write!(out, "{};\n", func_decl(f)).unwrap();
        }
    }
    for f in &module.funcs {
        write!(out, "{}\n{{\n", func_decl(f)).unwrap();
        if uses_bp(f) {
            out.push_str("umb_inst_t __bp = th->sp;\n");
        }
        if f.arrayarg {
            writeln!(out, "umb_method_array_arg_push(th, {});", f.argc - 1).unwrap();
        } else {
            writeln!(out, "umb_method_argc_chk_exact(th, {});", f.argc).unwrap();
        }
        for instr in &f.body {
            gen_instr(&mut out, instr);
        }
        out.push_str("}\n");
    }
    out
}

fn func_decl(f: &Func) -> String {
    format!(
        "void {}(umb_thread_t th, umb_inst_t dst, unsigned argc, umb_inst_t argv)",
        f.name
    )
}

fn operand(loc: &Loc) -> String {
    match loc {
        Loc::Dst => "dst".to_string(),
        Loc::Sp(n) => format!("&th->sp[{n}]"),
        Loc::Bp(n) => format!("&__bp[{n}]"),
        Loc::Ap(n) => format!("&argv[{n}]"),
    }
}

fn uses_bp(f: &Func) -> bool {
    f.body.iter().any(|i| {
        use Instr::*;
        let locs: Vec<&Loc> = match i {
            InstAssign { dst, src } => vec![dst, src],
            StackPush { src } | ExceptRaise { src } => vec![src],
            Jt { src, .. } | Jf { src, .. } => vec![src],
            MethodCall { dst, .. }
            | EnvironAt { dst, .. }
            | NilAssign { dst }
            | BoolNewc { dst, .. }
            | IntNewc { dst, .. }
            | FloatNewc { dst, .. }
            | MethodNewc { dst, .. }
            | StrNewc { dst, .. }
            | StrNewch { dst, .. } => vec![dst],
            ExceptPush { var } => vec![var],
            _ => vec![],
        };
        locs.iter().any(|l| matches!(l, Loc::Bp(_)))
    })
}

fn gen_instr(out: &mut String, instr: &Instr) {
    use Instr::*;
    match instr {
        StackAlloc { size } => writeln!(out, "umb_stack_alloc(th, {size});"),
        StackFree { size } => writeln!(out, "umb_stack_free(th, {size});"),
        StackFreeAlloc {
            size_free,
            size_alloc,
        } => writeln!(out, "umb_stack_free_alloc(th, {size_free}, {size_alloc});"),
        InstAssign { dst, src } => {
            writeln!(out, "umb_inst_assign({}, {});", operand(dst), operand(src))
        }
        StackPush { src } => writeln!(out, "umb_stack_push(th, {});", operand(src)),
        MethodCall { dst, sel, argc } => writeln!(
            out,
            "umb_method_callsch(th, {}, _UMB_STR_CONST_HASH(\"{sel}\"), {argc});",
            operand(dst)
        ),
        Ret => writeln!(out, "return;"),
        Retd => {
            out.push_str("umb_inst_assign(dst, &argv[0]);\n");
            writeln!(out, "return;")
        }
        ExceptPush { var } => writeln!(
            out,
            "setjmp(umb_frame_except_push(th, {}));",
            operand(var)
        ),
        ExceptRaise { src } => writeln!(out, "umb_except_raise(th, {});", operand(src)),
        ExceptReraise => writeln!(out, "umb_except_reraise(th);"),
        ExceptPop { cnt } => writeln!(out, "umb_frame_except_pop(th, {cnt});"),
        Jmp { label } => writeln!(out, "goto {label};"),
        Jt { src, label } => writeln!(
            out,
            "if (umb_inst_boolval(th, {}))  goto {label};",
            operand(src)
        ),
        Jf { src, label } => writeln!(
            out,
            "if (!umb_inst_boolval(th, {}))  goto {label};",
            operand(src)
        ),
        Jx { label } => writeln!(out, "if (umb_except_chk(th))  goto {label};"),
        Popjt { label } => writeln!(out, "if (umb_bool_if(th))  goto {label};"),
        Popjf { label } => writeln!(out, "if (!umb_bool_if(th))  goto {label};"),
        EnvironAt { dst, name } => writeln!(
            out,
            "umb_environ_atc(th, {}, _UMB_STR_CONST_HASH(\"{name}\"));",
            operand(dst)
        ),
        EnvironAtPush { name } => writeln!(
            out,
            "umb_environ_atc_push(th, _UMB_STR_CONST_HASH(\"{name}\"));"
        ),
        NilAssign { dst } => writeln!(out, "umb_inst_assign_obj({}, 0);", operand(dst)),
        NilPush => writeln!(out, "umb_stack_push_obj(th, 0);"),
        BoolNewc { dst, val } => writeln!(
            out,
            "umb_bool_newc({}, {});",
            operand(dst),
            i32::from(*val)
        ),
        BoolPushc { val } => writeln!(out, "umb_bool_pushc(th, {});", i32::from(*val)),
        IntNewc { dst, val } => writeln!(out, "umb_int_newc({}, {val});", operand(dst)),
        IntPushc { val } => writeln!(out, "umb_int_pushc(th, {val});"),
        FloatNewc { dst, val } => writeln!(
            out,
            "umb_float_newc({}, {});",
            operand(dst),
            render_float(*val)
        ),
        FloatPushc { val } => writeln!(out, "umb_float_pushc(th, {});", render_float(*val)),
        MethodNewc { dst, func } => {
            writeln!(out, "umb_codemethod_newc({}, {func});", operand(dst))
        }
        MethodPushc { func } => writeln!(out, "umb_codemethod_pushc(th, {func});"),
        StrNewc { dst, val } => writeln!(
            out,
            "umb_str_newc({}, _UMB_STR_CONST(\"{val}\"));",
            operand(dst)
        ),
        StrPushc { val } => writeln!(out, "umb_str_pushc(th, _UMB_STR_CONST(\"{val}\"));"),
        StrNewch { dst, val } => writeln!(
            out,
            "umb_str_newch({}, _UMB_STR_CONST_HASH(\"{val}\"));",
            operand(dst)
        ),
        StrPushch { val } => writeln!(
            out,
            "umb_str_pushch(th, _UMB_STR_CONST_HASH(\"{val}\"));"
        ),
        Label { name } => writeln!(out, "{name}: ;"),
    }
    .expect("string write");
}
