//! Unit tests for the C source back-end.

use umber_bytecode::{Func, Instr, Loc, Module, Visibility};

use super::cgen::write_c;

fn func(name: &str, visibility: Visibility, body: Vec<Instr>) -> Func {
    Func {
        name: name.into(),
        argc: 1,
        arrayarg: false,
        visibility,
        body,
    }
}

#[test]
fn private_functions_get_forward_declarations() {
    let m = Module {
        name: "m".into(),
        funcs: vec![
            func("m$f", Visibility::Private, vec![Instr::Retd]),
            func("__m_init__", Visibility::Public, vec![Instr::Retd]),
        ],
    };
    let c = write_c(&m);
    assert!(c.starts_with("#include \"umber_rt.h\"\n"));
    assert!(c.contains(
        "void m$f(umb_thread_t th, umb_inst_t dst, unsigned argc, umb_inst_t argv);"
    ));
    // The public init gets no forward declaration.
    assert!(!c.contains(
        "void __m_init__(umb_thread_t th, umb_inst_t dst, unsigned argc, umb_inst_t argv);"
    ));
}

#[test]
fn arity_check_prologue() {
    let m = Module {
        name: "m".into(),
        funcs: vec![func("f", Visibility::Public, vec![Instr::Retd])],
    };
    let c = write_c(&m);
    assert!(c.contains("umb_method_argc_chk_exact(th, 1);"));
}

#[test]
fn array_rest_prologue() {
    let mut f = func("f", Visibility::Public, vec![Instr::Retd]);
    f.argc = 3;
    f.arrayarg = true;
    let m = Module {
        name: "m".into(),
        funcs: vec![f],
    };
    let c = write_c(&m);
    assert!(c.contains("umb_method_array_arg_push(th, 2);"));
}

#[test]
fn bp_declared_only_when_used() {
    let with_bp = Module {
        name: "m".into(),
        funcs: vec![func(
            "f",
            Visibility::Public,
            vec![Instr::InstAssign {
                dst: Loc::Bp(-1),
                src: Loc::Ap(0),
            }],
        )],
    };
    let c = write_c(&with_bp);
    assert!(c.contains("umb_inst_t __bp = th->sp;"));
    assert!(c.contains("umb_inst_assign(&__bp[-1], &argv[0]);"));

    let without = Module {
        name: "m".into(),
        funcs: vec![func(
            "f",
            Visibility::Public,
            vec![Instr::InstAssign {
                dst: Loc::Sp(0),
                src: Loc::Ap(0),
            }],
        )],
    };
    assert!(!write_c(&without).contains("__bp"));
}

#[test]
fn control_flow_renders_as_labels_and_gotos() {
    let m = Module {
        name: "m".into(),
        funcs: vec![func(
            "f",
            Visibility::Public,
            vec![
                Instr::Label {
                    name: "label1".into(),
                },
                Instr::Popjf {
                    label: "label2".into(),
                },
                Instr::Jmp {
                    label: "label1".into(),
                },
                Instr::Label {
                    name: "label2".into(),
                },
                Instr::Retd,
            ],
        )],
    };
    let c = write_c(&m);
    assert!(c.contains("label1: ;"));
    assert!(c.contains("if (!umb_bool_if(th))  goto label2;"));
    assert!(c.contains("goto label1;"));
}

#[test]
fn exception_frame_uses_setjmp() {
    let m = Module {
        name: "m".into(),
        funcs: vec![func(
            "f",
            Visibility::Public,
            vec![
                Instr::ExceptPush { var: Loc::Bp(-1) },
                Instr::Jx {
                    label: "label1".into(),
                },
                Instr::ExceptPop { cnt: 1 },
                Instr::Label {
                    name: "label1".into(),
                },
            ],
        )],
    };
    let c = write_c(&m);
    assert!(c.contains("setjmp(umb_frame_except_push(th, &__bp[-1]));"));
    assert!(c.contains("if (umb_except_chk(th))  goto label1;"));
    assert!(c.contains("umb_frame_except_pop(th, 1);"));
}

#[test]
fn constants_and_calls_render_runtime_api() {
    let m = Module {
        name: "m".into(),
        funcs: vec![func(
            "f",
            Visibility::Public,
            vec![
                Instr::IntNewc {
                    dst: Loc::Sp(0),
                    val: 42,
                },
                Instr::FloatPushc { val: 2.5 },
                Instr::StrNewch {
                    dst: Loc::Sp(1),
                    val: "norm".into(),
                },
                Instr::MethodCall {
                    dst: Loc::Dst,
                    sel: "add".into(),
                    argc: 2,
                },
                Instr::Retd,
            ],
        )],
    };
    let c = write_c(&m);
    assert!(c.contains("umb_int_newc(&th->sp[0], 42);"));
    assert!(c.contains("umb_float_pushc(th, 2.5);"));
    assert!(c.contains("umb_str_newch(&th->sp[1], _UMB_STR_CONST_HASH(\"norm\"));"));
    assert!(c.contains("umb_method_callsch(th, dst, _UMB_STR_CONST_HASH(\"add\"), 2);"));
    assert!(c.contains("umb_inst_assign(dst, &argv[0]);\nreturn;"));
}
