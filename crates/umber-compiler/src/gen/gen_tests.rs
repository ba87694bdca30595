//! Unit tests for the IR generator.

use umber_bytecode::{Instr, Loc, Visibility};
use umber_core::Node;

use crate::diagnostics::DiagnosticKind;

use super::generate;

fn sym(v: &str) -> Node {
    Node::new("sym").attr("val", v).attr("line", "1")
}

fn var(name: &str) -> Node {
    Node::new("obj1").attr("line", "1").child(sym(name))
}

fn int(v: i64) -> Node {
    Node::new("int").attr("val", v.to_string()).attr("line", "1")
}

fn op(tag: &str, children: Vec<Node>) -> Node {
    let mut n = Node::new(tag).attr("line", "1");
    n.children = children;
    n
}

fn block(stmts: Vec<Node>) -> Node {
    op("block", stmts)
}

fn method(name: &str, params: &[&str], body: Vec<Node>) -> Node {
    let mut args = Node::new("args");
    args.children = params.iter().map(|p| sym(p)).collect();
    op(
        "method",
        vec![op("methoddecl", vec![sym(name), args]), block(body)],
    )
}

fn module(children: Vec<Node>) -> Node {
    let mut m = Node::new("module").attr("val", "m").attr("line", "1");
    m.children = children;
    m
}

/// Find the compiled function by name.
fn func<'a>(m: &'a umber_bytecode::Module, name: &str) -> &'a umber_bytecode::Func {
    m.funcs
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no function {name}"))
}

#[test]
fn short_circuit_land_loads_each_operand_once() {
    let tree = module(vec![method(
        "f",
        &["a", "b"],
        vec![op("land", vec![var("a"), var("b")])],
    )]);
    let (m, diags) = generate(&tree);
    assert!(diags.is_empty());

    let f = func(&m, "m$f");
    assert_eq!(
        f.body,
        vec![
            Instr::StackAlloc { size: 1 },
            Instr::InstAssign {
                dst: Loc::Sp(0),
                src: Loc::Ap(0)
            },
            Instr::Jf {
                src: Loc::Sp(0),
                label: "label1".into()
            },
            Instr::InstAssign {
                dst: Loc::Sp(0),
                src: Loc::Ap(1)
            },
            Instr::Label {
                name: "label1".into()
            },
            Instr::StackFree { size: 1 },
            Instr::Retd,
        ]
    );
}

#[test]
fn lor_jumps_on_true() {
    let tree = module(vec![method(
        "f",
        &["a", "b"],
        vec![op("lor", vec![var("a"), var("b")])],
    )]);
    let (m, _) = generate(&tree);
    let f = func(&m, "m$f");
    assert!(f.body.iter().any(|i| matches!(i, Instr::Jt { .. })));
    assert!(!f.body.iter().any(|i| matches!(i, Instr::Jf { .. })));
}

#[test]
fn break_unwinds_exception_and_block_slots() {
    // for x in xs { try e { break 1 } catches {} }
    let try_stmt = op(
        "try",
        vec![
            sym("e"),
            block(vec![op("break", vec![]).attr("val", "1")]),
            Node::new("catches"),
        ],
    );
    let for_stmt = op("for", vec![sym("x"), var("xs"), block(vec![try_stmt])]);
    let tree = module(vec![method("f", &["xs"], vec![for_stmt])]);

    let (m, diags) = generate(&tree);
    assert!(diags.is_empty());
    let f = func(&m, "m$f");

    // The break unwinds the exception frame, then every block slot between
    // it and the loop (the binder slot and the iterator slot), then jumps.
    let pos = f
        .body
        .windows(3)
        .position(|w| {
            matches!(
                w,
                [
                    Instr::ExceptPop { cnt: 1 },
                    Instr::StackFree { size: 2 },
                    Instr::Jmp { .. }
                ]
            )
        })
        .expect("break unwinding sequence not found");
    let Instr::Jmp { label } = &f.body[pos + 2] else {
        unreachable!()
    };
    // The exit label lands after the loop.
    let exit_at = f
        .body
        .iter()
        .position(|i| matches!(i, Instr::Label { name } if name == label))
        .expect("exit label bound");
    assert!(exit_at > pos);
}

#[test]
fn return_lowers_into_abstract_destination() {
    let tree = module(vec![method("f", &[], vec![op("return", vec![int(5)])])]);
    let (m, _) = generate(&tree);
    let f = func(&m, "m$f");
    assert_eq!(
        f.body,
        vec![
            Instr::IntNewc {
                dst: Loc::Dst,
                val: 5
            },
            Instr::Ret,
            Instr::Retd,
        ]
    );
}

#[test]
fn empty_return_is_retd() {
    let tree = module(vec![method("f", &[], vec![op("return", vec![])])]);
    let (m, _) = generate(&tree);
    assert_eq!(func(&m, "m$f").body, vec![Instr::Retd, Instr::Retd]);
}

#[test]
fn variable_reads_prefer_locals_over_environment() {
    let tree = module(vec![method(
        "f",
        &["p"],
        vec![op("return", vec![var("p")]), op("return", vec![var("g")])],
    )]);
    let (m, _) = generate(&tree);
    let f = func(&m, "m$f");
    assert_eq!(
        f.body[0],
        Instr::InstAssign {
            dst: Loc::Dst,
            src: Loc::Ap(0)
        }
    );
    assert_eq!(
        f.body[2],
        Instr::EnvironAt {
            dst: Loc::Dst,
            name: "g".into()
        }
    );
}

#[test]
fn constant_assignment_stores_into_declared_slot() {
    let assign = op("assign1c", vec![var("x"), int(5)]);
    let tree = module(vec![method("f", &[], vec![assign])]);
    let (m, _) = generate(&tree);
    assert_eq!(
        func(&m, "m$f").body,
        vec![
            Instr::StackAlloc { size: 1 },
            Instr::IntNewc {
                dst: Loc::Bp(-1),
                val: 5
            },
            Instr::Retd,
        ]
    );
}

#[test]
fn alias_assignment_copies_slot_or_falls_back_to_environment() {
    let local = op("assign11", vec![var("x"), var("p")]);
    let global = op("assign11", vec![var("y"), var("g")]);
    let tree = module(vec![method("f", &["p"], vec![local, global])]);
    let (m, _) = generate(&tree);
    let f = func(&m, "m$f");
    assert_eq!(
        f.body[1],
        Instr::InstAssign {
            dst: Loc::Bp(-1),
            src: Loc::Ap(0)
        }
    );
    assert_eq!(
        f.body[2],
        Instr::EnvironAt {
            dst: Loc::Bp(-2),
            name: "g".into()
        }
    );
}

#[test]
fn general_assignment_lowers_rhs_into_slot() {
    let assign = op("assign1", vec![var("x"), op("add", vec![var("p"), int(1)])]);
    let tree = module(vec![method("f", &["p"], vec![assign])]);
    let (m, _) = generate(&tree);
    let f = func(&m, "m$f");
    // add chain delivers its result straight into x's slot.
    assert!(f.body.contains(&Instr::MethodCall {
        dst: Loc::Bp(-1),
        sel: "add".into(),
        argc: 2
    }));
}

#[test]
fn methodcall_builds_argument_frame() {
    let call = op(
        "methodcall",
        vec![var("r"), sym("put"), op("args", vec![int(1)])],
    );
    let tree = module(vec![method("f", &["r"], vec![call])]);
    let (m, _) = generate(&tree);
    assert_eq!(
        func(&m, "m$f").body,
        vec![
            Instr::StackAlloc { size: 1 },
            Instr::StackAlloc { size: 2 },
            Instr::InstAssign {
                dst: Loc::Sp(0),
                src: Loc::Ap(0)
            },
            Instr::IntNewc {
                dst: Loc::Sp(1),
                val: 1
            },
            Instr::MethodCall {
                dst: Loc::Sp(2),
                sel: "put".into(),
                argc: 2
            },
            Instr::StackFree { size: 2 },
            Instr::StackFree { size: 1 },
            Instr::Retd,
        ]
    );
}

#[test]
fn if_else_shape() {
    let stmt = op(
        "if",
        vec![
            var("p"),
            block(vec![op("return", vec![int(1)])]),
            block(vec![op("return", vec![int(2)])]),
        ],
    );
    let tree = module(vec![method("f", &["p"], vec![stmt])]);
    let (m, _) = generate(&tree);
    assert_eq!(
        func(&m, "m$f").body,
        vec![
            Instr::StackPush { src: Loc::Ap(0) },
            Instr::Popjf {
                label: "label1".into()
            },
            Instr::IntNewc {
                dst: Loc::Dst,
                val: 1
            },
            Instr::Ret,
            Instr::Jmp {
                label: "label2".into()
            },
            Instr::Label {
                name: "label1".into()
            },
            Instr::IntNewc {
                dst: Loc::Dst,
                val: 2
            },
            Instr::Ret,
            Instr::Label {
                name: "label2".into()
            },
            Instr::Retd,
        ]
    );
}

#[test]
fn for_loop_shape() {
    let stmt = op("for", vec![sym("x"), var("xs"), block(vec![])]);
    let tree = module(vec![method("f", &["xs"], vec![stmt])]);
    let (m, _) = generate(&tree);
    assert_eq!(
        func(&m, "m$f").body,
        vec![
            // Binder slot declared by the enclosing block scan.
            Instr::StackAlloc { size: 1 },
            Instr::StackPush { src: Loc::Ap(0) },
            Instr::MethodCall {
                dst: Loc::Sp(0),
                sel: "List".into(),
                argc: 1
            },
            Instr::Label {
                name: "label3".into()
            },
            Instr::StackPush { src: Loc::Sp(0) },
            Instr::MethodCall {
                dst: Loc::Sp(0),
                sel: "isnil".into(),
                argc: 1
            },
            Instr::Popjt {
                label: "label4".into()
            },
            Instr::MethodCall {
                dst: Loc::Bp(-1),
                sel: "car".into(),
                argc: 1
            },
            Instr::MethodCall {
                dst: Loc::Sp(0),
                sel: "cdr".into(),
                argc: 1
            },
            Instr::Jmp {
                label: "label3".into()
            },
            Instr::Label {
                name: "label4".into()
            },
            Instr::StackFree { size: 1 },
            Instr::Retd,
        ]
    );
}

#[test]
fn while_tests_condition_last() {
    let stmt = op("while", vec![var("p"), block(vec![])]);
    let tree = module(vec![method("f", &["p"], vec![stmt])]);
    let (m, _) = generate(&tree);
    assert_eq!(
        func(&m, "m$f").body,
        vec![
            Instr::Jmp {
                label: "label2".into()
            },
            Instr::Label {
                name: "label3".into()
            },
            Instr::Label {
                name: "label2".into()
            },
            Instr::StackPush { src: Loc::Ap(0) },
            Instr::Popjt {
                label: "label3".into()
            },
            Instr::Retd,
        ]
    );
}

#[test]
fn method_names_compose_through_classes_and_namespaces() {
    let cls = op(
        "class",
        vec![
            sym("Point"),
            Node::new("nil").attr("line", "1"),
            Node::new("ifaces"),
            op("classbody", vec![method("norm", &[], vec![])]),
        ],
    );
    let ns = op("namespace", vec![sym("geo"), op("nsbody", vec![cls])]);
    let tree = module(vec![ns]);
    let (m, diags) = generate(&tree);
    assert!(diags.is_empty());

    let f = func(&m, "m$geo$Point$norm");
    assert_eq!(f.visibility, Visibility::Private);
    assert_eq!(f.argc, 0);

    // Init registers the method on the class under construction.
    let init = func(&m, "__m_init__");
    assert_eq!(init.visibility, Visibility::Public);
    let reg = init
        .body
        .windows(6)
        .any(|w| {
            matches!(
                w,
                [
                    Instr::InstAssign { dst: Loc::Sp(0), src: Loc::Sp(3) },
                    Instr::MethodCall { dst: Loc::Sp(0), sel, argc: 1 },
                    Instr::StrNewch { dst: Loc::Sp(1), val },
                    Instr::MethodNewc { dst: Loc::Sp(2), func },
                    Instr::MethodCall { dst: Loc::Sp(2), sel: sel2, argc: 3 },
                    Instr::StackFree { size: 3 },
                ] if sel == "methods" && val == "norm"
                    && func == "m$geo$Point$norm" && sel2 == "atput"
            )
        });
    assert!(reg, "method registration sequence not found in init");
}

#[test]
fn class_construction_shape() {
    let cls = op(
        "class",
        vec![
            sym("Point"),
            Node::new("nil").attr("line", "1"),
            Node::new("ifaces"),
            Node::new("classbody"),
        ],
    );
    let tree = module(vec![cls]);
    let (m, _) = generate(&tree);
    assert_eq!(
        func(&m, "__m_init__").body,
        vec![
            Instr::StackAlloc { size: 5 },
            Instr::EnvironAt {
                dst: Loc::Sp(0),
                name: "#Metaclass".into()
            },
            Instr::StrNewch {
                dst: Loc::Sp(1),
                val: "Point".into()
            },
            Instr::NilAssign { dst: Loc::Sp(2) },
            Instr::InstAssign {
                dst: Loc::Sp(3),
                src: Loc::Ap(0)
            },
            Instr::MethodCall {
                dst: Loc::Sp(4),
                sel: "new".into(),
                argc: 4
            },
            Instr::StackFree { size: 4 },
            Instr::StackFree { size: 1 },
            Instr::Retd,
        ]
    );
}

#[test]
fn anonymous_functions_land_in_anon_section_first() {
    let anon = op("anon", vec![Node::new("args"), block(vec![])]);
    let tree = module(vec![
        method("f", &[], vec![op("return", vec![anon])]),
    ]);
    let (m, _) = generate(&tree);

    assert_eq!(m.funcs[0].name, "m$__anon__$1");
    assert_eq!(m.funcs[1].name, "m$f");
    assert_eq!(m.funcs[2].name, "__m_init__");

    // Use site materializes the closure into the abstract destination.
    assert!(func(&m, "m$f").body.contains(&Instr::MethodNewc {
        dst: Loc::Dst,
        func: "m$__anon__$1".into()
    }));
}

#[test]
fn array_rest_parameter_marks_function() {
    let mut args = Node::new("args");
    args.children = vec![sym("a"), op("methodarrayarg", vec![sym("rest")])];
    let meth = op(
        "method",
        vec![
            op("methoddecl", vec![sym("f"), args]),
            block(vec![op("return", vec![var("rest")])]),
        ],
    );
    let tree = module(vec![meth]);
    let (m, _) = generate(&tree);

    let f = func(&m, "m$f");
    assert!(f.arrayarg);
    assert_eq!(f.argc, 2);
    // The rest parameter lives in the reserved local slot.
    assert_eq!(
        f.body[0],
        Instr::InstAssign {
            dst: Loc::Dst,
            src: Loc::Bp(-1)
        }
    );
}

#[test]
fn break_outside_loop_is_a_context_error() {
    let tree = module(vec![method(
        "f",
        &[],
        vec![op("break", vec![]).attr("val", "1")],
    )]);
    let (_, diags) = generate(&tree);
    assert_eq!(diags.error_count(), 1);
    assert!(matches!(
        &diags.as_slice()[0].kind,
        DiagnosticKind::ContextError(_)
    ));
}

#[test]
fn continue_outside_loop_is_a_context_error() {
    let tree = module(vec![method("f", &[], vec![op("continue", vec![])])]);
    let (_, diags) = generate(&tree);
    assert_eq!(diags.error_count(), 1);
}

#[test]
fn missing_interface_method_produces_diagnostics() {
    let iface = op(
        "iface",
        vec![
            sym("Ordered"),
            Node::new("parents"),
            op(
                "decls",
                vec![op("methoddecl", vec![sym("lt"), op("args", vec![sym("o")])])],
            ),
        ],
    );
    let cls = op(
        "class",
        vec![
            sym("Point"),
            Node::new("nil").attr("line", "1"),
            op("ifaces", vec![sym("Ordered")]),
            Node::new("classbody"),
        ],
    );
    let tree = module(vec![iface, cls]);
    let (_, diags) = generate(&tree);

    let kinds: Vec<_> = diags.iter().map(|d| &d.kind).collect();
    assert!(kinds.iter().any(|k| matches!(
        k,
        DiagnosticKind::ClassMissingMethod { class, method }
            if class == "Point" && method == "lt"
    )));
    assert!(kinds
        .iter()
        .any(|k| matches!(k, DiagnosticKind::InterfaceMismatch { .. })));
}

#[test]
fn matching_interface_is_clean() {
    let decl = |params: Vec<Node>| {
        op("methoddecl", vec![sym("lt"), op("args", params)])
    };
    let iface = op(
        "iface",
        vec![
            sym("Ordered"),
            Node::new("parents"),
            op("decls", vec![decl(vec![sym("other")])]),
        ],
    );
    // Same arity, different parameter name: still a structural match.
    let meth = op("method", vec![decl(vec![sym("o")]), block(vec![])]);
    let cls = op(
        "class",
        vec![
            sym("Point"),
            Node::new("nil").attr("line", "1"),
            op("ifaces", vec![sym("Ordered")]),
            op("classbody", vec![meth]),
        ],
    );
    let tree = module(vec![iface, cls]);
    let (_, diags) = generate(&tree);
    assert!(diags.is_empty(), "unexpected: {}", diags.render());
}

#[test]
fn unknown_interface_reported() {
    let cls = op(
        "class",
        vec![
            sym("Point"),
            Node::new("nil").attr("line", "1"),
            op("ifaces", vec![sym("Missing")]),
            Node::new("classbody"),
        ],
    );
    let tree = module(vec![cls]);
    let (_, diags) = generate(&tree);
    assert!(diags
        .iter()
        .any(|d| matches!(&d.kind, DiagnosticKind::UnknownInterface(n) if n == "Missing")));
}

#[test]
fn top_level_assignment_writes_module_attribute() {
    let assign = op("assign1c", vec![var("version"), int(3)]);
    let tree = module(vec![assign]);
    let (m, _) = generate(&tree);
    assert_eq!(
        func(&m, "__m_init__").body,
        vec![
            Instr::IntPushc { val: 3 },
            Instr::StrPushch {
                val: "version".into()
            },
            Instr::StackPush { src: Loc::Sp(2) },
            Instr::MethodCall {
                dst: Loc::Sp(2),
                sel: "atput".into(),
                argc: 3
            },
            Instr::StackFree { size: 3 },
            Instr::Retd,
        ]
    );
}
