//! Unit tests for diagnostic rendering and accumulation.

use crate::diagnostics::{DiagnosticKind, Diagnostics};

#[test]
fn accumulates_and_counts() {
    let mut d = Diagnostics::new();
    assert!(d.is_empty());

    d.push(3, DiagnosticKind::UnknownInterface("Ordered".into()));
    d.push(
        9,
        DiagnosticKind::ContextError("continue not within for/while/until/loop".into()),
    );

    assert_eq!(d.error_count(), 2);
    assert_eq!(d.iter().count(), 2);
}

#[test]
fn renders_line_tagged_messages() {
    let mut d = Diagnostics::new();
    d.push(
        4,
        DiagnosticKind::ClassMissingMethod {
            class: "Point".into(),
            method: "norm".into(),
        },
    );

    assert_eq!(
        d.render(),
        "error, line 4: class Point does not implement method norm\n"
    );
}
