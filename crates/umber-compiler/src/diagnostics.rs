//! Diagnostics collection for accumulating compiler messages.
//!
//! Every diagnostic continues compilation so one run reports as many
//! problems as possible; the process exit code is the final error count.

/// What went wrong, with enough payload to render the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagnosticKind {
    #[error("undefined interface {0}")]
    UnknownInterface(String),

    #[error("class {class} does not implement method {method}")]
    ClassMissingMethod { class: String, method: String },

    #[error("class {class} does not implement class method {method}")]
    ClassMissingClassMethod { class: String, method: String },

    #[error("class {class} does not define class variable {var}")]
    ClassMissingClassVar { class: String, var: String },

    #[error("class {class} does not implement interface {iface}")]
    InterfaceMismatch { class: String, iface: String },

    #[error("{0}")]
    ContextError(String),
}

/// A diagnostic anchored to a module-local source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub kind: DiagnosticKind,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error, line {}: {}", self.line, self.kind)
    }
}

/// Collection of diagnostics from a compiler pass.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, line: u32, kind: DiagnosticKind) {
        self.0.push(Diagnostic { line, kind });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    /// One line per diagnostic, for stderr.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.0 {
            out.push_str(&d.to_string());
            out.push('\n');
        }
        out
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
