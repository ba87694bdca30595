//! Back-ends over the IR: the binary instruction-stream encoder and the C
//! source generator.

mod cgen;
mod encoder;
mod output;

#[cfg(test)]
mod cgen_tests;

pub use cgen::write_c;
pub use encoder::{encode, EncodedModule, ListingEntry, RefSite};
pub use output::write_output;

/// Errors from the binary encoder.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmitError {
    /// A function or label name was bound twice.
    #[error("duplicate symbol {0}")]
    DuplicateSymbol(String),

    /// A reference never found its target.
    #[error("undefined symbol {0}")]
    UndefinedSymbol(String),
}
