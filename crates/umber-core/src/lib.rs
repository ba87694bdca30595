//! Tagged-tree primitives for the umber compiler.
//!
//! Every compiler pass consumes and produces trees of [`Node`]: a tag, an
//! ordered attribute map, and an ordered child list. Trees serialize to a
//! textual JSON stream between passes, so the passes compose as separate
//! processes.

pub mod num;
pub mod tree;

#[cfg(test)]
mod tree_tests;

pub use num::Num;
pub use tree::Node;
