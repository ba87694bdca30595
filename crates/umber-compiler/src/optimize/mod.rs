//! Tree optimizer pass.
//!
//! Rewrites the parse tree bottom-up with identical semantics:
//! - Flattens nested `add`/`mul`/`land`/`lor`/`band`/`bor`/`bxor` chains
//! - Collects and folds constant operands, dropping additive zeros and
//!   multiplicative ones
//! - Re-tags bare-name assignments to expose constant/alias shapes to the
//!   generator (`assign1c`, `assign11`, `assign1`)

mod fold;


pub use fold::optimize;
