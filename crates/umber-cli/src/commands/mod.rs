//! Pass entry points: read the input, run the pass, print to stdout.

pub mod cgen;
pub mod encode;
pub mod r#gen;
pub mod opt;
pub mod peep;

use std::path::Path;

use umber_bytecode::Module;
use umber_core::Node;

fn read_input(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Read a tagged-tree input (output of the front-end or the opt pass).
fn read_tree(path: &Path) -> Node {
    match serde_json::from_str(&read_input(path)) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("error: malformed tree input {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Read an IR module input (output of the gen or peep pass).
fn read_module(path: &Path) -> Module {
    match serde_json::from_str(&read_input(path)) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("error: malformed IR input {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).expect("serializable pass output")
    );
}
