use std::path::Path;

use umber_compiler::optimize::optimize;

pub fn run(input: &Path) {
    let tree = super::read_tree(input);
    super::print_json(&optimize(&tree));
}
