use std::path::Path;

use umber_compiler::peephole;

pub fn run(input: &Path) {
    let mut module = super::read_module(input);
    peephole::optimize(&mut module);
    super::print_json(&module);
}
