use std::path::Path;

use umber_compiler::emit::write_c;

pub fn run(input: &Path) {
    let module = super::read_module(input);
    print!("{}", write_c(&module));
}
