use std::path::Path;

use umber_compiler::r#gen::generate;

pub fn run(input: &Path) {
    let tree = super::read_tree(input);
    let (module, diags) = generate(&tree);
    eprint!("{}", diags.render());
    super::print_json(&module);
    std::process::exit(diags.error_count() as i32);
}
