use std::path::Path;

use umber_compiler::emit::{encode, write_output};

pub fn run(input: &Path) {
    let module = super::read_module(input);
    let encoded = match encode(&module) {
        Ok(encoded) => encoded,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    print!("{}", write_output(&encoded, &module.name));
}
