//! Rendering of the encoded module: the C array literal, a commented
//! listing, and the symbol table.

use std::fmt::Write;

use super::encoder::{EncodedModule, ListingEntry};

/// Render the loadable C array followed by the listing and symbol table.
pub fn write_output(enc: &EncodedModule, module_name: &str) -> String {
    let mut out = String::new();
    write!(out, "const unsigned char __{module_name}_code__[] = {{").unwrap();
    for (i, b) in enc.code.iter().enumerate() {
        if i % 8 == 0 {
            write!(out, "\n/* 0x{i:08x} */ ").unwrap();
        }
        write!(out, "0x{b:02x}, ").unwrap();
    }
    out.push_str("\n};\n");

    out.push_str("/*\nListing\n\n");
    for entry in &enc.listing {
        match entry {
            ListingEntry::FuncHeader(name) | ListingEntry::Label(name) => {
                writeln!(out, "{name}:").unwrap();
            }
            ListingEntry::Instr { text, ofs, len } => {
                writeln!(out, "{text}").unwrap();
                write!(out, "\t{ofs:08x} ").unwrap();
                for b in &enc.code[*ofs..*ofs + *len] {
                    write!(out, "{b:02x} ").unwrap();
                }
                out.push('\n');
            }
        }
    }
    out.push_str("*/\n");

    out.push_str("/*\nSymbol table\n\n");
    let mut symbols: Vec<_> = enc.symbols.iter().collect();
    symbols.sort_by_key(|&(_, &addr)| addr);
    for (name, addr) in symbols {
        writeln!(out, "{name}: 0x{addr:08x}").unwrap();
        let refs: Vec<String> = enc
            .refs
            .iter()
            .filter(|r| &r.name == name)
            .map(|r| format!("0x{:08x}", r.at))
            .collect();
        writeln!(out, "\trefs: [{}]", refs.join(", ")).unwrap();
    }
    out.push_str("*/\n");
    out
}
