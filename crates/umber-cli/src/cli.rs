//! Command definitions for `umberc`.
//!
//! One subcommand per compiler pass; every pass reads a single input path
//! and writes its result to stdout. The process exit code is the
//! accumulated diagnostic count.

use std::path::PathBuf;

use clap::{value_parser, Arg, Command};

/// Input file (positional), shared by every pass.
fn input_arg() -> Arg {
    Arg::new("input")
        .value_name("INPUT")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Input file from the previous pass")
}

pub fn build_cli() -> Command {
    Command::new("umberc")
        .about("Back-end passes for the umber compiler")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("opt")
                .about("Optimize a parse tree (fold constants, classify assignments)")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("gen")
                .about("Lower an optimized tree to VM IR")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("peep")
                .about("Peephole-optimize VM IR")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("encode")
                .about("Encode VM IR into the binary instruction stream")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("cgen")
                .about("Generate C source from VM IR")
                .arg(input_arg()),
        )
}
