mod cli;
mod commands;

use std::path::PathBuf;

fn main() {
    let matches = cli::build_cli().get_matches();

    let (name, m) = matches.subcommand().expect("subcommand is required");
    let input: &PathBuf = m.get_one("input").expect("input is required");

    match name {
        "opt" => commands::opt::run(input),
        "gen" => commands::r#gen::run(input),
        "peep" => commands::peep::run(input),
        "encode" => commands::encode::run(input),
        "cgen" => commands::cgen::run(input),
        _ => unreachable!("clap should have caught this"),
    }
}
