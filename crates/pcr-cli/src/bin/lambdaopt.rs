// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_cli::flags::{ensure_no_inline_value, split_flag, take_flag_value};
use pcr_cli::{CliError, emit_structured_error, mm};
use pcr_denoise::{lambda_max, lambda_opt};
use std::env;
use std::path::PathBuf;
use std::process;

struct Args {
    input: PathBuf,
    lambda_max_only: bool,
    debug: bool,
}

fn print_help() {
    println!(
        "lambdaopt {}\n\n\
         Selects a total-variation regularisation weight for a noisy vector.\n\n\
         USAGE:\n  lambdaopt --input <path> [OPTIONS]\n\n\
         OPTIONS:\n  \
         --input <path>   Matrix-Market vector with the noisy samples (required)\n  \
         --lambdamax      Print the closed-form upper bound instead of the operating point\n  \
         --debug          Print debug output to stderr\n  \
         -h, --help       Show this help\n  \
         -V, --version    Show the version",
        env!("CARGO_PKG_VERSION")
    );
}

fn parse_args(tokens: &[String]) -> Result<Option<Args>, CliError> {
    let mut input: Option<PathBuf> = None;
    let mut lambda_max_only = false;
    let mut debug = false;

    let mut index = 0usize;
    while index < tokens.len() {
        if matches!(tokens[index].as_str(), "-h" | "--help") {
            print_help();
            return Ok(None);
        }
        if matches!(tokens[index].as_str(), "-V" | "--version") {
            println!("lambdaopt {}", env!("CARGO_PKG_VERSION"));
            return Ok(None);
        }

        let (flag, inline_value) = split_flag(tokens[index].as_str())?;
        match flag {
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                input = Some(PathBuf::from(raw));
            }
            "--lambdamax" => {
                ensure_no_inline_value(flag, inline_value)?;
                lambda_max_only = true;
            }
            "--debug" => {
                ensure_no_inline_value(flag, inline_value)?;
                debug = true;
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown lambdaopt option '{other}'"
                )));
            }
        }
        index += 1;
    }

    let input =
        input.ok_or_else(|| CliError::invalid_input("lambdaopt requires --input <path>"))?;

    Ok(Some(Args {
        input,
        lambda_max_only,
        debug,
    }))
}

fn run() -> Result<(), CliError> {
    let tokens: Vec<String> = env::args().skip(1).collect();
    let Some(args) = parse_args(&tokens)? else {
        return Ok(());
    };

    let input = mm::read_vector(args.input.as_path())?;
    let bound = lambda_max(&input)?;
    if args.debug {
        eprintln!("<debug> lambda_max = {bound}");
    }

    if args.lambda_max_only {
        println!("{bound}");
        return Ok(());
    }

    let selected = lambda_opt(&input, bound)?;
    println!("{selected}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(err.exit_code());
    }
}
