// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_cli::flags::{ensure_no_inline_value, parse_f64_arg, split_flag, take_flag_value};
use pcr_cli::{CliError, emit_structured_error, mm, open_output};
use pcr_denoise::tv1d_denoise;
use std::env;
use std::path::PathBuf;
use std::process;

struct Args {
    input: PathBuf,
    output: String,
    lambda: f64,
    debug: bool,
}

fn print_help() {
    println!(
        "denoise {}\n\n\
         Exact 1D total-variation denoising of a Matrix-Market vector.\n\n\
         USAGE:\n  denoise --input <path> --lambda <float> [OPTIONS]\n\n\
         OPTIONS:\n  \
         --input <path>     Matrix-Market vector with the noisy samples (required)\n  \
         --output <path>    Output vector; '-' writes to stdout (default: -)\n  \
         --lambda <float>   Regularisation weight of the TV term (required)\n  \
         --debug            Print debug output to stderr\n  \
         -h, --help         Show this help\n  \
         -V, --version      Show the version",
        env!("CARGO_PKG_VERSION")
    );
}

fn parse_args(tokens: &[String]) -> Result<Option<Args>, CliError> {
    let mut input: Option<PathBuf> = None;
    let mut output = "-".to_string();
    let mut lambda: Option<f64> = None;
    let mut debug = false;

    let mut index = 0usize;
    while index < tokens.len() {
        if matches!(tokens[index].as_str(), "-h" | "--help") {
            print_help();
            return Ok(None);
        }
        if matches!(tokens[index].as_str(), "-V" | "--version") {
            println!("denoise {}", env!("CARGO_PKG_VERSION"));
            return Ok(None);
        }

        let (flag, inline_value) = split_flag(tokens[index].as_str())?;
        match flag {
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                input = Some(PathBuf::from(raw));
            }
            "--output" => {
                output = take_flag_value(flag, inline_value, tokens, &mut index)?;
            }
            "--lambda" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                lambda = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--debug" => {
                ensure_no_inline_value(flag, inline_value)?;
                debug = true;
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown denoise option '{other}'"
                )));
            }
        }
        index += 1;
    }

    let input = input.ok_or_else(|| CliError::invalid_input("denoise requires --input <path>"))?;
    let lambda =
        lambda.ok_or_else(|| CliError::invalid_input("denoise requires --lambda <float>"))?;

    Ok(Some(Args {
        input,
        output,
        lambda,
        debug,
    }))
}

fn run() -> Result<(), CliError> {
    let tokens: Vec<String> = env::args().skip(1).collect();
    let Some(args) = parse_args(&tokens)? else {
        return Ok(());
    };

    let input = mm::read_vector(args.input.as_path())?;
    if args.debug {
        eprintln!("<debug> loaded {} samples", input.len());
    }

    let output = tv1d_denoise(&input, args.lambda)?;

    let mut writer = open_output(args.output.as_str())?;
    mm::write_vector(&mut writer, &output)
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(err.exit_code());
    }
}
