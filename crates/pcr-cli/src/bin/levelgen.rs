// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_cli::flags::{
    ensure_no_inline_value, parse_f64_arg, parse_usize_arg, split_flag, take_flag_value,
};
use pcr_cli::{CliError, emit_structured_error, mm, open_output};
use pcr_core::{levels_by_count, levels_by_distance};
use std::env;
use std::path::PathBuf;
use std::process;

enum Spacing {
    Distance(f64),
    Count(usize),
}

struct Args {
    input: PathBuf,
    output: String,
    spacing: Spacing,
    debug: bool,
}

fn print_help() {
    println!(
        "levelgen {}\n\n\
         Generates a linearly spaced level vector from the input range.\n\n\
         USAGE:\n  levelgen --input <path> (--level-distance <float> | --level-number <count>) [OPTIONS]\n\n\
         OPTIONS:\n  \
         --input <path>            Matrix-Market vector to take the range from (required)\n  \
         --output <path>           Output level vector; '-' writes to stdout (default: -)\n  \
         --level-distance <float>  Spacing between adjacent levels\n  \
         --level-number <count>    Number of linearly spaced levels\n  \
         --debug                   Print debug output to stderr\n  \
         -h, --help                Show this help\n  \
         -V, --version             Show the version",
        env!("CARGO_PKG_VERSION")
    );
}

fn parse_args(tokens: &[String]) -> Result<Option<Args>, CliError> {
    let mut input: Option<PathBuf> = None;
    let mut output = "-".to_string();
    let mut distance: Option<f64> = None;
    let mut count: Option<usize> = None;
    let mut debug = false;

    let mut index = 0usize;
    while index < tokens.len() {
        if matches!(tokens[index].as_str(), "-h" | "--help") {
            print_help();
            return Ok(None);
        }
        if matches!(tokens[index].as_str(), "-V" | "--version") {
            println!("levelgen {}", env!("CARGO_PKG_VERSION"));
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
            "--level-distance" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                distance = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--level-number" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                count = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--debug" => {
                ensure_no_inline_value(flag, inline_value)?;
                debug = true;
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown levelgen option '{other}'"
                )));
            }
        }
        index += 1;
    }

    let input = input.ok_or_else(|| CliError::invalid_input("levelgen requires --input <path>"))?;
    let spacing = match (distance, count) {
        (Some(distance), None) => Spacing::Distance(distance),
        (None, Some(count)) => Spacing::Count(count),
        (Some(_), Some(_)) => {
            return Err(CliError::invalid_input(
                "--level-distance and --level-number are mutually exclusive",
            ));
        }
        (None, None) => {
            return Err(CliError::invalid_input(
                "levelgen requires either --level-distance or --level-number",
            ));
        }
    };

    Ok(Some(Args {
        input,
        output,
        spacing,
        debug,
    }))
}

fn run() -> Result<(), CliError> {
    let tokens: Vec<String> = env::args().skip(1).collect();
    let Some(args) = parse_args(&tokens)? else {
        return Ok(());
    };

    let input = mm::read_vector(args.input.as_path())?;
    let levels = match args.spacing {
        Spacing::Distance(distance) => levels_by_distance(&input, distance)?,
        Spacing::Count(count) => levels_by_count(&input, count)?,
    };
    if args.debug {
        eprintln!("<debug> generated {} levels", levels.len());
    }

    let mut writer = open_output(args.output.as_str())?;
    mm::write_vector(&mut writer, &levels)
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(err.exit_code());
    }
}
