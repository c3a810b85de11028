// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_cli::flags::{
    ensure_no_inline_value, parse_f64_arg, parse_i64_arg, parse_u64_arg, split_flag,
    take_flag_value,
};
use pcr_cli::{
    CliError, ReconstructionParams, StderrTrace, emit_structured_error, mm, open_output,
    reconstruct,
};
use pcr_core::Lambdas;
use pcr_graph::EnergyGraph;
use pcr_labeling::MoveRecord;
use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

struct Args {
    input: PathBuf,
    levels: PathBuf,
    output: String,
    rho_d: f64,
    rho_s: f64,
    rho_p: f64,
    prior_distance: Option<f64>,
    assignments: bool,
    max_iterations: i64,
    seed: u64,
    debug: bool,
    debug_graphstructure: bool,
}

fn print_help() {
    println!(
        "graphproc {}\n\n\
         Assigns each run of a piecewise-constant vector to a discrete level\n\
         by alpha-expansion on s-t min-cuts.\n\n\
         USAGE:\n  graphproc --input <path> --levels <path> [OPTIONS]\n\n\
         OPTIONS:\n  \
         --input <path>            Matrix-Market vector with the denoised samples (required)\n  \
         --levels <path>           Matrix-Market vector with the admissible levels (required)\n  \
         --output <path>           Output; '-' writes to stdout (default: -)\n  \
         --rho-d <float>           Data term regularisation (default: 100)\n  \
         --rho-s <float>           Smoothness term regularisation (default: 10)\n  \
         --rho-p <float>           Prior term regularisation (default: 0)\n  \
         --prior-distance <float>  Jump height the prior term does not penalise;\n                            \
         required when --rho-p is non-zero\n  \
         --assignments             Output the (level, run length) matrix instead of the\n                            \
         expanded vector\n  \
         --maxiter <int>           Sweep iteration bound; negative selects the\n                            \
         backtracking scheduler (default: -1)\n  \
         --seed <int>              Seed of the engine RNG (default: 0)\n  \
         --debug                   Print engine traces and run diagnostics to stderr\n  \
         --debug-graphstructure    Dump each move's energy graph in graphviz dot notation\n  \
         -h, --help                Show this help\n  \
         -V, --version             Show the version",
        env!("CARGO_PKG_VERSION")
    );
}

fn parse_args(tokens: &[String]) -> Result<Option<Args>, CliError> {
    let mut input: Option<PathBuf> = None;
    let mut levels: Option<PathBuf> = None;
    let mut output = "-".to_string();
    let mut rho_d = 100.0;
    let mut rho_s = 10.0;
    let mut rho_p = 0.0;
    let mut prior_distance: Option<f64> = None;
    let mut assignments = false;
    let mut max_iterations = -1i64;
    let mut seed = 0u64;
    let mut debug = false;
    let mut debug_graphstructure = false;

    let mut index = 0usize;
    while index < tokens.len() {
        if matches!(tokens[index].as_str(), "-h" | "--help") {
            print_help();
            return Ok(None);
        }
        if matches!(tokens[index].as_str(), "-V" | "--version") {
            println!("graphproc {}", env!("CARGO_PKG_VERSION"));
            return Ok(None);
        }

        let (flag, inline_value) = split_flag(tokens[index].as_str())?;
        match flag {
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                input = Some(PathBuf::from(raw));
            }
            "--levels" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                levels = Some(PathBuf::from(raw));
            }
            "--output" => {
                output = take_flag_value(flag, inline_value, tokens, &mut index)?;
            }
            "--rho-d" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                rho_d = parse_f64_arg(raw.as_str(), flag)?;
            }
            "--rho-s" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                rho_s = parse_f64_arg(raw.as_str(), flag)?;
            }
            "--rho-p" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                rho_p = parse_f64_arg(raw.as_str(), flag)?;
            }
            "--prior-distance" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                prior_distance = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--assignments" => {
                ensure_no_inline_value(flag, inline_value)?;
                assignments = true;
            }
            "--maxiter" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                max_iterations = parse_i64_arg(raw.as_str(), flag)?;
            }
            "--seed" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut index)?;
                seed = parse_u64_arg(raw.as_str(), flag)?;
            }
            "--debug" => {
                ensure_no_inline_value(flag, inline_value)?;
                debug = true;
            }
            "--debug-graphstructure" => {
                ensure_no_inline_value(flag, inline_value)?;
                debug_graphstructure = true;
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown graphproc option '{other}'"
                )));
            }
        }
        index += 1;
    }

    let input =
        input.ok_or_else(|| CliError::invalid_input("graphproc requires --input <path>"))?;
    let levels =
        levels.ok_or_else(|| CliError::invalid_input("graphproc requires --levels <path>"))?;
    if rho_p != 0.0 && prior_distance.is_none() {
        return Err(CliError::invalid_input(
            "--prior-distance is required when the prior term is active (--rho-p != 0)",
        ));
    }

    Ok(Some(Args {
        input,
        levels,
        output,
        rho_d,
        rho_s,
        rho_p,
        prior_distance,
        assignments,
        max_iterations,
        seed,
        debug,
        debug_graphstructure,
    }))
}

fn graph_dump_to_files() -> Box<dyn Fn(&EnergyGraph, &MoveRecord)> {
    Box::new(|graph, record| {
        let name = format!(
            "{:03}_label_{:05}_energy_{:05}.gv",
            record.move_index, record.alpha, record.energy
        );
        match File::create(&name) {
            Ok(file) => {
                let mut writer = BufWriter::new(file);
                if let Err(err) = graph.write_graphviz(&mut writer) {
                    eprintln!("<debug> failed to dump '{name}': {err}");
                }
            }
            Err(err) => eprintln!("<debug> failed to create '{name}': {err}"),
        }
    })
}

fn run() -> Result<(), CliError> {
    let tokens: Vec<String> = env::args().skip(1).collect();
    let Some(args) = parse_args(&tokens)? else {
        return Ok(());
    };

    let input = mm::read_vector(args.input.as_path())?;
    let levels = mm::read_vector(args.levels.as_path())?;
    if args.debug {
        eprintln!(
            "<debug> loaded {} samples and {} levels",
            input.len(),
            levels.len()
        );
    }

    let params = ReconstructionParams {
        lambdas: Lambdas::from_rhos(args.rho_d, args.rho_s, args.rho_p)?,
        prior_distance: args.prior_distance,
        max_iterations: args.max_iterations,
        seed: args.seed,
    };

    let trace: Option<Box<dyn pcr_core::TraceSink>> =
        args.debug.then(|| Box::new(StderrTrace) as Box<dyn pcr_core::TraceSink>);
    let graph_dump = args.debug_graphstructure.then(graph_dump_to_files);

    let result = reconstruct(&input, &levels, params, trace, graph_dump)?;

    if args.debug {
        match serde_json::to_string(&result.diagnostics) {
            Ok(encoded) => eprintln!("<debug> diagnostics: {encoded}"),
            Err(err) => eprintln!("<debug> diagnostics unavailable: {err}"),
        }
        match serde_json::to_string(&result.history) {
            Ok(encoded) => eprintln!("<debug> energy history: {encoded}"),
            Err(err) => eprintln!("<debug> energy history unavailable: {err}"),
        }
    }

    let mut writer = open_output(args.output.as_str())?;
    if args.assignments {
        mm::write_two_column_matrix(&mut writer, &result.assignments)
    } else {
        mm::write_vector(&mut writer, &result.expanded)
    }
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(err.exit_code());
    }
}
