// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared plumbing for the four reconstruction binaries: Matrix-Market
//! vector I/O, flag parsing, structured error reporting, and the
//! `graphproc` pipeline assembly.

pub mod error;
pub mod flags;
pub mod mm;
pub mod pipeline;
pub mod trace;

pub use error::{CliError, EXIT_FAILURE, EXIT_USAGE, emit_structured_error};
pub use pipeline::{Reconstruction, ReconstructionParams, reconstruct};
pub use trace::StderrTrace;

use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Opens the output target: `-` (the default everywhere) means stdout.
pub fn open_output(target: &str) -> Result<Box<dyn Write>, CliError> {
    if target == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let file = File::create(target)
        .map_err(|source| CliError::io(format!("failed to create '{target}'"), source))?;
    Ok(Box::new(BufWriter::new(file)))
}
