// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use pcr_core::TraceSink;

/// Trace sink that mirrors debug lines to stderr, installed by the binaries
/// when `--debug` is set.
#[derive(Debug, Default)]
pub struct StderrTrace;

impl TraceSink for StderrTrace {
    fn debug(&self, message: &str) {
        eprintln!("<debug> {message}");
    }
}
