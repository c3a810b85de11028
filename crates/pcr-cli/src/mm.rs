// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Matrix-Market array format for dense vectors and two-column matrices.
//!
//! Reading accepts `real` and `complex` fields; complex entries contribute
//! their real component, which is what a real-valued pipeline consuming
//! such a file observes. Writing always emits `real general` with 16-digit
//! scientific notation.

use crate::error::CliError;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Real,
    Complex,
}

pub fn read_vector(path: &Path) -> Result<Vec<f64>, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    parse_vector(&raw).map_err(|err| {
        CliError::invalid_input(format!("{}: {err}", path.display()))
    })
}

/// Parses a Matrix-Market array vector (`N 1`).
pub fn parse_vector(raw: &str) -> Result<Vec<f64>, CliError> {
    let mut lines = raw.lines();

    let header = lines
        .next()
        .ok_or_else(|| CliError::invalid_input("missing Matrix-Market header line"))?;
    let field = parse_header(header)?;

    let size_line = lines
        .by_ref()
        .find(|line| !line.trim_start().starts_with('%') && !line.trim().is_empty())
        .ok_or_else(|| CliError::invalid_input("missing Matrix-Market size line"))?;
    let (rows, cols) = parse_size_line(size_line)?;

    if cols != 1 {
        return Err(CliError::invalid_input(format!(
            "expected a vector with size line 'N 1'; got '{rows} {cols}'"
        )));
    }
    if rows == 0 {
        return Err(CliError::invalid_input("vector contains no entries"));
    }

    let mut values = Vec::with_capacity(rows);
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        if values.len() == rows {
            break;
        }
        values.push(parse_entry(trimmed, field, values.len())?);
    }

    if values.len() != rows {
        return Err(CliError::invalid_input(format!(
            "size line promised {rows} entries but only {} were present",
            values.len()
        )));
    }

    Ok(values)
}

fn parse_header(header: &str) -> Result<Field, CliError> {
    let tokens: Vec<String> = header
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect();

    if tokens.first().map(String::as_str) != Some("%%matrixmarket") {
        return Err(CliError::invalid_input(format!(
            "invalid Matrix-Market banner '{header}'; expected '%%MatrixMarket matrix array (real|complex) general'"
        )));
    }
    if tokens.get(1).map(String::as_str) != Some("matrix") {
        return Err(CliError::invalid_input(
            "Matrix-Market header must describe a 'matrix' object",
        ));
    }
    if tokens.get(2).map(String::as_str) != Some("array") {
        return Err(CliError::invalid_input(
            "only the dense 'array' Matrix-Market format is supported",
        ));
    }
    let field = match tokens.get(3).map(String::as_str) {
        Some("real") => Field::Real,
        Some("complex") => Field::Complex,
        other => {
            return Err(CliError::invalid_input(format!(
                "unsupported Matrix-Market field '{}'; expected real or complex",
                other.unwrap_or("")
            )));
        }
    };
    if tokens.get(4).map(String::as_str) != Some("general") {
        return Err(CliError::invalid_input(
            "only 'general' Matrix-Market symmetry is supported",
        ));
    }

    Ok(field)
}

fn parse_size_line(line: &str) -> Result<(usize, usize), CliError> {
    let mut tokens = line.split_whitespace();
    let rows = tokens
        .next()
        .and_then(|token| token.parse::<usize>().ok())
        .ok_or_else(|| {
            CliError::invalid_input(format!("invalid Matrix-Market size line '{line}'"))
        })?;
    let cols = tokens
        .next()
        .and_then(|token| token.parse::<usize>().ok())
        .ok_or_else(|| {
            CliError::invalid_input(format!("invalid Matrix-Market size line '{line}'"))
        })?;
    Ok((rows, cols))
}

fn parse_entry(line: &str, field: Field, index: usize) -> Result<f64, CliError> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next().ok_or_else(|| {
        CliError::invalid_input(format!("entry {index} is empty"))
    })?;

    let value = first.parse::<f64>().map_err(|_| {
        CliError::invalid_input(format!("entry {index} is not a valid number: '{first}'"))
    })?;

    if field == Field::Complex && tokens.next().is_none() {
        return Err(CliError::invalid_input(format!(
            "complex entry {index} needs a real and an imaginary part"
        )));
    }

    Ok(value)
}

pub fn write_vector<W: Write>(writer: &mut W, values: &[f64]) -> Result<(), CliError> {
    let io_err = |source| CliError::io("failed to write output vector", source);

    writeln!(writer, "%%MatrixMarket matrix array real general").map_err(io_err)?;
    writeln!(writer, "{} 1", values.len()).map_err(io_err)?;
    for value in values {
        writeln!(writer, "{value:.16e}").map_err(io_err)?;
    }
    Ok(())
}

/// Writes an `M x 2` dense matrix in column-major array order.
pub fn write_two_column_matrix<W: Write>(
    writer: &mut W,
    rows: &[(f64, f64)],
) -> Result<(), CliError> {
    let io_err = |source| CliError::io("failed to write output matrix", source);

    writeln!(writer, "%%MatrixMarket matrix array real general").map_err(io_err)?;
    writeln!(writer, "{} 2", rows.len()).map_err(io_err)?;
    for (first, _) in rows {
        writeln!(writer, "{first:.16e}").map_err(io_err)?;
    }
    for (_, second) in rows {
        writeln!(writer, "{second:.16e}").map_err(io_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_vector, write_two_column_matrix, write_vector};

    #[test]
    fn parses_a_real_vector_with_comments() {
        let raw = "%%MatrixMarket matrix array real general\n\
                   % produced by a test\n\
                   3 1\n\
                   1.5\n\
                   -2.0\n\
                   0.25\n";
        let values = parse_vector(raw).expect("vector is well-formed");
        assert_eq!(values, vec![1.5, -2.0, 0.25]);
    }

    #[test]
    fn complex_entries_contribute_their_real_part() {
        let raw = "%%MatrixMarket matrix array complex general\n\
                   2 1\n\
                   1.0 3.0\n\
                   -4.5 0.0\n";
        let values = parse_vector(raw).expect("vector is well-formed");
        assert_eq!(values, vec![1.0, -4.5]);
    }

    #[test]
    fn complex_entries_without_imaginary_part_are_rejected() {
        let raw = "%%MatrixMarket matrix array complex general\n1 1\n2.5\n";
        assert!(parse_vector(raw).is_err());
    }

    #[test]
    fn banner_and_format_mismatches_are_rejected() {
        assert!(parse_vector("%%NotMatrixMarket\n1 1\n0\n").is_err());
        assert!(parse_vector("%%MatrixMarket matrix coordinate real general\n1 1\n0\n").is_err());
        assert!(parse_vector("%%MatrixMarket matrix array integer general\n1 1\n0\n").is_err());
        assert!(parse_vector("%%MatrixMarket matrix array real symmetric\n1 1\n0\n").is_err());
    }

    #[test]
    fn matrices_are_rejected_by_the_vector_reader() {
        let raw = "%%MatrixMarket matrix array real general\n2 2\n1\n2\n3\n4\n";
        assert!(parse_vector(raw).is_err());
    }

    #[test]
    fn short_data_is_rejected() {
        let raw = "%%MatrixMarket matrix array real general\n3 1\n1.0\n2.0\n";
        assert!(parse_vector(raw).is_err());
    }

    #[test]
    fn empty_vectors_are_rejected() {
        let raw = "%%MatrixMarket matrix array real general\n0 1\n";
        assert!(parse_vector(raw).is_err());
    }

    #[test]
    fn garbage_entries_are_rejected() {
        let raw = "%%MatrixMarket matrix array real general\n1 1\nnot-a-number\n";
        assert!(parse_vector(raw).is_err());
    }

    #[test]
    fn written_vectors_parse_back() {
        let mut buffer = Vec::new();
        write_vector(&mut buffer, &[1.0, -0.5, 3.25]).expect("write to memory");
        let text = String::from_utf8(buffer).expect("output is utf-8");
        let values = parse_vector(&text).expect("own output must parse");
        assert_eq!(values, vec![1.0, -0.5, 3.25]);
    }

    #[test]
    fn two_column_matrix_is_written_column_major() {
        let mut buffer = Vec::new();
        write_two_column_matrix(&mut buffer, &[(5.0, 3.0), (7.0, 2.0)])
            .expect("write to memory");
        let text = String::from_utf8(buffer).expect("output is utf-8");

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "2 2");
        // Column 0 (level values) first, then column 1 (run lengths).
        assert!(lines[2].starts_with("5."));
        assert!(lines[3].starts_with("7."));
        assert!(lines[4].starts_with("3."));
        assert!(lines[5].starts_with("2."));
    }
}
