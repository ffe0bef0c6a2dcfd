//! Input/output plumbing for the command-line tool.
//!
//! The `-` path convention routes through standard streams. Query responses
//! are decoded here so every command reports decode failures the same way.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};

use crate::result::QueryResult;

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(Box::new(BufReader::new(file)))
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_dash(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        ))),
        _ => Ok(Box::new(io::stdout())),
    }
}

/// Reads and decodes an InfluxDB query response.
pub fn load_result(path: &Path) -> Result<QueryResult> {
    let reader = open_input(path)?;
    QueryResult::from_reader(reader).with_context(|| format!("Decoding query response {path:?}"))
}
