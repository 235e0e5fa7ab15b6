//! JSON output formatter

use crate::utils::fs::write_file;
use serde::Serialize;
use std::io;
use std::path::Path;

/// Print any report as pretty JSON to stdout
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Write a report as pretty JSON to `path`
pub fn write_json_file<T: Serialize>(value: &T, path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_file(path, format!("{}\n", json))
}
