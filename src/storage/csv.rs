//! CSV Storage Module
//!
//! Loads and saves hosted tables as CSV.
//!
//! ## Format
//!
//! - First row is the header with attribute names; a qualifier such as
//!   `A.a` is replaced by the table name the file is loaded under
//! - Values are kept verbatim as text
//! - Values are separated by commas or by whitespace
//! - Fields may be quoted; a doubled quote inside a quoted field is a
//!   literal quote
//! - Blank lines and lines starting with `#` or `---` are skipped
//!
//! ## Example
//!
//! ```csv
//! a,b
//! 0,1
//! 2,"x, y"
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::table::Table;
use crate::value::{Schema, Value};

/// Options for CSV parsing
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: ',')
    pub delimiter: char,
    /// Quote character for strings (default: '"')
    pub quote_char: char,
    /// Whether whitespace inside an unquoted field also separates values
    /// (default: true)
    pub split_on_whitespace: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: ',',
            quote_char: '"',
            split_on_whitespace: true,
        }
    }
}

/// Load the table `name` from a CSV file.
pub fn load_table<P: AsRef<Path>>(name: &str, path: P) -> StorageResult<Table> {
    load_table_with_options(name, path, &CsvOptions::default())
}

pub fn load_table_with_options<P: AsRef<Path>>(name: &str, path: P, options: &CsvOptions) -> StorageResult<Table> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let table = parse_table_with_options(name, &text, options)?;
    debug!(table = %name, path = %path.display(), tuples = table.len(), "table_loaded");
    Ok(table)
}

/// Parse CSV text into the table `name`.
///
/// Duplicate rows collapse into one tuple.
pub fn parse_table(name: &str, text: &str) -> StorageResult<Table> {
    parse_table_with_options(name, text, &CsvOptions::default())
}

fn parse_table_with_options(name: &str, text: &str, options: &CsvOptions) -> StorageResult<Table> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !is_ignored(line));

    let (_, header) = lines
        .next()
        .ok_or_else(|| StorageError::Parse("missing header row".to_string()))?;
    let fields = parse_csv_line(header, options)?;
    let schema = Schema::parse(&fields.join(","));
    if schema.is_empty() || schema.len() != fields.len() {
        return Err(StorageError::Parse(format!("invalid header: {header}")));
    }

    let mut table = Table::new(name, schema);
    for (index, line) in lines {
        let fields = parse_csv_line(line, options)?;
        if fields.len() != table.schema().len() {
            return Err(StorageError::Parse(format!(
                "Row {} has {} fields, expected {}",
                index + 1,
                fields.len(),
                table.schema().len()
            )));
        }
        table.put_values(fields.into_iter().map(Value::from))?;
    }
    Ok(table)
}

/// Blank lines, `#` comments and `---` rules carry no data.
fn is_ignored(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#') || line.starts_with("---")
}

/// Write `table` to `path`, header first.
pub fn save_table<P: AsRef<Path>>(path: P, table: &Table) -> StorageResult<()> {
    let options = CsvOptions::default();
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let delimiter = options.delimiter.to_string();
    let header = table
        .schema()
        .iter()
        .map(|a| escape_csv_field(a.name(), &options))
        .collect::<Vec<_>>()
        .join(&delimiter);
    writeln!(writer, "{header}")?;

    for tuple in table {
        let row = tuple
            .values()
            .iter()
            .map(|v| escape_csv_field(v.as_str(), &options))
            .collect::<Vec<_>>()
            .join(&delimiter);
        writeln!(writer, "{row}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse a CSV line into fields
fn parse_csv_line(line: &str, options: &CsvOptions) -> StorageResult<Vec<String>> {
    let q = options.quote_char;
    let separates = |c: char| c == options.delimiter || (options.split_on_whitespace && c.is_whitespace());
    let mut fields = Vec::new();
    let mut chars = line.trim().chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut field = String::new();
        if chars.next_if_eq(&q).is_some() {
            loop {
                match chars.next() {
                    Some(c) if c == q => {
                        if chars.next_if_eq(&q).is_none() {
                            break;
                        }
                        field.push(q);
                    }
                    Some(c) => field.push(c),
                    None => return Err(StorageError::Parse(format!("unterminated quote: {line}"))),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|&c| !separates(c)) {
                field.push(c);
            }
            field.truncate(field.trim_end().len());
        }
        fields.push(field);

        let mut spaced = false;
        while chars.next_if(|c| c.is_whitespace()).is_some() {
            spaced = true;
        }
        match chars.peek() {
            None => break,
            Some(&c) if c == options.delimiter => {
                chars.next();
            }
            Some(_) if spaced && options.split_on_whitespace => {}
            Some(&c) => return Err(StorageError::Parse(format!("unexpected '{c}' after field: {line}"))),
        }
    }
    Ok(fields)
}

fn escape_csv_field(field: &str, options: &CsvOptions) -> String {
    let q = options.quote_char;
    if field.is_empty() || field.contains(options.delimiter) || field.contains(q) || field.contains(char::is_whitespace) {
        format!("{q}{}{q}", field.replace(q, &format!("{q}{q}")))
    } else {
        field.to_string()
    }
}
