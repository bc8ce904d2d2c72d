//! Output formatters for analysis results.
//!
//! Results are rendered from their `serde_json::Value` form so every
//! analyzer output works with every format. Arrays of flat records become
//! tables (aligned columns in text, pipe tables in markdown).

mod artifacts;

use std::io::Write;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::OutputFormat;
use crate::core::Result;

pub use artifacts::ArtifactWriter;

/// Rows shown per table in text and markdown output.
pub const MAX_TABLE_ROWS: usize = 50;

/// Output format enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    Json,
    Markdown,
    #[default]
    Text,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
            OutputFormat::Text => Format::Text,
        }
    }
}

impl Format {
    pub fn format_value<W: Write>(&self, value: &Value, writer: &mut W) -> Result<()> {
        match self {
            Format::Json => format_json(value, writer),
            Format::Markdown => format_value_as_markdown(value, writer, 0),
            Format::Text => format_value_as_text(value, writer, 0),
        }
    }

    pub fn format<T: Serialize, W: Write>(&self, data: &T, writer: &mut W) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.format_value(&value, writer)
    }
}

fn format_json<W: Write>(value: &Value, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

fn format_value_as_markdown<W: Write>(value: &Value, writer: &mut W, depth: usize) -> Result<()> {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let header_level = "#".repeat((depth + 1).min(6));
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        writeln!(writer, "{} {}\n", header_level, format_key(key))?;
                        format_value_as_markdown(val, writer, depth + 1)?;
                    }
                    _ => {
                        writeln!(writer, "**{}**: {}\n", format_key(key), format_scalar(val))?;
                    }
                }
            }
        }
        Value::Array(arr) => {
            if arr.is_empty() {
                writeln!(writer, "_No items_\n")?;
            } else if let Some(rows) = table_rows(arr) {
                format_markdown_table(&rows, arr.len(), writer)?;
            } else {
                for item in arr.iter().take(MAX_TABLE_ROWS) {
                    writeln!(writer, "- {}", format_scalar(item))?;
                }
                writeln!(writer)?;
            }
        }
        _ => {
            writeln!(writer, "{}\n", format_scalar(value))?;
        }
    }
    Ok(())
}

fn format_key(key: &str) -> String {
    key.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_f64() {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 {
                    format!("{}", f as i64)
                } else {
                    format!("{:.2}", f)
                }
            } else {
                n.to_string()
            }
        }
        Value::Bool(b) => if *b { "yes" } else { "no" }.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(items) => items.iter().map(format_scalar).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Arrays of flat objects render as tables.
fn table_rows(arr: &[Value]) -> Option<Vec<&Map<String, Value>>> {
    arr.iter()
        .map(|v| match v {
            Value::Object(map) if map.values().all(|v| !v.is_object()) => Some(map),
            _ => None,
        })
        .collect()
}

fn format_markdown_table<W: Write>(
    rows: &[&Map<String, Value>],
    total: usize,
    writer: &mut W,
) -> Result<()> {
    let headers: Vec<&str> = rows[0].keys().map(|s| s.as_str()).collect();

    write!(writer, "|")?;
    for header in &headers {
        write!(writer, " {} |", format_key(header))?;
    }
    writeln!(writer)?;

    write!(writer, "|")?;
    for _ in &headers {
        write!(writer, " --- |")?;
    }
    writeln!(writer)?;

    for row in rows.iter().take(MAX_TABLE_ROWS) {
        write!(writer, "|")?;
        for header in &headers {
            let value = row.get(*header).unwrap_or(&Value::Null);
            write!(writer, " {} |", format_scalar(value))?;
        }
        writeln!(writer)?;
    }
    if total > MAX_TABLE_ROWS {
        writeln!(writer, "\n_{} more not shown_", total - MAX_TABLE_ROWS)?;
    }

    writeln!(writer)?;
    Ok(())
}

fn format_text_table<W: Write>(
    rows: &[&Map<String, Value>],
    total: usize,
    writer: &mut W,
    prefix: &str,
) -> Result<()> {
    let headers: Vec<&str> = rows[0].keys().map(|s| s.as_str()).collect();
    let shown: Vec<Vec<String>> = rows
        .iter()
        .take(MAX_TABLE_ROWS)
        .map(|row| {
            headers
                .iter()
                .map(|h| format_scalar(row.get(*h).unwrap_or(&Value::Null)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            shown
                .iter()
                .map(|cells| cells[i].chars().count())
                .chain(std::iter::once(format_key(h).chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", format_key(h), w = *w))
        .collect();
    writeln!(writer, "{}{}", prefix, header_line.join("  ").trim_end())?;

    for cells in &shown {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        writeln!(writer, "{}{}", prefix, line.join("  ").trim_end())?;
    }
    if total > MAX_TABLE_ROWS {
        writeln!(writer, "{}... {} more", prefix, total - MAX_TABLE_ROWS)?;
    }
    Ok(())
}

fn format_value_as_text<W: Write>(value: &Value, writer: &mut W, indent: usize) -> Result<()> {
    let prefix = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        writeln!(writer, "{}{}:", prefix, format_key(key))?;
                        format_value_as_text(val, writer, indent + 1)?;
                    }
                    _ => {
                        writeln!(
                            writer,
                            "{}{}: {}",
                            prefix,
                            format_key(key),
                            format_scalar(val)
                        )?;
                    }
                }
            }
        }
        Value::Array(arr) => {
            if arr.is_empty() {
                writeln!(writer, "{}(none)", prefix)?;
            } else if let Some(rows) = table_rows(arr) {
                format_text_table(&rows, arr.len(), writer, &prefix)?;
            } else {
                for item in arr.iter().take(MAX_TABLE_ROWS) {
                    writeln!(writer, "{}{}", prefix, format_scalar(item))?;
                }
            }
        }
        _ => {
            writeln!(writer, "{}{}", prefix, format_scalar(value))?;
        }
    }
    Ok(())
}
