//! Minimal delimited-row codec shared by the work file and the result file.
//!
//! Quotes, doubled-quote escapes, and CRLF are tolerated on read. Writing
//! quotes only the fields that need it, so a parse/write cycle of an already
//! written file reproduces it byte for byte.

use std::io::{self, Write};
use std::mem::take;

/// Field separator for both files
pub const SEPARATOR: char = ',';

/// Parse text into rows. Blank lines are skipped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            // Only a quote opening a field starts quoted mode; elsewhere it is literal
            '"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            c if c == SEPARATOR && !in_quotes => {
                row.push(take(&mut field));
                field_start = true;
            }
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                push_row(&mut rows, take(&mut row));
                field_start = true;
            }
            _ => {
                field.push(ch);
                field_start = false;
            }
        }
    }

    // Trailing row without a line terminator (or with unterminated quotes)
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_row(&mut rows, row);
    }

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    if !(row.len() == 1 && row[0].is_empty()) {
        rows.push(row);
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single row, terminated by `\n`.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{SEPARATOR}")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    writeln!(w)
}

/// Serialize rows into one buffer
pub fn rows_to_string(rows: &[Vec<String>]) -> String {
    let mut buf: Vec<u8> = Vec::new();
    for row in rows {
        // Writing into a Vec cannot fail
        let _ = write_row(&mut buf, row);
    }
    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    }
}
