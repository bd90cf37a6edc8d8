//! Append-only CSV log of received records.
//!
//! Columns follow the record layout ([`crate::regel::FIELDS`]) with
//! `RECEIVED_AT` last. The header is written when the file is created.
//! Quoting follows RFC 4180 with CRLF row endings.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::regel::field_names;
use crate::values::ValueMap;

pub const CSV_FILE: &str = "labels.csv";

/// Timestamp column appended after the record fields.
pub const RECEIVED_AT: &str = "RECEIVED_AT";

pub fn columns() -> impl Iterator<Item = &'static str> {
    field_names().chain(std::iter::once(RECEIVED_AT))
}

/// Append one row, writing the header first if the file is new or empty.
pub fn append_row(path: &Path, values: &ValueMap) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut out = String::new();

    if file.metadata()?.len() == 0 {
        push_row(&mut out, columns());
    }
    push_row(
        &mut out,
        columns().map(|column| values.get(column).map(String::as_str).unwrap_or("")),
    );

    file.write_all(out.as_bytes())?;
    Ok(())
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote(cell));
    }
    out.push_str("\r\n");
}

fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("a,b"), "\"a,b\"");
        assert_eq!(quote(r#"5" vial"#), r#""5"" vial""#);
        assert_eq!(quote("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CSV_FILE);

        let mut values = ValueMap::new();
        values.insert("TYPE".into(), "S".into());
        values.insert("NAAM".into(), "LENS, SOFT".into());
        values.insert(RECEIVED_AT.into(), "2026-01-02T03:04:05+00:00".into());

        append_row(&path, &values).unwrap();
        append_row(&path, &values).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = text.split_terminator("\r\n").collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("TYPE,DATUM,KLANTNR,"));
        assert!(rows[0].ends_with(",DI,UDI,RECEIVED_AT"));
        assert!(rows[1].starts_with("S,,,,,\"LENS, SOFT\","));
        assert!(rows[1].ends_with(",2026-01-02T03:04:05+00:00"));
        assert_eq!(rows[1], rows[2]);
    }
}
