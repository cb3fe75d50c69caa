//! Decoding of uploaded bytes into an ordered, dynamically typed table.
//!
//! Column names are read once from the header (CSV) or from the first
//! object (JSON) and carried alongside the rows, so every row is a plain
//! `Vec<Cell>` aligned with `Table::columns`.

use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::data::format::DataFormat;
use crate::error::{Error, Result};

/// Runtime category of a present cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Number,
    String,
    Boolean,
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Boolean => "boolean",
            ValueKind::Object => "object",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Empty string, JSON `null`, or a field the record does not have.
    Missing,
    Number(f64),
    Boolean(bool),
    Text(String),
    /// A JSON array or object, kept as its JSON text.
    Object(String),
}

impl Cell {
    /// Dynamic typing of a text field.
    pub fn coerce(text: &str) -> Cell {
        if text.is_empty() {
            return Cell::Missing;
        }
        match text {
            "true" | "TRUE" => return Cell::Boolean(true),
            "false" | "FALSE" => return Cell::Boolean(false),
            _ => {}
        }
        let trimmed = text.trim();
        if looks_numeric(trimmed) {
            if let Ok(x) = trimmed.parse::<f64>() {
                if x.is_finite() {
                    return Cell::Number(x);
                }
            }
        }
        Cell::Text(text.to_owned())
    }

    fn from_json(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Missing,
            Value::Bool(b) => Cell::Boolean(*b),
            Value::Number(n) => n.as_f64().map_or(Cell::Missing, Cell::Number),
            Value::String(s) => Cell::coerce(s),
            Value::Array(_) | Value::Object(_) => Cell::Object(value.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Cell::Missing => None,
            Cell::Number(_) => Some(ValueKind::Number),
            Cell::Boolean(_) => Some(ValueKind::Boolean),
            Cell::Text(_) => Some(ValueKind::String),
            Cell::Object(_) => Some(ValueKind::Object),
        }
    }

    /// Numeric view used for training: booleans become 1/0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(x) => Some(*x),
            Cell::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Number(x) => write!(f, "{}", x),
            Cell::Boolean(b) => write!(f, "{}", b),
            Cell::Text(s) | Cell::Object(s) => f.write_str(s),
        }
    }
}

/// Decoded records with their ordered column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    /// Every row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Decodes at most `limit` records (all when `None`).
    pub fn parse(bytes: &[u8], format: DataFormat, limit: Option<usize>) -> Result<Table> {
        let limit = limit.unwrap_or(usize::MAX);
        if format.is_delimited() {
            parse_delimited(bytes, limit)
        } else {
            parse_json(bytes, limit)
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

fn parse_delimited(bytes: &[u8], limit: usize) -> Result<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(sniff_delimiter(bytes))
        .from_reader(bytes);

    let columns = unique_columns(reader.headers()?.iter().map(str::to_owned));

    let mut rows = Vec::new();
    for record in reader.records().take(limit) {
        let record = record?;
        let row = (0..columns.len())
            .map(|i| record.get(i).map_or(Cell::Missing, Cell::coerce))
            .collect();
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

/// Picks the candidate delimiter occurring most often (outside quotes) on
/// the first line; comma when none occurs.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or(&[]);
    let mut counts = [0usize; DELIMITERS.len()];
    let mut in_quotes = false;
    for &b in first_line {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = DELIMITERS.iter().position(|&d| d == b) {
                counts[i] += 1;
            }
        }
    }
    let mut best = 0;
    for i in 1..DELIMITERS.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    DELIMITERS[best]
}

/// Disambiguates repeated header names as `name_1`, `name_2`, ...
fn unique_columns(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut columns = Vec::new();
    for name in names {
        let mut candidate = name.clone();
        let mut suffix = 0;
        while used.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}_{}", name, suffix);
        }
        used.insert(candidate.clone());
        columns.push(candidate);
    }
    columns
}

/// Plain decimal literal: optional `-`, digits with an optional fraction,
/// optional exponent. Rejects `NaN`, `inf`, hex and the like.
fn looks_numeric(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    let all_digits = |t: &str| t.bytes().all(|b| b.is_ascii_digit());
    let (int, frac) = match mantissa.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (mantissa, ""),
    };
    let mantissa_ok = all_digits(int) && all_digits(frac) && !(int.is_empty() && frac.is_empty());
    let exponent_ok = exponent.map_or(true, |e| {
        let e = e.strip_prefix(['+', '-']).unwrap_or(e);
        !e.is_empty() && all_digits(e)
    });
    mantissa_ok && exponent_ok
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn parse_json(bytes: &[u8], limit: usize) -> Result<Table> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Array(items) = value else {
        return Err(Error::Parse("JSON dataset must be an array of objects".into()));
    };

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::new();
    for (i, item) in items.iter().take(limit).enumerate() {
        let Value::Object(fields) = item else {
            return Err(Error::Parse(format!("JSON record {} is not an object", i + 1)));
        };
        if i == 0 {
            columns = fields.keys().cloned().collect();
        }
        let row = columns
            .iter()
            .map(|c| fields.get(c).map_or(Cell::Missing, Cell::from_json))
            .collect();
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(text: &str) -> Table {
        Table::parse(text.as_bytes(), DataFormat::Csv, None).unwrap()
    }

    #[test]
    fn dynamic_typing() {
        assert_eq!(Cell::coerce("3"), Cell::Number(3.0));
        assert_eq!(Cell::coerce(" -2.5e3 "), Cell::Number(-2500.0));
        assert_eq!(Cell::coerce(".5"), Cell::Number(0.5));
        assert_eq!(Cell::coerce("TRUE"), Cell::Boolean(true));
        assert_eq!(Cell::coerce(""), Cell::Missing);
        assert_eq!(Cell::coerce("NaN"), Cell::Text("NaN".into()));
        assert_eq!(Cell::coerce("inf"), Cell::Text("inf".into()));
        assert_eq!(Cell::coerce("1e"), Cell::Text("1e".into()));
        assert_eq!(Cell::coerce("."), Cell::Text(".".into()));
        assert_eq!(Cell::coerce(" "), Cell::Text(" ".into()));
    }

    #[test]
    fn header_and_padding() {
        let t = csv("a,b,c\n1,2,3\n4,5\n\n6,7,8,9\n");
        assert_eq!(t.columns, vec!["a", "b", "c"]);
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.rows[1], vec![Cell::Number(4.0), Cell::Number(5.0), Cell::Missing]);
        assert_eq!(t.rows[2].len(), 3);
    }

    #[test]
    fn quoted_fields_and_duplicate_headers() {
        let t = csv("x,x,label\n\"1,5\",2,\"say \"\"hi\"\"\"\n");
        assert_eq!(t.columns, vec!["x", "x_1", "label"]);
        assert_eq!(t.rows[0][0], Cell::Text("1,5".into()));
        assert_eq!(t.rows[0][2], Cell::Text("say \"hi\"".into()));
    }

    #[test]
    fn sniffs_semicolons_and_tabs() {
        assert_eq!(csv("a;b\n1;2\n").rows[0], vec![Cell::Number(1.0), Cell::Number(2.0)]);
        assert_eq!(csv("a\tb\n1\t2\n").columns, vec!["a", "b"]);
    }

    #[test]
    fn limit_counts_data_records_only() {
        let t = Table::parse(b"a\n1\n2\n3\n".as_slice(), DataFormat::Csv, Some(2)).unwrap();
        assert_eq!(t.row_count(), 2);
    }

    #[test]
    fn json_keeps_key_order() {
        let json = r#"[{"z": 1, "a": "2", "m": null}, {"a": true, "z": [1]}]"#;
        let t = Table::parse(json.as_bytes(), DataFormat::Json, None).unwrap();
        assert_eq!(t.columns, vec!["z", "a", "m"]);
        assert_eq!(t.rows[0], vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Missing]);
        assert_eq!(t.rows[1], vec![Cell::Object("[1]".into()), Cell::Boolean(true), Cell::Missing]);
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        let err = Table::parse(b"{\"a\": 1}".as_slice(), DataFormat::Json, None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        let err = Table::parse(b"[1, 2]".as_slice(), DataFormat::Json, None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        let err = Table::parse(b"[{".as_slice(), DataFormat::Json, None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = Table::parse(&[b'a', b'\n', 0xff, 0xfe, b'\n'], DataFormat::Excel, None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
