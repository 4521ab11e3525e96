//! Purpose: Decode delimited text lines into ordered field-name → value records.
//! Exports: `RawRecord`, `DecodedTable`, `clean_field`.
//! Exports: `decode_table`, `decode_table_str`, `decode_lines`, `decode_str`.
//! Role: First stage of dataset loading; no type coercion happens here.
//! Invariants: Every record has exactly as many fields as the header.
//! Invariants: Record order follows line order; blank data lines are not rows.
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind};

/// One decoded data row, zipped positionally against the shared header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord {
    header: Arc<[String]>,
    values: Vec<String>,
    line: u64,
}

impl RawRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.header.iter().position(|key| key == name)?;
        self.values.get(index).map(String::as_str)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 1-based line number of the row in the decoded input.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}

/// Header plus data rows of one decode; the header survives even with zero rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTable {
    header: Arc<[String]>,
    records: Vec<RawRecord>,
}

impl DecodedTable {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.header.iter().any(|key| key == name)
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<RawRecord> {
        self.records
    }
}

/// Trim whitespace and surrounding double quotes from a raw field.
pub fn clean_field(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

fn split_fields(line: &str, separator: char) -> impl Iterator<Item = &str> {
    line.split(separator).map(clean_field)
}

pub fn decode_table<I, S>(lines: I, separator: char) -> Result<DecodedTable, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut lines = lines.into_iter();
    let Some(first) = lines.next() else {
        return Err(Error::new(ErrorKind::MalformedInput)
            .with_message("dataset is empty; expected a header line"));
    };
    let first = first.as_ref();
    if first.trim().is_empty() {
        return Err(Error::new(ErrorKind::MalformedInput)
            .with_message("header line is blank")
            .with_line(1));
    }

    let header: Arc<[String]> = split_fields(first, separator)
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into();
    let width = header.len();

    let mut records = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        let mut values: Vec<String> = split_fields(line, separator)
            .take(width)
            .map(str::to_string)
            .collect();
        values.resize(width, String::new());
        records.push(RawRecord {
            header: Arc::clone(&header),
            values,
            // header is line 1, enumerate starts at the second line
            line: index as u64 + 2,
        });
    }
    Ok(DecodedTable { header, records })
}

pub fn decode_lines<I, S>(lines: I, separator: char) -> Result<Vec<RawRecord>, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    decode_table(lines, separator).map(DecodedTable::into_records)
}

pub fn decode_str(text: &str, separator: char) -> Result<Vec<RawRecord>, Error> {
    decode_lines(text.lines(), separator)
}

pub fn decode_table_str(text: &str, separator: char) -> Result<DecodedTable, Error> {
    decode_table(text.lines(), separator)
}
