//! Structure property tables supplied by an external collaborator.
//!
//! The engine never interprets these: a table computed elsewhere (label,
//! centroid, volume, ...) is kept next to its label volume and written out
//! and read back unchanged.

use std::path::Path;

use crate::format::FormatError;

/// A header plus rows of text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTable {
    /// Column names
    pub header: Vec<String>,
    /// One entry per structure; rows may be shorter or longer than the header
    pub rows: Vec<Vec<String>>,
}

impl PropertyTable {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn with_row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize as comma-separated text with a header line.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for line in std::iter::once(&self.header).chain(self.rows.iter()) {
            match line.as_slice() {
                // Would otherwise read back as a blank line
                [only] if only.is_empty() => out.push_str("\"\""),
                cells => {
                    let cells: Vec<String> = cells.iter().map(|c| csv_escape(c)).collect();
                    out.push_str(&cells.join(","));
                }
            }
            out.push('\n');
        }
        out
    }

    /// Parse text written by [`PropertyTable::to_csv`]. Blank lines are
    /// ignored; quoted cells may span lines.
    pub fn from_csv(text: &str) -> Result<Self, FormatError> {
        let mut records = split_csv_records(text)?.into_iter();
        let Some(header) = records.next() else {
            return Ok(Self::default());
        };
        Ok(Self {
            header,
            rows: records.collect(),
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), FormatError> {
        std::fs::write(path, self.to_csv())?;
        log::debug!("Wrote {} property rows to {:?}", self.rows.len(), path);
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, FormatError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_csv(&text)
    }
}

/// Quote a cell if it contains a separator, quote or line break, or has
/// leading or trailing whitespace.
pub(crate) fn csv_escape(value: &str) -> String {
    let needs_quotes = value.contains([',', '"', '\n', '\r'])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Split a whole text into records of cells. Quoted cells may contain
/// separators and line breaks; a `\r\n` outside quotes ends a record like
/// `\n`. Blank lines produce no record.
pub(crate) fn split_csv_records(text: &str) -> Result<Vec<Vec<String>>, FormatError> {
    let mut records = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => {
                in_quotes = true;
                quoted = true;
            }
            (',', false) => cells.push(std::mem::take(&mut current)),
            ('\r', false) if chars.peek() == Some(&'\n') => {}
            ('\n', false) => {
                let blank = cells.is_empty() && !quoted && current.trim().is_empty();
                if blank {
                    current.clear();
                } else {
                    cells.push(std::mem::take(&mut current));
                    records.push(std::mem::take(&mut cells));
                }
                quoted = false;
                line += 1;
                record_line = line;
            }
            ('\n', true) => {
                current.push(c);
                line += 1;
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(FormatError::invalid_row(record_line, "unterminated quote"));
    }
    if !cells.is_empty() || quoted || !current.trim().is_empty() {
        cells.push(current);
        records.push(cells);
    }
    Ok(records)
}

/// Split one line into cells, honoring double-quoted cells.
///
/// Returns `None` if a quoted cell is never closed.
pub(crate) fn split_csv_line(line: &str) -> Option<Vec<String>> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if in_quotes {
        return None;
    }
    cells.push(current);
    Some(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_and_quoted() {
        assert_eq!(split_csv_line("1,2,3").unwrap(), vec!["1", "2", "3"]);
        assert_eq!(
            split_csv_line(r#"7,"a, b","say ""hi""""#).unwrap(),
            vec!["7", "a, b", r#"say "hi""#]
        );
        assert_eq!(split_csv_line("x,,").unwrap(), vec!["x", "", ""]);
        assert!(split_csv_line(r#"1,"open"#).is_none());
    }

    #[test]
    fn test_table_text_is_preserved() {
        let table = PropertyTable::new(vec!["label".into(), "centroid".into(), "note".into()])
            .with_row(["4", "(1.0, 2.5, 3.0)", "near \"bulb\" edge"])
            .with_row(["9", "(0.0, 0.0, 1.0)", ""]);

        let parsed = PropertyTable::from_csv(&table.to_csv()).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_quoted_cells_span_lines() {
        let records = split_csv_records("label,note\r\n1,\"line1\nline2\"\r\n\n2,\"\"\n").unwrap();
        assert_eq!(
            records,
            vec![
                vec!["label".to_string(), "note".to_string()],
                vec!["1".to_string(), "line1\nline2".to_string()],
                vec!["2".to_string(), String::new()],
            ]
        );

        let err = split_csv_records("label\n\"open\nstill open").unwrap_err();
        assert!(matches!(err, FormatError::InvalidRow { line: 2, .. }));
    }

    #[test]
    fn test_awkward_cells_round_trip() {
        let table = PropertyTable::new(vec!["label".into(), "note".into()])
            .with_row(["1", "line1\nline2"])
            .with_row(["2", "carriage\r"])
            .with_row(["3", "  padded  "])
            .with_row([""]);

        assert_eq!(csv_escape("carriage\r"), "\"carriage\r\"");
        assert_eq!(csv_escape(" x"), "\" x\"");
        assert_eq!(PropertyTable::from_csv(&table.to_csv()).unwrap(), table);
    }

    #[test]
    fn test_empty_text() {
        let parsed = PropertyTable::from_csv("\n\n").unwrap();
        assert!(parsed.header.is_empty());
        assert!(parsed.is_empty());
    }
}
