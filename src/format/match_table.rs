//! The persisted match table (`matches.csv`).
//!
//! One line per active match in commit order:
//!
//! ```text
//! matchId,labelA,labelB
//! 1,17,4
//! 3,22,9
//! ```
//!
//! Reading is tolerant: the header line is optional, trailing columns are
//! ignored and rows that cannot be parsed are returned separately instead
//! of failing the whole table.

use std::path::Path;

use crate::constants::MATCH_COLUMNS;
use crate::data::{csv_escape, split_csv_line};
use crate::format::FormatError;
use crate::format::report::{CorruptRow, SkipReason};
use crate::matching::Match;
use crate::model::{BACKGROUND, Label, MatchId, Side};

/// A well-formed row and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// 1-based line number
    pub line: usize,
    pub raw: String,
    pub entry: Match,
}

/// Rows read from a match table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Well-formed rows in file order
    pub rows: Vec<TableRow>,
    /// Rows that could not be parsed
    pub corrupt: Vec<CorruptRow>,
    /// Whether the first line was a header
    pub had_header: bool,
}

/// Render matches as table text, header first.
pub fn to_text<'a>(matches: impl IntoIterator<Item = &'a Match>) -> String {
    let header: Vec<String> = MATCH_COLUMNS.iter().map(|c| csv_escape(c)).collect();
    let mut out = header.join(",");
    out.push('\n');
    for m in matches {
        out.push_str(&format!("{},{},{}\n", m.id, m.label_a, m.label_b));
    }
    out
}

/// Write the table to `path`. Returns the number of rows written.
pub fn write(path: &Path, matches: &[Match]) -> Result<usize, FormatError> {
    std::fs::write(path, to_text(matches))?;
    log::debug!("Wrote {} match rows to {:?}", matches.len(), path);
    Ok(matches.len())
}

/// Read and parse the table at `path`.
pub fn read(path: &Path) -> Result<ParsedTable, FormatError> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse(&text))
}

/// Parse table text. Never fails; unusable rows end up in `corrupt`.
pub fn parse(text: &str) -> ParsedTable {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut table = ParsedTable::default();
    let mut first = true;

    for (idx, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let line = idx + 1;

        let Some(cells) = split_csv_line(raw) else {
            table.corrupt.push(corrupt(line, raw, "unterminated quote"));
            first = false;
            continue;
        };

        if first {
            first = false;
            if is_header(&cells) {
                table.had_header = true;
                continue;
            }
        }

        match parse_row(&cells) {
            Ok(entry) => table.rows.push(TableRow {
                line,
                raw: raw.to_string(),
                entry,
            }),
            Err(reason) => table.corrupt.push(CorruptRow {
                line,
                raw: raw.to_string(),
                reason,
            }),
        }
    }

    log::debug!(
        "Parsed match table: {} rows, {} corrupt",
        table.rows.len(),
        table.corrupt.len()
    );
    table
}

fn is_header(cells: &[String]) -> bool {
    cells
        .first()
        .is_some_and(|c| c.trim().eq_ignore_ascii_case(MATCH_COLUMNS[0]))
}

fn corrupt(line: usize, raw: &str, message: &str) -> CorruptRow {
    CorruptRow {
        line,
        raw: raw.to_string(),
        reason: SkipReason::Malformed(message.to_string()),
    }
}

fn parse_row(cells: &[String]) -> Result<Match, SkipReason> {
    if cells.len() < MATCH_COLUMNS.len() {
        return Err(SkipReason::Malformed(format!(
            "expected {} columns, found {}",
            MATCH_COLUMNS.len(),
            cells.len()
        )));
    }

    let id: MatchId = cells[0]
        .trim()
        .parse()
        .map_err(|_| SkipReason::Malformed(format!("invalid matchId '{}'", cells[0].trim())))?;
    let label_a = parse_label(&cells[1], Side::A)?;
    let label_b = parse_label(&cells[2], Side::B)?;

    Ok(Match::new(id, label_a, label_b))
}

fn parse_label(cell: &str, side: Side) -> Result<Label, SkipReason> {
    let label: Label = cell
        .trim()
        .parse()
        .map_err(|_| SkipReason::Malformed(format!("invalid label{side} '{}'", cell.trim())))?;
    if label == BACKGROUND {
        return Err(SkipReason::Background { side });
    }
    Ok(label)
}
