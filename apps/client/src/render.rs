//! Results renderer — a pure function from orchestrator state to a text table.

use std::fmt;

use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::models::recommendation::{RecommendationResult, Row};
use crate::orchestrator::RequestState;

/// Shown in place of a null or missing cell.
pub const MISSING_VALUE: &str = "N/A";
const COLUMN_GAP: &str = "  ";

/// A table ready to print: header cells, then one `Vec` per data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Renders the state. `None` means nothing to show: not a success, or a
/// success with no rows.
pub fn render(state: &RequestState) -> Option<RenderedTable> {
    match state {
        RequestState::Success(result) => render_result(result),
        RequestState::Idle | RequestState::Loading | RequestState::Error(_) => None,
    }
}

/// Columns come from the first row, in its key order. Later rows are read
/// by column name: a missing column shows `N/A`, an extra column is dropped.
pub fn render_result(result: &RecommendationResult) -> Option<RenderedTable> {
    let first = result.rows.first()?;
    let header: Vec<String> = first.keys().map(str::to_string).collect();

    let mismatched = result
        .rows
        .iter()
        .filter(|row| !same_columns(row, &header))
        .count();
    if mismatched > 0 {
        debug!(
            mismatched,
            columns = header.len(),
            "Rows disagree with the first row's columns; rendering first row's columns only"
        );
    }

    let rows = result
        .rows
        .iter()
        .map(|row| {
            header
                .iter()
                .map(|column| {
                    row.get(column)
                        .and_then(|value| value.display())
                        .unwrap_or_else(|| MISSING_VALUE.to_string())
                })
                .collect()
        })
        .collect();

    Some(RenderedTable { header, rows })
}

fn same_columns(row: &Row, header: &[String]) -> bool {
    row.len() == header.len() && row.keys().zip(header).all(|(k, h)| k == h)
}

impl RenderedTable {
    /// Display width of each column, header included.
    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.width());
            }
        }
        widths
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let last = cells.len().saturating_sub(1);
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        f.write_str(cell)?;
        if i < last {
            let pad = width.saturating_sub(cell.width());
            write!(f, "{:pad$}{COLUMN_GAP}", "")?;
        }
    }
    writeln!(f)
}

impl fmt::Display for RenderedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();
        write_line(f, &self.header, &widths)?;

        let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        write_line(f, &rule, &widths)?;

        for row in &self.rows {
            write_line(f, row, &widths)?;
        }
        Ok(())
    }
}
