// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reading back console output for the transcript.

use nx_core::{ConsoleBuffer, Coordinates};

/// Text written to `console` between the `start` and `end` cursors.
///
/// The first row starts at `start.column`, the last row stops before
/// `end.column`. Trailing blanks are trimmed from every row.
pub fn capture_region(console: &dyn ConsoleBuffer, start: Coordinates, end: Coordinates) -> String {
    if end <= start {
        return String::new();
    }
    let width = console.width();
    (start.row..=end.row)
        .map(|row| {
            let from = if row == start.row { start.column } else { 0 };
            let to = if row == end.row { end.column } else { width };
            let cells: String = console.read_cells(row, from, to.max(from)).into_iter().collect();
            cells.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "scrape_tests.rs"]
mod tests;
