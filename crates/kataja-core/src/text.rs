#![forbid(unsafe_code)]

//! Label measurement.
//!
//! Node sizes come from their label text. Without a font backend the core
//! measures in terminal-style columns: every display column is
//! [`CHAR_WIDTH`] scene units wide and every line [`LINE_HEIGHT`] tall.

use unicode_width::UnicodeWidthStr;

/// Scene width of one display column.
pub const CHAR_WIDTH: f64 = 8.0;

/// Scene height of one text line.
pub const LINE_HEIGHT: f64 = 16.0;

/// Minimum box size of any label, so empty labels are still clickable.
pub const MIN_SIZE: f64 = 10.0;

/// Width and height of a (possibly multi-line) label in scene units.
#[must_use]
pub fn measure_label(text: &str) -> (f64, f64) {
    if text.is_empty() {
        return (MIN_SIZE, MIN_SIZE);
    }
    let mut columns = 0usize;
    let mut lines = 0usize;
    for line in text.lines() {
        columns = columns.max(line.width());
        lines += 1;
    }
    let width = (columns as f64 * CHAR_WIDTH).max(MIN_SIZE);
    let height = (lines.max(1) as f64 * LINE_HEIGHT).max(MIN_SIZE);
    (width, height)
}
