//! Population statistics extractor
//!
//! The municipal portal publishes a yearly series; the latest figures are
//! the last row of the page's tables.

use scraper::Html;

use crate::models::PopulationRow;
use crate::parser::selectors::{CELL, TABLE_ROW};

/// Extract the trimmed cells of the last table row
///
/// Returns `None` when the page has no table rows or the last row has no
/// data cells.
pub fn extract_population(html: &str) -> Option<PopulationRow> {
    let document = Html::parse_document(html);
    let last_row = document.select(&TABLE_ROW).last()?;

    let cells: Vec<String> = last_row
        .select(&CELL)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect();

    if cells.is_empty() {
        None
    } else {
        Some(PopulationRow { cells })
    }
}
