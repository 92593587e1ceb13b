//! Regional tourism statistics extractor
//!
//! The statistics portal renders a layout table first and the data table
//! second. In every data row the first cell is the accommodation type, the
//! last two cells are the yearly arrivals and presences, written with `.`
//! as thousands separator. Rows with a single cell (section titles, notes)
//! are kept with whatever figure that cell holds.

use scraper::Html;

use crate::models::TourismRow;
use crate::parser::selectors::{CELL, ROW, TABLE};
use crate::utils::error::ExtractError;
use crate::utils::parse_grouped_int;

/// Extract arrivals/presences rows from the second table on the page
///
/// # Errors
///
/// Returns `ExtractError::NotFound` if the page has fewer than two tables
pub fn extract_tourism(html: &str) -> Result<Vec<TourismRow>, ExtractError> {
    let document = Html::parse_document(html);

    let table = document
        .select(&TABLE)
        .nth(1)
        .ok_or_else(|| ExtractError::not_found("tourism data table (second <table>)"))?;

    let mut rows = Vec::new();
    for row in table.select(&ROW) {
        let cells: Vec<String> = row
            .select(&CELL)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        let Some(last) = cells.last() else {
            continue;
        };

        rows.push(TourismRow {
            description: cells[0].clone(),
            arrivals: cells
                .len()
                .checked_sub(2)
                .and_then(|i| parse_grouped_int(&cells[i])),
            present: parse_grouped_int(last),
        });
    }

    Ok(rows)
}
