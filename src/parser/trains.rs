//! Train-station monitor extractor
//!
//! The monitor renders a table whose header row (`thead#headerTabId`) and
//! body rows (`tbody#bodyTabId`) key every cell by an `id` attribute. Icon
//! cells (train category, platform change markers) carry an `<img>` whose
//! source is kept instead of text.

use scraper::{ElementRef, Html};

use crate::models::{TimetableRow, TrainTimetable};
use crate::parser::selectors::{
    CELL, DIV, IMAGE, TRAIN_BODY_ROWS, TRAIN_HEADER_CELLS, TRAIN_HEADER_SECTION,
};
use crate::utils::error::ExtractError;

/// Extract the arrivals/departures board
///
/// # Errors
///
/// Returns `ExtractError::NotFound` if the page has no board header
pub fn extract_train_timetable(html: &str) -> Result<TrainTimetable, ExtractError> {
    let document = Html::parse_document(html);

    if document.select(&TRAIN_HEADER_SECTION).next().is_none() {
        return Err(ExtractError::not_found("train board header (thead#headerTabId)"));
    }

    let mut header = TimetableRow::new();
    for cell in document.select(&TRAIN_HEADER_CELLS) {
        if let Some(id) = cell.value().attr("id") {
            header.insert(id.to_string(), element_text(&cell).trim().to_string());
        }
    }

    let trains: Vec<TimetableRow> = document
        .select(&TRAIN_BODY_ROWS)
        .map(|row| {
            row.select(&CELL)
                .filter_map(|cell| {
                    let id = cell.value().attr("id")?;
                    Some((id.to_string(), cell_value(&cell)))
                })
                .collect()
        })
        .collect();

    tracing::debug!(columns = header.len(), trains = trains.len(), "Extracted train board");

    Ok(TrainTimetable::new(header, trains))
}

/// Image source for icon cells, else nested `<div>` text, else the cell text
fn cell_value(cell: &ElementRef<'_>) -> String {
    if let Some(image) = cell.select(&IMAGE).next() {
        return image.value().attr("src").unwrap_or_default().to_string();
    }

    let nested: String = cell.select(&DIV).map(|div| element_text(&div)).collect();
    let nested = nested.trim();
    if !nested.is_empty() {
        return nested.to_string();
    }

    element_text(cell).trim().to_string()
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect()
}
