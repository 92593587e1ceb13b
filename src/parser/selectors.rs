//! CSS selectors for the scraped source pages
//!
//! Each upstream page has one fixed layout; the selectors live here so the
//! markup assumptions are in one place when a site changes.

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    // Generic building blocks
    pub static ref SCRIPT: Selector = parse_selector!("script");
    pub static ref TABLE: Selector = parse_selector!("table");
    pub static ref TABLE_ROW: Selector = parse_selector!("table tr");
    pub static ref ROW: Selector = parse_selector!("tr");
    pub static ref CELL: Selector = parse_selector!("td");
    pub static ref IMAGE: Selector = parse_selector!("img");
    pub static ref DIV: Selector = parse_selector!("div");

    // Train monitor board
    pub static ref TRAIN_HEADER_SECTION: Selector = parse_selector!("thead#headerTabId");
    pub static ref TRAIN_HEADER_CELLS: Selector = parse_selector!("thead#headerTabId tr th");
    pub static ref TRAIN_BODY_ROWS: Selector = parse_selector!("tbody#bodyTabId tr");
}
