//! Source-specific extractors
//!
//! Each extractor turns one upstream's raw markup or JSON into typed
//! records. They are pure functions over the fetched body: fetching,
//! delays and retries live in [`crate::crawler`].
//!
//! | Source            | Extractor                          | Input |
//! |-------------------|------------------------------------|-------|
//! | Flight tracker    | [`extract_flights`]                | HTML with embedded state |
//! | Train monitor     | [`extract_train_timetable`]        | HTML table |
//! | Tourism portal    | [`extract_tourism`]                | HTML table |
//! | Transit stop API  | [`extract_stop_times`]             | JSON |
//! | Population portal | [`extract_population`]             | HTML table |

pub mod flights;
pub mod population;
pub mod selectors;
pub mod tourism;
pub mod trains;
pub mod transit;

pub use flights::{extract_flights, slice_embedded_json, NEXT_DATA_MARKER};
pub use population::extract_population;
pub use tourism::extract_tourism;
pub use trains::extract_train_timetable;
pub use transit::{extract_stop_times, extract_stop_times_str};
