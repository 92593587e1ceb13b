//! Flight-tracker extractor
//!
//! The tracker page ships its state as a JavaScript assignment inside a
//! `<script>` block (`__NEXT_DATA__ = {...};`). The object is not strict
//! JSON around the edges, so it is sliced out by substring search: from the
//! first `{` to the last `};` terminator.

use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{FlightRow, FlightScrapeResult};
use crate::parser::selectors::SCRIPT;
use crate::utils::error::ExtractError;

/// Marker identifying the data-injection script block
pub const NEXT_DATA_MARKER: &str = "__NEXT_DATA__";

#[derive(Debug, Deserialize)]
struct NextData {
    props: Option<Props>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Props {
    initial_state: Option<InitialState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitialState {
    flight_tracker: Option<FlightTracker>,
    app: Option<AppState>,
}

#[derive(Debug, Deserialize)]
struct FlightTracker {
    route: Option<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    header: Option<RouteHeader>,
    flights: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RouteHeader {
    date: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppState {
    app_host: Option<String>,
}

/// Extract the flight board embedded in a tracker page
///
/// # Errors
///
/// Returns `ExtractError::NotFound` if no script carries the marker or the
/// JSON delimiters are missing, `ExtractError::Malformed` if the sliced
/// object does not parse or lacks one of the expected fields.
pub fn extract_flights(html: &str, is_arrival: bool) -> Result<FlightScrapeResult, ExtractError> {
    let document = Html::parse_document(html);

    let script_text = document
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
        .find(|text| text.contains(NEXT_DATA_MARKER))
        .ok_or_else(|| {
            ExtractError::not_found(format!("<script> tag containing {NEXT_DATA_MARKER}"))
        })?;

    let json = slice_embedded_json(script_text.trim())?;
    let next_data: NextData = serde_json::from_str(json)
        .map_err(|e| ExtractError::malformed(format!("embedded flight JSON: {e}")))?;

    let state = next_data
        .props
        .and_then(|p| p.initial_state)
        .ok_or_else(|| missing("props.initialState"))?;

    let route = state
        .flight_tracker
        .and_then(|t| t.route)
        .ok_or_else(|| missing("props.initialState.flightTracker.route"))?;

    let header = route
        .header
        .ok_or_else(|| missing("props.initialState.flightTracker.route.header"))?;

    let date = header
        .date
        .ok_or_else(|| missing("props.initialState.flightTracker.route.header.date"))?;

    let airport_name = header
        .title
        .ok_or_else(|| missing("props.initialState.flightTracker.route.header.title"))?;

    let app_host_url = state
        .app
        .and_then(|a| a.app_host)
        .ok_or_else(|| missing("props.initialState.app.appHost"))?;

    let flights = route
        .flights
        .ok_or_else(|| missing("props.initialState.flightTracker.route.flights"))?
        .into_iter()
        .map(FlightRow)
        .collect();

    Ok(FlightScrapeResult {
        date,
        airport_name,
        app_host_url,
        flights,
        is_arrival,
    })
}

/// Slice from the first `{` up to and including the `}` of the last `};`
pub fn slice_embedded_json(text: &str) -> Result<&str, ExtractError> {
    let first = text.find('{');
    let last = text.rfind("};");

    match (first, last) {
        (Some(start), Some(end)) if end >= start => Ok(&text[start..=end]),
        _ => Err(ExtractError::not_found(
            "JSON delimiters in data-injection script",
        )),
    }
}

fn missing(path: &str) -> ExtractError {
    ExtractError::malformed(format!("missing field {path}"))
}
