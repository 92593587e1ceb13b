//! Transit stop-times extractor
//!
//! The stop API answers with an array whose first element describes the
//! queried stop: a list of lines, each with its upcoming `stopTimes`. Text
//! fields are loosely typed upstream (numbers show up where strings are
//! expected), so they are read as JSON values and normalized here.

use serde::Deserialize;
use serde_json::Value;

use crate::models::StopTimeRecord;
use crate::utils::error::ExtractError;
use crate::utils::time_to_seconds;

#[derive(Debug, Deserialize)]
struct StopPayload {
    #[serde(default)]
    lines: Option<Vec<Option<LinePayload>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinePayload {
    line_name: Option<Value>,
    line_path: Option<Value>,
    #[serde(default)]
    stop_times: Option<Vec<Option<StopTimePayload>>>,
}

#[derive(Debug, Deserialize)]
struct StopTimePayload {
    #[serde(rename = "sTimeDeparture")]
    departure: Option<Value>,
    #[serde(rename = "sNameNext")]
    next_name: Option<Value>,
    #[serde(rename = "sTimeNext")]
    next_time: Option<Value>,
    #[serde(rename = "sNameTerminal")]
    terminal_name: Option<Value>,
    #[serde(rename = "sTimeTerminal")]
    terminal_time: Option<Value>,
}

/// Extract departures for one stop from the stop API response
///
/// Entries without a departure time, or with the `Undefined` sentinel, are
/// skipped. An empty response array yields no records.
///
/// # Errors
///
/// Returns `ExtractError::Malformed` if the response is not an array or its
/// first element does not have the expected shape
pub fn extract_stop_times(
    response: &Value,
    stop_id: &str,
) -> Result<Vec<StopTimeRecord>, ExtractError> {
    let entries = response
        .as_array()
        .ok_or_else(|| ExtractError::malformed("stop response is not an array"))?;

    let Some(first) = entries.first() else {
        return Ok(Vec::new());
    };
    if first.is_null() {
        return Ok(Vec::new());
    }

    let stop: StopPayload = serde_json::from_value(first.clone())
        .map_err(|e| ExtractError::malformed(format!("stop {stop_id}: {e}")))?;

    let mut records = Vec::new();
    for line in stop.lines.unwrap_or_default().into_iter().flatten() {
        let line_name = text_field(&line.line_name);
        let line_path = text_field(&line.line_path);

        for stop_time in line.stop_times.unwrap_or_default().into_iter().flatten() {
            let Some(departure_text) = text_field(&stop_time.departure) else {
                continue;
            };
            let Some(departure_seconds) = time_to_seconds(&departure_text) else {
                tracing::debug!(stop_id, departure = %departure_text, "Skipping unusable departure time");
                continue;
            };

            records.push(StopTimeRecord {
                stop_id: stop_id.to_string(),
                line_name: line_name.clone(),
                line_path: line_path.clone(),
                departure_text,
                departure_seconds,
                next_stop_name: text_field(&stop_time.next_name),
                next_stop_time: text_field(&stop_time.next_time),
                terminal_name: text_field(&stop_time.terminal_name),
                terminal_time: text_field(&stop_time.terminal_time),
            });
        }
    }

    Ok(records)
}

/// Parse a raw response body, then extract
///
/// # Errors
///
/// Returns `ExtractError::Malformed` if the body is not JSON
pub fn extract_stop_times_str(body: &str, stop_id: &str) -> Result<Vec<StopTimeRecord>, ExtractError> {
    let response: Value = serde_json::from_str(body)
        .map_err(|e| ExtractError::malformed(format!("stop {stop_id} response: {e}")))?;
    extract_stop_times(&response, stop_id)
}

/// Strings pass through, numbers are rendered, empty and other values are absent
fn text_field(value: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> Value {
        json!([{
            "lines": [
                {
                    "lineName": "5.1",
                    "linePath": "Lido - P.le Roma",
                    "stopTimes": [
                        {"sTimeDeparture": "08:15:30", "sNameNext": "Ospedale", "sTimeNext": "08:19:00",
                         "sNameTerminal": "Lido S.M.E.", "sTimeTerminal": "08:40:00"},
                        {"sTimeDeparture": "Undefined"},
                        {"sNameNext": "Ospedale"},
                        null
                    ]
                },
                {
                    "lineName": 2,
                    "linePath": "",
                    "stopTimes": [{"sTimeDeparture": "23:59:59"}]
                },
                null,
                {"lineName": "N"}
            ]
        }])
    }

    #[test]
    fn test_extract_valid_stop_times() {
        let records = extract_stop_times(&response(), "5029").unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.stop_id, "5029");
        assert_eq!(first.line_name.as_deref(), Some("5.1"));
        assert_eq!(first.line_path.as_deref(), Some("Lido - P.le Roma"));
        assert_eq!(first.departure_text, "08:15:30");
        assert_eq!(first.departure_seconds, 29_730);
        assert_eq!(first.next_stop_name.as_deref(), Some("Ospedale"));
        assert_eq!(first.terminal_time.as_deref(), Some("08:40:00"));
    }

    #[test]
    fn test_loose_text_fields() {
        let records = extract_stop_times(&response(), "5029").unwrap();
        let second = &records[1];
        assert_eq!(second.line_name.as_deref(), Some("2"));
        assert_eq!(second.line_path, None);
        assert_eq!(second.departure_seconds, 86_399);
    }

    #[test]
    fn test_overflowing_departure_is_skipped() {
        let response = json!([{
            "lines": [{
                "lineName": "1",
                "stopTimes": [
                    {"sTimeDeparture": "1193047:00:00"},
                    {"sTimeDeparture": "06:02:00"}
                ]
            }]
        }]);

        let records = extract_stop_times(&response, "503").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].departure_seconds, 21_720);
    }

    #[test]
    fn test_empty_response_yields_nothing() {
        assert!(extract_stop_times(&json!([]), "503").unwrap().is_empty());
        assert!(extract_stop_times(&json!([{}]), "503").unwrap().is_empty());
        assert!(extract_stop_times(&json!([null]), "503").unwrap().is_empty());
    }

    #[test]
    fn test_non_array_is_malformed() {
        let err = extract_stop_times(&json!({"error": "busy"}), "503").unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }

    #[test]
    fn test_bad_shape_is_malformed() {
        let err = extract_stop_times(&json!([{"lines": "nope"}]), "503").unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }

    #[test]
    fn test_extract_from_body() {
        let body = r#"[{"lines":[{"lineName":"N","stopTimes":[{"sTimeDeparture":"00:30:00"}]}]}]"#;
        let records = extract_stop_times_str(body, "6084").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].departure_seconds, 1800);

        assert!(extract_stop_times_str("<html>", "6084").is_err());
    }
}
