//! End-to-end check: request log written by the harness, converted to CSV,
//! then summarized into a Markdown results file.

use std::fs;

use train_load::summary::render_markdown;
use train_load::{convert, summarize, update_section, HttpMethod, RequestLog, RequestOutcome};

fn outcome(method: HttpMethod, path: &str, ms: f64, size: usize) -> RequestOutcome<'_> {
    RequestOutcome {
        method,
        path,
        response_time_ms: ms,
        result: Ok(size),
    }
}

#[test]
fn harness_log_round_trips_through_csv_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("fine").join("requests_1_41_41_1m_1.log");
    let csv_path = dir.path().join("csv").join("requests.csv");
    let results_path = dir.path().join("RESULTS.md");

    let log = RequestLog::create(&log_path).unwrap();
    log.record(&outcome(HttpMethod::Get, "/api/v1/priceservice/prices", 10.0, 100));
    log.record(&outcome(HttpMethod::Get, "/api/v1/priceservice/prices", 30.0, 300));
    log.record(&RequestOutcome {
        method: HttpMethod::Get,
        path: "/api/v1/seatservice/welcome",
        response_time_ms: 1.5,
        result: Err("error sending request".to_string()),
    });
    log.note("Request limit reached, skipping task");
    log.record(&outcome(HttpMethod::Post, "/api/v1/stationservice/stations", 5.25, 42));
    log.note("Total requests: 4");
    log.flush().unwrap();

    let records = convert(&log_path, &csv_path).unwrap();
    assert_eq!(records.len(), 3);

    let csv = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Timestamp,Method,Endpoint,Response Time (ms),Size (bytes)"
    );
    assert_eq!(lines.len(), 4);
    assert!(lines[1].ends_with(",GET,/api/v1/priceservice/prices,10.000,100"));
    assert!(lines[3].ends_with(",POST,/api/v1/stationservice/stations,5.250,42"));
    assert!(!csv.contains("seatservice"));

    let stats = summarize(&records);
    assert_eq!(stats.len(), 2);
    let prices = stats
        .iter()
        .find(|s| s.endpoint == "/api/v1/priceservice/prices")
        .unwrap();
    assert_eq!(prices.count, 2);
    assert_eq!(prices.mean_ms, 20.0);
    assert_eq!(prices.total_bytes, 400);

    update_section(&results_path, "Fine Profile", &render_markdown(&stats)).unwrap();
    let results = fs::read_to_string(&results_path).unwrap();
    assert!(results.contains("## Fine Profile"));
    assert!(results.contains("| POST | /api/v1/stationservice/stations | 1 |"));
}

#[test]
fn missing_log_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert(dir.path().join("absent.log"), dir.path().join("out.csv")).unwrap_err();
    assert!(matches!(err, train_load::HarnessError::Io(_)));
}
