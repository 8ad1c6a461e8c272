//! Request log to CSV conversion.
//!
//! Each line of a request log is searched for a SUCCESS/FAILURE record
//! carrying timestamp, method, endpoint, response time and size. Matching
//! lines become CSV rows with the columns
//! `Timestamp, Method, Endpoint, Response Time (ms), Size (bytes)`.
//! Lines that do not match, including FAILURE lines (which carry an error
//! instead of a size), are skipped.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;

/// CSV header row
pub const CSV_HEADER: [&str; 5] = [
    "Timestamp",
    "Method",
    "Endpoint",
    "Response Time (ms)",
    "Size (bytes)",
];

static LOG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\[(?P<timestamp>[\d\-:\s,]+)\]\s+[^\]]+/INFO/[\w.\-]+:\s+",
        r"(?P<status>SUCCESS|FAILURE):\s+(?P<method>\w+)\s+(?P<endpoint>\S+)\s+",
        r"(?P<response_time>[\d.]+)ms\s+(?P<size>\d+)\s+bytes",
    ))
    .expect("request log pattern is valid")
});

/// Outcome keyword of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl FromStr for Status {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Status::Success),
            "FAILURE" => Ok(Status::Failure),
            _ => Err(()),
        }
    }
}

/// One extracted request; text fields are kept exactly as logged
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub timestamp: String,
    pub status: Status,
    pub method: String,
    pub endpoint: String,
    pub response_time: String,
    pub size: String,
}

impl RequestRecord {
    pub fn response_time_ms(&self) -> Option<f64> {
        self.response_time.parse().ok()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size.parse().ok()
    }

    fn csv_row(&self) -> [&str; 5] {
        [
            self.timestamp.as_str(),
            self.method.as_str(),
            self.endpoint.as_str(),
            self.response_time.as_str(),
            self.size.as_str(),
        ]
    }
}

/// Extract a record from one log line, if it matches.
pub fn parse_line(line: &str) -> Option<RequestRecord> {
    let caps = LOG_PATTERN.captures(line)?;
    let field = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());
    Some(RequestRecord {
        timestamp: field("timestamp")?,
        status: caps.name("status")?.as_str().parse().ok()?,
        method: field("method")?,
        endpoint: field("endpoint")?,
        response_time: field("response_time")?,
        size: field("size")?,
    })
}

/// Extract every matching record, in input order.
pub fn extract_records<R: BufRead>(reader: R) -> Result<Vec<RequestRecord>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        if let Some(record) = parse_line(&line?) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Write the header and one row per record.
pub fn write_csv<W: Write>(records: &[RequestRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.write_record(record.csv_row())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Convert a request log file into a CSV file, returning the extracted records.
pub fn convert(log_path: impl AsRef<Path>, csv_path: impl AsRef<Path>) -> Result<Vec<RequestRecord>> {
    let log_path = log_path.as_ref();
    let csv_path = csv_path.as_ref();

    let records = extract_records(BufReader::new(File::open(log_path)?))?;
    if let Some(parent) = csv_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    write_csv(&records, File::create(csv_path)?)?;

    tracing::info!(
        log = %log_path.display(),
        csv = %csv_path.display(),
        rows = records.len(),
        "converted request log"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCUST_LINE: &str = "[2024-05-01 12:00:00,123] worker-3/INFO/locust: SUCCESS: GET /api/v1/priceservice/prices 15.42ms 2048 bytes";

    #[test]
    fn parses_locust_style_line() {
        let record = parse_line(LOCUST_LINE).unwrap();
        assert_eq!(record.timestamp, "2024-05-01 12:00:00,123");
        assert_eq!(record.status, Status::Success);
        assert_eq!(record.method, "GET");
        assert_eq!(record.endpoint, "/api/v1/priceservice/prices");
        assert_eq!(record.response_time, "15.42");
        assert_eq!(record.size, "2048");
        assert_eq!(record.response_time_ms(), Some(15.42));
        assert_eq!(record.size_bytes(), Some(2048));
    }

    #[test]
    fn parses_harness_line() {
        let line = "[2024-05-01 12:00:00,123] bench/INFO/train_load: SUCCESS: PUT /api/v1/userservice/users 3.000ms 0 bytes";
        let record = parse_line(line).unwrap();
        assert_eq!(record.method, "PUT");
        assert_eq!(record.size, "0");
    }

    #[test]
    fn integer_latency_is_accepted() {
        let line = "[2024-05-01 12:00:00,123] h/INFO/locust: SUCCESS: POST /api/v1/x 7ms 12 bytes";
        assert_eq!(parse_line(line).unwrap().response_time, "7");
    }

    #[test]
    fn skips_failures_and_noise() {
        let lines = [
            "[2024-05-01 12:00:01,000] h/ERROR/locust: FAILURE: GET /api/v1/seatservice/welcome 2.1ms ConnectionRefused",
            "[2024-05-01 12:00:01,000] h/INFO/locust: Request limit reached, skipping task",
            "[2024-05-01 12:00:01,000] h/INFO/locust: Total requests: 82",
            "Type     Name      # reqs",
            "",
        ];
        for line in lines {
            assert!(parse_line(line).is_none(), "{line:?} should not match");
        }
    }

    #[test]
    fn failure_with_size_is_kept_with_status() {
        let line = "[2024-05-01 12:00:01,000] h/INFO/locust: FAILURE: GET /api/v1/x 2.1ms 10 bytes";
        assert_eq!(parse_line(line).unwrap().status, Status::Failure);
    }

    #[test]
    fn csv_always_has_header() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Timestamp,Method,Endpoint,Response Time (ms),Size (bytes)\n"
        );
    }

    #[test]
    fn extracts_in_input_order() {
        let log = format!(
            "{LOCUST_LINE}\nnoise\n{}\n",
            "[2024-05-01 12:00:02,500] h/INFO/locust: SUCCESS: POST /api/v1/stationservice/stations 30.1ms 99 bytes"
        );
        let records = extract_records(log.as_bytes()).unwrap();
        let endpoints: Vec<_> = records.iter().map(|r| r.endpoint.as_str()).collect();
        assert_eq!(
            endpoints,
            ["/api/v1/priceservice/prices", "/api/v1/stationservice/stations"]
        );

        let mut out = Vec::new();
        write_csv(&records, &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        // The comma in the timestamp forces quoting
        assert_eq!(
            csv.lines().nth(2),
            Some("\"2024-05-01 12:00:02,500\",POST,/api/v1/stationservice/stations,30.1,99")
        );
    }
}
