//! Per-endpoint latency summaries and Markdown results files.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::extract::RequestRecord;

/// Aggregated latency figures for one method + endpoint pair
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EndpointStats {
    pub method: String,
    pub endpoint: String,
    pub count: usize,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub total_bytes: u64,
}

/// (p50, p95, p99) of an already sorted, non-empty slice
fn percentiles(sorted: &[f64]) -> (f64, f64, f64) {
    let len = sorted.len();
    let at = |q: f64| sorted[((len as f64 * q) as usize).min(len - 1)];
    (at(0.50), at(0.95), at(0.99))
}

/// Group records by endpoint and method.
///
/// Records whose response time does not parse as a number are left out.
/// Output is ordered by endpoint, then method.
pub fn summarize(records: &[RequestRecord]) -> Vec<EndpointStats> {
    let mut groups: BTreeMap<(&str, &str), (Vec<f64>, u64)> = BTreeMap::new();
    for record in records {
        let Some(latency) = record.response_time_ms() else {
            continue;
        };
        let entry = groups
            .entry((record.endpoint.as_str(), record.method.as_str()))
            .or_default();
        entry.0.push(latency);
        entry.1 += record.size_bytes().unwrap_or(0);
    }

    groups
        .into_iter()
        .map(|((endpoint, method), (mut times, total_bytes))| {
            times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let (p50_ms, p95_ms, p99_ms) = percentiles(&times);
            EndpointStats {
                method: method.to_string(),
                endpoint: endpoint.to_string(),
                count: times.len(),
                mean_ms: times.iter().sum::<f64>() / times.len() as f64,
                p50_ms,
                p95_ms,
                p99_ms,
                total_bytes,
            }
        })
        .collect()
}

/// Render stats as a Markdown table
pub fn render_markdown(stats: &[EndpointStats]) -> String {
    let total: usize = stats.iter().map(|s| s.count).sum();
    let mut out = format!(
        "\n**Endpoints**: {} | **Requests**: {}\n\n\
         | Method | Endpoint | Count | Mean | p50 | p95 | p99 | Bytes |\n\
         |--------|----------|-------|------|-----|-----|-----|-------|\n",
        stats.len(),
        total
    );
    for s in stats {
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.2}ms | {:.2}ms | {:.2}ms | {:.2}ms | {} |",
            s.method, s.endpoint, s.count, s.mean_ms, s.p50_ms, s.p95_ms, s.p99_ms, s.total_bytes
        );
    }
    out
}

/// Replace or append a `## title` section in a Markdown results file.
///
/// A section runs until the next `## ` heading or the end of the file. The
/// file is created if missing.
pub fn update_section(path: impl AsRef<Path>, title: &str, content: &str) -> Result<()> {
    let path = path.as_ref();
    let file_content = if path.exists() {
        fs::read_to_string(path)?
    } else {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        format!(
            "# Train Ticket Load Test Results\n\n**Generated**: {}\n\n---\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M")
        )
    };

    let section_marker = format!("## {title}");
    let mut new_content = String::with_capacity(file_content.len() + content.len());

    if let Some(section_start) = find_heading(&file_content, &section_marker) {
        let after_marker = section_start + section_marker.len();
        let section_end = file_content[after_marker..]
            .find("\n## ")
            .map(|pos| after_marker + pos)
            .unwrap_or(file_content.len());

        new_content.push_str(&file_content[..section_start]);
        new_content.push_str(&section_marker);
        new_content.push('\n');
        new_content.push_str(content);
        new_content.push_str(&file_content[section_end..]);
    } else {
        new_content.push_str(&file_content);
        if !new_content.is_empty() && !new_content.ends_with('\n') {
            new_content.push('\n');
        }
        new_content.push_str(&section_marker);
        new_content.push('\n');
        new_content.push_str(content);
        new_content.push('\n');
    }

    fs::write(path, new_content)?;
    Ok(())
}

/// Byte offset of the line that is exactly `heading`
fn find_heading(content: &str, heading: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == heading {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Status;

    fn record(method: &str, endpoint: &str, ms: &str, size: &str) -> RequestRecord {
        RequestRecord {
            timestamp: "2024-05-01 12:00:00,000".to_string(),
            status: Status::Success,
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            response_time: ms.to_string(),
            size: size.to_string(),
        }
    }

    #[test]
    fn groups_by_endpoint_and_method() {
        let mut records: Vec<_> = (1..=100)
            .map(|i| record("GET", "/api/v1/b", &i.to_string(), "10"))
            .collect();
        records.push(record("POST", "/api/v1/a", "5.5", "3"));
        records.push(record("GET", "/api/v1/a", "1.2.3", "3"));

        let stats = summarize(&records);
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].endpoint, "/api/v1/a");
        assert_eq!(stats[0].method, "POST");
        assert_eq!(stats[0].count, 1);
        assert_eq!(stats[0].p99_ms, 5.5);

        let b = &stats[1];
        assert_eq!(b.count, 100);
        assert_eq!(b.total_bytes, 1000);
        assert_eq!(b.mean_ms, 50.5);
        assert_eq!(b.p50_ms, 51.0);
        assert_eq!(b.p95_ms, 96.0);
        assert_eq!(b.p99_ms, 100.0);
    }

    #[test]
    fn markdown_lists_every_endpoint() {
        let stats = summarize(&[record("GET", "/api/v1/x", "2", "8")]);
        let md = render_markdown(&stats);
        assert!(md.contains("**Endpoints**: 1 | **Requests**: 1"));
        assert!(md.contains("| GET | /api/v1/x | 1 | 2.00ms | 2.00ms | 2.00ms | 2.00ms | 8 |"));
    }

    #[test]
    fn update_section_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RESULTS.md");

        update_section(&path, "Coarse", "first\n").unwrap();
        update_section(&path, "Fine", "other\n").unwrap();
        update_section(&path, "Coarse", "second\n").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Train Ticket Load Test Results"));
        assert!(!content.contains("first"));
        assert_eq!(content.matches("## Coarse").count(), 1);
        let coarse = content.find("## Coarse\nsecond").unwrap();
        let fine = content.find("## Fine\nother").unwrap();
        assert!(coarse < fine);
    }

    #[test]
    fn update_section_ignores_longer_headings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RESULTS.md");
        fs::write(&path, "# Results\n\n## Fine Profile\nkeep\n\n### Fine\nnested\n").unwrap();

        update_section(&path, "Fine", "first\n").unwrap();
        update_section(&path, "Fine", "second\n").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("## Fine Profile\nkeep\n"));
        assert!(content.contains("### Fine\nnested\n"));
        assert!(!content.contains("first"));
        assert_eq!(content.lines().filter(|l| *l == "## Fine").count(), 1);
        assert!(content.ends_with("## Fine\nsecond\n"));
    }
}
