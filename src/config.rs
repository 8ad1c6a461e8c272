//! Shared run configuration.
//!
//! All run parameters are centralized here. CLI defaults come from the
//! constants below, optionally overridden through `TRAIN_LOAD_*` variables.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::catalog::Profile;
use crate::error::{HarnessError, Result};

/// Default number of virtual users
pub const DEFAULT_USERS: usize = 100;

/// Default users spawned per second
pub const DEFAULT_HATCH_RATE: usize = 100;

/// Default run time, in the same notation as the CLI flag
pub const DEFAULT_RUN_TIME: &str = "1m";

/// Requests each gated task may fire per run
pub const DEFAULT_LIMIT: u64 = 2;

/// Seconds between iterations of a task
pub const DEFAULT_PACING_SECS: u64 = 1;

/// Directory for request logs, reports and run summaries
pub const RESULTS_DIR: &str = "results";

/// Host every service port is reached on
pub const DEFAULT_TARGET_HOST: &str = "localhost";

/// Read virtual user count from TRAIN_LOAD_USERS, with fallback default
pub fn env_users(default: usize) -> usize {
    std::env::var("TRAIN_LOAD_USERS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Read hatch rate from TRAIN_LOAD_RATE, with fallback default
pub fn env_hatch_rate(default: usize) -> usize {
    std::env::var("TRAIN_LOAD_RATE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Read run time notation from TRAIN_LOAD_RUN_TIME, with fallback default
pub fn env_run_time(default: &str) -> String {
    std::env::var("TRAIN_LOAD_RUN_TIME").unwrap_or_else(|_| default.to_string())
}

/// Read target host from TRAIN_LOAD_TARGET_HOST, with fallback default
pub fn env_target_host(default: &str) -> String {
    std::env::var("TRAIN_LOAD_TARGET_HOST").unwrap_or_else(|_| default.to_string())
}

/// Parse a run time such as `90s`, `2m`, `1h30m` or a bare number of seconds.
pub fn parse_run_time(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(HarnessError::InvalidRunTime(input.to_string()));
    }
    if let Ok(secs) = trimmed.parse::<u64>() {
        return if secs == 0 {
            Err(HarnessError::InvalidRunTime(input.to_string()))
        } else {
            Ok(Duration::from_secs(secs))
        };
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(HarnessError::InvalidRunTime(input.to_string())),
        };
        let value: u64 = digits
            .parse()
            .map_err(|_| HarnessError::InvalidRunTime(input.to_string()))?;
        total = value
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| HarnessError::InvalidRunTime(input.to_string()))?;
        digits.clear();
    }
    if !digits.is_empty() || total == 0 {
        return Err(HarnessError::InvalidRunTime(input.to_string()));
    }
    Ok(Duration::from_secs(total))
}

/// Configuration for one load test run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub profile: Profile,
    pub users: usize,
    pub hatch_rate: usize,
    /// Run time as given on the command line, kept for file naming
    pub run_time_label: String,
    pub run_time: Duration,
    pub iteration: u32,
    pub limit: u64,
    pub pacing: Duration,
    pub target_host: String,
    pub results_dir: PathBuf,
    pub warmup: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Coarse,
            users: DEFAULT_USERS,
            hatch_rate: DEFAULT_HATCH_RATE,
            run_time_label: DEFAULT_RUN_TIME.to_string(),
            run_time: Duration::from_secs(60),
            iteration: 1,
            limit: DEFAULT_LIMIT,
            pacing: Duration::from_secs(DEFAULT_PACING_SECS),
            target_host: DEFAULT_TARGET_HOST.to_string(),
            results_dir: PathBuf::from(RESULTS_DIR),
            warmup: false,
        }
    }
}

impl RunConfig {
    /// Reject configurations Goose would accept but that make no sense here.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(HarnessError::InvalidLimit);
        }
        Ok(())
    }

    /// Base URL for a service port on the target host
    pub fn host_for(&self, port: u16) -> String {
        format!("http://{}:{}", self.target_host, port)
    }

    /// Request log location for this run.
    ///
    /// Coarse runs are stamped with the start time; fine runs are named after
    /// their parameters so repeated iterations line up side by side.
    pub fn request_log_path(&self, started: DateTime<Local>) -> PathBuf {
        match self.profile {
            Profile::Coarse => self.results_dir.join(format!(
                "requests_{}.log",
                started.format("%Y%m%d%H%M%S")
            )),
            Profile::Fine => self.results_dir.join("fine").join(format!(
                "requests_{}_{}_{}_{}_{}.log",
                self.pacing.as_secs(),
                self.users,
                self.hatch_rate,
                self.run_time_label,
                self.iteration
            )),
        }
    }

    /// Goose HTML report location
    pub fn report_path(&self) -> PathBuf {
        self.results_dir.join(format!("{}_report.html", self.profile.name()))
    }

    /// JSON run summary location
    pub fn summary_path(&self) -> PathBuf {
        self.results_dir.join("run_summary.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_run_time_notations() {
        assert_eq!(parse_run_time("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_run_time("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_run_time("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_run_time("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_run_time(" 2m10s ").unwrap(), Duration::from_secs(130));
    }

    #[test]
    fn rejects_bad_run_times() {
        for bad in ["", "0", "0s", "m", "10x", "5m3", "1.5m"] {
            assert!(
                matches!(parse_run_time(bad), Err(HarnessError::InvalidRunTime(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn overflowing_run_times_are_rejected() {
        for huge in ["5124095576030432h", "5124095576030431h1h"] {
            assert!(
                matches!(parse_run_time(huge), Err(HarnessError::InvalidRunTime(_))),
                "{huge:?} should be rejected"
            );
        }
    }

    #[test]
    fn zero_limit_is_invalid() {
        let config = RunConfig {
            limit: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HarnessError::InvalidLimit)));
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn request_log_path_depends_on_profile() {
        let started = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();

        let coarse = RunConfig::default();
        assert_eq!(
            coarse.request_log_path(started),
            PathBuf::from("results/requests_20240501123005.log")
        );

        let fine = RunConfig {
            profile: Profile::Fine,
            users: 20,
            hatch_rate: 5,
            run_time_label: "2m".to_string(),
            iteration: 3,
            ..Default::default()
        };
        assert_eq!(
            fine.request_log_path(started),
            PathBuf::from("results/fine/requests_1_20_5_2m_3.log")
        );
    }

    #[test]
    fn host_uses_target_and_port() {
        let config = RunConfig {
            target_host: "10.0.0.7".to_string(),
            ..Default::default()
        };
        assert_eq!(config.host_for(12345), "http://10.0.0.7:12345");
    }
}
