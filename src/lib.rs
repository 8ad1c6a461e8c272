//! Common infrastructure for the train-ticketing Goose load tests
//!
//! Provides the endpoint catalog, per-task request gates, the Goose scenario
//! wiring, the request log, and the log-to-CSV extractor used after a run.
//!
//! ## Features
//! - Two endpoint profiles (coarse shared hosts, fine one-port-per-service)
//! - Per-task request ceilings (RequestGate) shared by every virtual user
//! - Locust-compatible request log lines (SUCCESS/FAILURE with latency and size)
//! - Log extraction to CSV and per-endpoint latency summaries

pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod logging;
pub mod summary;
pub mod tasks;

pub use catalog::{Body, Endpoint, HttpMethod, Profile, Quota, RenderedRequest, Route};
pub use config::{
    env_run_time, env_target_host, env_users, env_hatch_rate, parse_run_time, RunConfig,
    DEFAULT_HATCH_RATE, DEFAULT_LIMIT, DEFAULT_PACING_SECS, DEFAULT_RUN_TIME, DEFAULT_USERS,
    RESULTS_DIR,
};
pub use error::{HarnessError, Result};
pub use extract::{convert, extract_records, parse_line, write_csv, RequestRecord, Status};
pub use gate::{LoadPlan, PlannedTask, RequestGate};
pub use logging::{init_tracing, RequestLog, RequestOutcome};
pub use summary::{summarize, update_section, EndpointStats};
pub use tasks::{build_scenario, fire, run_attack, warmup_hosts, RunSummary};
