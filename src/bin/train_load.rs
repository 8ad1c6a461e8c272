//! Train Ticket Load Test
//!
//! Runs one Goose scenario per train-ticketing service endpoint and writes
//! every request outcome to a request log under `results/`.
//!
//! Usage:
//!   cargo run --release --bin train-load -- -u 100 -r 100 -t 1m
//!   cargo run --release --bin train-load -- --profile fine -u 41 -r 41 -t 2m --iteration 3
//!
//! Output:
//!   results/requests_<timestamp>.log                 (coarse profile)
//!   results/fine/requests_<pacing>_<u>_<r>_<t>_<i>.log (fine profile)
//!   results/<profile>_report.html, results/run_summary.json

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use train_load::config::DEFAULT_TARGET_HOST;
use train_load::{
    env_hatch_rate, env_run_time, env_target_host, env_users, init_tracing, parse_run_time,
    run_attack, warmup_hosts, LoadPlan, Profile, RequestLog, RunConfig, RunSummary,
    DEFAULT_HATCH_RATE, DEFAULT_LIMIT, DEFAULT_PACING_SECS, DEFAULT_RUN_TIME, DEFAULT_USERS,
    RESULTS_DIR,
};

/// Warm-up requests sent to each distinct host
const WARMUP_PER_HOST: usize = 20;

#[derive(Debug, Parser)]
#[command(name = "train-load", about = "Load test the train-ticketing microservices")]
struct Args {
    /// Number of virtual users
    #[arg(short = 'u', long, default_value_t = env_users(DEFAULT_USERS))]
    users: usize,

    /// Users spawned per second
    #[arg(short = 'r', long = "rate", default_value_t = env_hatch_rate(DEFAULT_HATCH_RATE))]
    rate: usize,

    /// Run time, e.g. 90s, 2m, 1h30m
    #[arg(short = 't', long, default_value_t = env_run_time(DEFAULT_RUN_TIME))]
    run_time: String,

    /// Iteration number, used to name the fine profile's request log
    #[arg(long, default_value_t = 1)]
    iteration: u32,

    /// Deployment layout under test
    #[arg(long, value_enum, default_value_t = Profile::Coarse)]
    profile: Profile,

    /// Requests each task may fire per run (fine profile)
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: u64,

    /// Seconds between iterations of a task
    #[arg(long, default_value_t = DEFAULT_PACING_SECS)]
    pacing: u64,

    /// Host the service ports are reached on
    #[arg(long, default_value_t = env_target_host(DEFAULT_TARGET_HOST))]
    target_host: String,

    /// Directory for request logs, reports and the run summary
    #[arg(long, default_value = RESULTS_DIR)]
    results_dir: PathBuf,

    /// Open connections to every host before the measured run
    #[arg(long)]
    warmup: bool,

    /// Diagnostic log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> train_load::Result<RunConfig> {
        let run_time = parse_run_time(&self.run_time)?;
        Ok(RunConfig {
            profile: self.profile,
            users: self.users,
            hatch_rate: self.rate,
            run_time_label: self.run_time,
            run_time,
            iteration: self.iteration,
            limit: self.limit,
            pacing: Duration::from_secs(self.pacing),
            target_host: self.target_host,
            results_dir: self.results_dir,
            warmup: self.warmup,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = args.into_config()?;
    config.validate()?;

    let log_path = config.request_log_path(Local::now());
    let log = RequestLog::create(&log_path)
        .with_context(|| format!("creating request log {}", log_path.display()))?
        .install()?;
    tracing::info!(path = %log.path().display(), "request log");

    let plan = LoadPlan::new(&config);
    tracing::info!(
        profile = config.profile.name(),
        scenarios = plan.len(),
        users = config.users,
        rate = config.hatch_rate,
        run_time = %config.run_time_label,
        ceiling = ?plan.total_ceiling(),
        "starting load test"
    );

    if config.warmup {
        let hosts = plan.hosts();
        let answered = warmup_hosts(&hosts, WARMUP_PER_HOST).await?;
        tracing::info!(hosts = hosts.len(), answered, "warm-up complete");
    }

    let outcome = run_attack(&plan, &config).await;
    let total = plan.total_fired();
    let metrics = log.finish_run(total, outcome)?;
    tracing::info!(total, "load test finished");

    RunSummary::new(&config, &plan, &metrics).emit(config.summary_path())?;
    Ok(())
}
