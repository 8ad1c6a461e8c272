//! Goose scenarios for the planned tasks.
//!
//! Every endpoint becomes its own scenario with its own host, mirroring one
//! user class per service: Goose spreads users evenly over the scenarios and
//! each user repeats its single transaction with a constant wait in between.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use goose::config::GooseConfiguration;
use goose::metrics::GooseMetrics;
use goose::prelude::*;
use tokio::task::JoinSet;

use crate::config::RunConfig;
use crate::error::Result;
use crate::gate::{LoadPlan, PlannedTask};
use crate::logging::{self, RequestOutcome};

/// Maximum in-flight warm-up requests
const WARMUP_CONCURRENCY: usize = 50;

/// Send one request for `task` if its gate still has room.
///
/// A refused gate is not an error: the transaction simply does nothing this
/// iteration. Network and HTTP failures are written to the request log
/// rather than returned, so Goose keeps the user running.
pub async fn fire(user: &mut GooseUser, task: &PlannedTask) -> TransactionResult {
    if !task.gate.try_acquire() {
        logging::note("Request limit reached, skipping task");
        return Ok(());
    }

    let request = task.endpoint.render(&mut rand::thread_rng());
    let method = GooseMethod::from(request.method);

    let mut request_builder = user.get_request_builder(&method, &request.path)?;
    if let Some(body) = &request.body {
        request_builder = request_builder
            .header("Content-Type", "application/json")
            .body(body.to_string());
    }
    let goose_request = GooseRequest::builder()
        .set_request_builder(request_builder)
        .build();

    let start = Instant::now();
    let goose = user.request(goose_request).await?;
    let response_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let result = if goose.request.success {
        match goose.response {
            Ok(response) => response
                .bytes()
                .await
                .map(|body| body.len())
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        }
    } else if goose.request.error.is_empty() {
        Err(format!("HTTP {}", goose.request.status_code))
    } else {
        Err(goose.request.error.clone())
    };

    logging::record_outcome(&RequestOutcome {
        method: request.method,
        path: &request.path,
        response_time_ms,
        result,
    });
    Ok(())
}

/// One scenario running one transaction against the task's host
pub fn build_scenario(task: PlannedTask, pacing: Duration) -> std::result::Result<Scenario, GooseError> {
    let name = task.endpoint.scenario;
    let host = task.host.clone();
    let task = Arc::new(task);

    let closure: TransactionFunction = Arc::new(move |user| {
        let task = Arc::clone(&task);
        Box::pin(async move { fire(user, &task).await })
    });

    Ok(Scenario::new(name)
        .set_host(&host)
        .set_wait_time(pacing, pacing)?
        .register_transaction(Transaction::new(closure).set_name(name)))
}

/// Register every task of the plan and run the attack to completion.
pub async fn run_attack(plan: &LoadPlan, config: &RunConfig) -> Result<GooseMetrics> {
    let mut attack = GooseAttack::initialize_with_config(GooseConfiguration::default())?;
    for task in plan.tasks() {
        attack = attack.register_scenario(build_scenario(task.clone(), config.pacing)?);
    }

    if config.users < plan.len() {
        tracing::warn!(
            users = config.users,
            scenarios = plan.len(),
            "fewer users than scenarios, some endpoints will not be exercised"
        );
    }

    let hatch_rate = config.hatch_rate.to_string();
    let report_file = config.report_path().to_string_lossy().into_owned();

    let metrics = attack
        .set_default(GooseDefault::Users, config.users)?
        .set_default(GooseDefault::HatchRate, hatch_rate.as_str())?
        .set_default(GooseDefault::RunTime, config.run_time.as_secs() as usize)?
        .set_default(GooseDefault::ReportFile, report_file.as_str())?
        .execute()
        .await?;

    Ok(metrics)
}

/// Pre-open connections to every host before the measured run.
///
/// Returns how many warm-up requests got any response at all.
pub async fn warmup_hosts(hosts: &[&str], per_host: usize) -> Result<usize> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .build()?;

    let mut tasks = JoinSet::new();
    let mut answered = 0;
    for host in hosts {
        for _ in 0..per_host {
            let client = client.clone();
            let url = format!("{host}/");
            tasks.spawn(async move { client.get(&url).send().await.is_ok() });
            if tasks.len() >= WARMUP_CONCURRENCY {
                if let Some(Ok(true)) = tasks.join_next().await {
                    answered += 1;
                }
            }
        }
    }
    while let Some(result) = tasks.join_next().await {
        if let Ok(true) = result {
            answered += 1;
        }
    }
    Ok(answered)
}

// ============================================================================
// Run summary
// ============================================================================

/// JSON summary of a finished run
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub profile: String,
    pub users: usize,
    #[serde(rename = "hatchRate")]
    pub hatch_rate: usize,
    #[serde(rename = "runTime")]
    pub run_time: String,
    pub iteration: u32,
    /// Requests let through by the gates
    #[serde(rename = "requestsFired")]
    pub requests_fired: u64,
    #[serde(rename = "requestCeiling")]
    pub request_ceiling: Option<u64>,
    pub success: usize,
    pub errors: usize,
    #[serde(rename = "durationSecs")]
    pub duration_secs: usize,
    #[serde(rename = "requestLog")]
    pub request_log: Option<PathBuf>,
}

impl RunSummary {
    pub fn new(config: &RunConfig, plan: &LoadPlan, metrics: &GooseMetrics) -> Self {
        let (success, errors) = metrics
            .requests
            .values()
            .fold((0, 0), |(ok, err), agg| (ok + agg.success_count, err + agg.fail_count));
        Self {
            profile: config.profile.name().to_string(),
            users: config.users,
            hatch_rate: config.hatch_rate,
            run_time: config.run_time_label.clone(),
            iteration: config.iteration,
            requests_fired: plan.total_fired(),
            request_ceiling: plan.total_ceiling(),
            success,
            errors,
            duration_secs: metrics.duration,
            request_log: logging::RequestLog::global().map(|log| log.path().to_path_buf()),
        }
    }

    /// Write the summary to `path` and print it on stdout
    pub fn emit(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, &json)?;
        println!("{json}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Profile;

    #[test]
    fn every_planned_task_becomes_a_scenario() {
        let config = RunConfig {
            profile: Profile::Fine,
            ..Default::default()
        };
        let plan = LoadPlan::new(&config);
        for task in plan.tasks() {
            assert!(build_scenario(task.clone(), config.pacing).is_ok());
        }
    }

    #[test]
    fn scenarios_share_the_plan_gates() {
        let config = RunConfig {
            profile: Profile::Fine,
            limit: 1,
            ..Default::default()
        };
        let plan = LoadPlan::new(&config);
        let task = plan.tasks()[0].clone();
        let _scenario = build_scenario(task, config.pacing).unwrap();

        // The scenario holds a handle to the same gate the plan reports on.
        assert!(plan.tasks()[0].gate.try_acquire());
        assert_eq!(plan.total_fired(), 1);
        assert!(plan.tasks()[0].gate.is_exhausted());
    }

    #[test]
    fn summary_serializes_camel_case_fields() {
        let summary = RunSummary {
            profile: "fine".to_string(),
            users: 10,
            hatch_rate: 2,
            run_time: "1m".to_string(),
            iteration: 1,
            requests_fired: 80,
            request_ceiling: Some(80),
            success: 78,
            errors: 2,
            duration_secs: 60,
            request_log: None,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["requestsFired"], 80);
        assert_eq!(value["hatchRate"], 2);
        assert_eq!(value["requestLog"], serde_json::Value::Null);
    }

    #[test]
    fn emit_writes_summary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_summary.json");
        let summary = RunSummary {
            profile: "coarse".to_string(),
            users: 1,
            hatch_rate: 1,
            run_time: "10s".to_string(),
            iteration: 1,
            requests_fired: 3,
            request_ceiling: None,
            success: 3,
            errors: 0,
            duration_secs: 10,
            request_log: None,
        };
        summary.emit(&path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["profile"], "coarse");
        assert_eq!(written["requestCeiling"], serde_json::Value::Null);
    }
}
