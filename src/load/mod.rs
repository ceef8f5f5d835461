//! Load generation against the deployed timeline endpoint.

mod client;

pub use client::{build_client, fetch_timeline, run_batch, timeline_url, BatchOutcome, RequestOutcome};

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::{usernames, Sample, Scenario};
use crate::error::{Error, Result};
use crate::record::CsvRecorder;

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub scenario: Scenario,
    pub base_url: Url,
    pub user_prefix: String,
    pub params: Vec<u32>,
    pub runs: u32,
    /// Concurrency used by the scenarios whose PARAM is a data shape.
    pub fixed_concurrency: u32,
    /// Number of seeded users; no batch may need more distinct users.
    pub max_users: u32,
    pub limit: u32,
    pub warmup_rounds: u32,
    pub timeout: Option<Duration>,
}

impl BenchConfig {
    pub fn concurrency_for(&self, param: u32) -> u32 {
        self.scenario.concurrency_for(param, self.fixed_concurrency)
    }

    pub fn validate(&self) -> Result<()> {
        if self.params.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one parameter value is required".to_string(),
            ));
        }
        if self.runs == 0 {
            return Err(Error::InvalidArgument("--runs must be at least 1".to_string()));
        }

        let concurrencies = self.params.iter().map(|&p| self.concurrency_for(p));
        if concurrencies.clone().any(|c| c == 0) {
            return Err(Error::InvalidArgument(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if let Some(max) = concurrencies.max() {
            if max > self.max_users {
                return Err(Error::InvalidArgument(format!(
                    "Max concurrency {} is larger than max-users={}",
                    max, self.max_users
                )));
            }
        }
        Ok(())
    }
}

/// Measure every PARAM `runs` times, appending each run to `recorder` as
/// soon as it completes. Each PARAM is preceded by `warmup_rounds` discarded
/// batches.
pub async fn run_scenario(
    client: &Client,
    config: &BenchConfig,
    recorder: &mut CsvRecorder,
) -> Result<Vec<Sample>> {
    config.validate()?;
    let endpoint = timeline_url(&config.base_url)?;
    info!(
        "Running {} benchmark against {} (params={:?}, runs={}), writing {}",
        config.scenario,
        endpoint,
        config.params,
        config.runs,
        recorder.path().display()
    );

    let mut samples = Vec::with_capacity(config.params.len() * config.runs as usize);

    for &param in &config.params {
        let concurrency = config.concurrency_for(param);
        let users = usernames(&config.user_prefix, concurrency as usize);

        for round in 1..=config.warmup_rounds {
            let warmup = run_batch(client, &endpoint, &users, config.limit).await;
            debug!(
                "Warm-up {}/{} for PARAM={}: avg={:.2} ms, failed={}",
                round,
                config.warmup_rounds,
                param,
                warmup.avg_ms(),
                warmup.failed
            );
        }

        for run in 1..=config.runs {
            info!(
                "[{}] PARAM={}, run={}, concurrency={}",
                config.scenario, param, run, concurrency
            );
            let outcome = run_batch(client, &endpoint, &users, config.limit).await;

            let sample = Sample {
                param,
                avg_time_ms: outcome.avg_ms(),
                run,
                failed: outcome.any_failed(),
            };

            if sample.failed {
                warn!(
                    "  -> avg={:.2} ms over {} successful requests, failed={}/{}",
                    sample.avg_time_ms,
                    outcome.latencies_ms.len(),
                    outcome.failed,
                    outcome.requests()
                );
            } else {
                info!(
                    "  -> avg={:.2} ms, failed=0, batch={:?} ({:.1} req/s)",
                    sample.avg_time_ms,
                    outcome.elapsed,
                    outcome.throughput()
                );
            }

            recorder.append(&sample)?;
            samples.push(sample);
        }
    }

    Ok(samples)
}
