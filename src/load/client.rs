use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

use crate::domain::UserName;
use crate::error::{Error, Result};

pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// `<base>/api/timeline`, keeping any path prefix the base URL carries.
pub fn timeline_url(base: &Url) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::InvalidArgument(format!("{} cannot be used as a base URL", base)))?
        .pop_if_empty()
        .extend(["api", "timeline"]);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[derive(Debug, Clone, Copy)]
pub struct RequestOutcome {
    pub latency: Duration,
    pub ok: bool,
}

/// One `GET /api/timeline?user=..&limit=..`. The body is read in full so the
/// latency covers the whole response. Never returns an error: transport
/// failures and non-2xx statuses come back as `ok == false`.
pub async fn fetch_timeline(
    client: &Client,
    endpoint: &Url,
    user: &UserName,
    limit: u32,
) -> RequestOutcome {
    let limit = limit.to_string();
    let start = Instant::now();

    let ok = match client
        .get(endpoint.clone())
        .query(&[("user", user.as_str()), ("limit", limit.as_str())])
        .send()
        .await
    {
        Ok(resp) => {
            let status = resp.status();
            match resp.bytes().await {
                Ok(_) if status.is_success() => true,
                Ok(_) => {
                    debug!("Timeline for {} returned {}", user, status);
                    false
                }
                Err(e) => {
                    debug!("Reading timeline body for {} failed: {}", user, e);
                    false
                }
            }
        }
        Err(e) => {
            debug!("Timeline request for {} failed: {}", user, e);
            false
        }
    };

    RequestOutcome {
        latency: start.elapsed(),
        ok,
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Latencies of the successful requests only.
    pub latencies_ms: Vec<f64>,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn requests(&self) -> usize {
        self.latencies_ms.len() + self.failed
    }

    pub fn any_failed(&self) -> bool {
        self.failed > 0
    }

    /// Mean latency over the successful requests; NaN if there were none.
    pub fn avg_ms(&self) -> f64 {
        if self.latencies_ms.is_empty() {
            return f64::NAN;
        }
        self.latencies_ms.iter().sum::<f64>() / self.latencies_ms.len() as f64
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.requests() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Fire one request per user simultaneously and wait for all of them.
pub async fn run_batch(
    client: &Client,
    endpoint: &Url,
    users: &[UserName],
    limit: u32,
) -> BatchOutcome {
    let start = Instant::now();
    let mut set = JoinSet::new();

    for user in users {
        let client = client.clone();
        let endpoint = endpoint.clone();
        let user = user.clone();
        set.spawn(async move { fetch_timeline(&client, &endpoint, &user, limit).await });
    }

    let mut outcome = BatchOutcome::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) if result.ok => outcome
                .latencies_ms
                .push(result.latency.as_secs_f64() * 1000.0),
            Ok(_) => outcome.failed += 1,
            Err(e) => {
                warn!("Request task did not complete: {}", e);
                outcome.failed += 1;
            }
        }
    }
    outcome.elapsed = start.elapsed();
    outcome
}
