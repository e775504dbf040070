use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::Course,
    protocol::{calculate_qpa_route, CalculateQpaRequest, LenientQpaResponse},
    qpa::{self, QpaSummary},
};
use tracing::{debug, warn};

/// A collaborator that computes the QPA somewhere else.
#[async_trait]
pub trait RemoteCalculator: Send + Sync {
    async fn calculate(&self, request: &CalculateQpaRequest) -> Result<QpaSummary>;
}

pub struct HttpCalculator {
    http: Client,
    endpoint: String,
}

impl HttpCalculator {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint_for(base_url),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build calculator http client")?;
        Ok(Self {
            http,
            endpoint: endpoint_for(base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint_for(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), calculate_qpa_route())
}

#[async_trait]
impl RemoteCalculator for HttpCalculator {
    async fn calculate(&self, request: &CalculateQpaRequest) -> Result<QpaSummary> {
        let body: LenientQpaResponse = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .with_context(|| format!("calculator request to {} failed", self.endpoint))?
            .error_for_status()?
            .json()
            .await
            .context("calculator returned a malformed body")?;
        Ok(body.into_summary())
    }
}

/// Derives the displayed totals from the active courses.
///
/// Prefers the remote calculator when one is configured and falls back to
/// [`shared::qpa::calculate`] whenever it fails. Failures never reach the
/// caller.
#[derive(Clone, Default)]
pub struct Aggregator {
    remote: Option<Arc<dyn RemoteCalculator>>,
}

impl Aggregator {
    pub fn new(remote: Arc<dyn RemoteCalculator>) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    pub fn local_only() -> Self {
        Self { remote: None }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub async fn calculate(&self, courses: &[Course]) -> QpaSummary {
        let request = CalculateQpaRequest::from_courses(courses.iter().filter(|c| c.active));
        if request.grades.is_empty() {
            return QpaSummary::zero();
        }

        let Some(remote) = &self.remote else {
            return calculate_locally(&request);
        };

        match remote.calculate(&request).await {
            Ok(summary) => {
                debug!(courses = request.grades.len(), %summary, "remote QPA calculation");
                summary
            }
            Err(error) => {
                warn!(
                    error = %format!("{error:#}"),
                    "remote QPA calculation failed; using local result"
                );
                calculate_locally(&request)
            }
        }
    }
}

pub fn calculate_locally(request: &CalculateQpaRequest) -> QpaSummary {
    qpa::calculate(request.entries()).summary
}

#[cfg(test)]
#[path = "tests/aggregator_tests.rs"]
mod tests;
