//! HTTP API client for the simulation server.
//!
//! Eight JSON endpoints; see the server contract. Transport and non-2xx
//! failures surface as [`ClientError`] — the polling layer decides what is
//! fatal (nothing is: a failed poll is retried on the next tick).

use crate::history::StepRecord;
use crate::policy::EnactedPolicy;
use crate::sync::SimulationStatus;
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server url: {0}")]
    Url(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: SimulationStatus,
}

#[derive(Debug, Deserialize)]
struct StepResponse {
    #[serde(deserialize_with = "step_count")]
    step: u64,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<StepRecord>,
}

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    config: Value,
}

#[derive(Debug, Deserialize)]
struct PoliciesResponse {
    #[serde(default)]
    policies: Vec<EnactedPolicy>,
}

#[derive(serde::Serialize)]
struct StepRequest {
    steps: u32,
}

#[derive(serde::Serialize)]
struct EnactRequest<'a> {
    name: &'a str,
    args: &'a [f64],
}

/// The reference server reports the step counter as a bare string (it hands
/// the storage value through verbatim); accept both shapes.
fn step_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<u64>().map_err(serde::de::Error::custom),
    }
}

/// Typed wrapper over the server's HTTP interface.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base).map_err(|e| ClientError::Url(e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Url(e.to_string()))
    }

    /// GET /status — current simulation phase.
    pub async fn status(&self) -> Result<SimulationStatus, ClientError> {
        let resp: StatusResponse = self
            .http
            .get(self.url("/status")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.status)
    }

    /// GET /state/step — latest step count known to the server.
    pub async fn current_step(&self) -> Result<u64, ClientError> {
        let resp: StepResponse = self
            .http
            .get(self.url("/state/step")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.step)
    }

    /// GET /state/history?from&to — step records in the inclusive range.
    pub async fn history(&self, from: u64, to: u64) -> Result<Vec<StepRecord>, ClientError> {
        let resp: HistoryResponse = self
            .http
            .get(self.url("/state/history")?)
            .query(&[("from", from), ("to", to)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.history)
    }

    /// GET /config — the current configuration tree.
    pub async fn config(&self) -> Result<Value, ClientError> {
        let resp: ConfigResponse = self
            .http
            .get(self.url("/config")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.config)
    }

    /// GET /policies — previously enacted policies.
    pub async fn policies(&self) -> Result<Vec<EnactedPolicy>, ClientError> {
        let resp: PoliciesResponse = self
            .http
            .get(self.url("/policies")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.policies)
    }

    /// POST /policies — enact one policy instance.
    pub async fn enact(&self, name: &str, args: &[f64]) -> Result<(), ClientError> {
        self.http
            .post(self.url("/policies")?)
            .json(&EnactRequest { name, args })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// POST /step — advance the simulation by N steps.
    pub async fn run_steps(&self, steps: u32) -> Result<(), ClientError> {
        self.http
            .post(self.url("/step")?)
            .json(&StepRequest { steps })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// POST /reset — reset the simulation with the given full config.
    pub async fn reset(&self, config: &Value) -> Result<(), ClientError> {
        self.http
            .post(self.url("/reset")?)
            .json(config)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
