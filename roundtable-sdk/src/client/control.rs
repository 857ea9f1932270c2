//! Run control and history client.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::{
    HistoryEntry, HubStatsResponse, RunStatus, ScenarioInfo, SimulationRequest,
    SimulationResponse, StoredTranscript,
};

/// Typed HTTP client for the control surface of the server.
#[derive(Debug, Clone)]
pub struct ControlClient {
    http: Client,
    base_url: Url,
}

impl ControlClient {
    /// Create a new `ControlClient` for the server rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/scenarios`
    pub async fn list_scenarios(&self) -> Result<Vec<ScenarioInfo>, ClientError> {
        let url = self.base_url.join("/api/scenarios")?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `POST /api/simulation/start` – a rejected start is still `Ok` with
    /// `success == false`.
    pub async fn start(&self, scenario_id: impl Into<String>) -> Result<SimulationResponse, ClientError> {
        let url = self.base_url.join("/api/simulation/start")?;
        let body = SimulationRequest {
            scenario_id: scenario_id.into(),
        };
        parse_response(self.http.post(url).json(&body).send().await?).await
    }

    /// `POST /api/simulation/stop`
    pub async fn stop(&self) -> Result<SimulationResponse, ClientError> {
        let url = self.base_url.join("/api/simulation/stop")?;
        parse_response(self.http.post(url).send().await?).await
    }

    /// `GET /api/simulation/status`
    pub async fn status(&self) -> Result<RunStatus, ClientError> {
        let url = self.base_url.join("/api/simulation/status")?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /api/history`
    pub async fn list_history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        let url = self.base_url.join("/api/history")?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /api/history/{id}`
    pub async fn get_history(&self, id: &str) -> Result<StoredTranscript, ClientError> {
        let url = self.base_url.join(&format!("/api/history/{id}"))?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /api/stats`
    pub async fn stats(&self) -> Result<HubStatsResponse, ClientError> {
        let url = self.base_url.join("/api/stats")?;
        parse_response(self.http.get(url).send().await?).await
    }
}
