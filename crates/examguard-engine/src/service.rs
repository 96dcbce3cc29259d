use crate::config::ServiceConfig;
use async_trait::async_trait;
use examguard_common::error::ServiceError;
use examguard_common::protocol::{
    AnalyzeRequest, DashboardEntry, EvidenceRecord, ProctorSnapshot, ResetScoreAck,
    ResetScoreRequest, TabEvent, TabEventAck,
};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const RESET_SCORE_PATH: &str = "/proctor/reset-score";
pub const ANALYZE_PATH: &str = "/proctor/analyze";
pub const DASHBOARD_PATH: &str = "/proctor/dashboard-data";
pub const EVIDENCE_PATH: &str = "/proctor/evidence-list";
pub const TAB_EVENT_PATH: &str = "/proctor/tab-event";

/// Transport to the detection service.
///
/// Every call may fail. Callers inside the engine go through
/// [`crate::client::DetectionClient`], which absorbs those failures.
#[async_trait]
pub trait ProctorService: Send + Sync {
    /// Zero the server-side accumulated score for a student.
    async fn reset_score(&self, request: ResetScoreRequest) -> Result<ResetScoreAck, ServiceError>;

    /// Analyze one camera frame.
    async fn analyze_frame(&self, request: AnalyzeRequest)
    -> Result<ProctorSnapshot, ServiceError>;

    /// Current risk state of every active student.
    async fn dashboard_data(&self) -> Result<Vec<DashboardEntry>, ServiceError>;

    /// Stored evidence images.
    async fn evidence_list(&self) -> Result<Vec<EvidenceRecord>, ServiceError> {
        Err(ServiceError::NotSupported("evidence_list".into()))
    }

    /// Report a tab/visibility violation.
    async fn tab_event(&self, _event: TabEvent) -> Result<TabEventAck, ServiceError> {
        Err(ServiceError::NotSupported("tab_event".into()))
    }
}

/// [`ProctorService`] over HTTP/JSON.
pub struct HttpProctorService {
    client: Client,
    base_url: String,
}

impl HttpProctorService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        url::Url::parse(base_url)
            .map_err(|e| ServiceError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport {
                endpoint: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        decode(path, response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        decode(path, response).await
    }
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        ServiceError::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ServiceError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(endpoint, e))?;
    serde_json::from_slice(&body).map_err(|e| ServiceError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl ProctorService for HttpProctorService {
    async fn reset_score(&self, request: ResetScoreRequest) -> Result<ResetScoreAck, ServiceError> {
        self.post(RESET_SCORE_PATH, &request).await
    }

    async fn analyze_frame(
        &self,
        request: AnalyzeRequest,
    ) -> Result<ProctorSnapshot, ServiceError> {
        self.post(ANALYZE_PATH, &request).await
    }

    async fn dashboard_data(&self) -> Result<Vec<DashboardEntry>, ServiceError> {
        self.get(DASHBOARD_PATH).await
    }

    async fn evidence_list(&self) -> Result<Vec<EvidenceRecord>, ServiceError> {
        self.get(EVIDENCE_PATH).await
    }

    async fn tab_event(&self, event: TabEvent) -> Result<TabEventAck, ServiceError> {
        self.post(TAB_EVENT_PATH, &event).await
    }
}
