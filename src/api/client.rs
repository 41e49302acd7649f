//! Holes API client over HTTP

use super::types::{AckResponse, DepthUpdate, DrillingSpeedSample, HoleResponse, HolesResponse};
use super::HolesApi;
use crate::config::defaults::API_PING_TIMEOUT_SECS;
use crate::types::Hole;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Remote API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    ServerError(StatusCode),
    #[error("Hole not found")]
    NotFound,
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Client setup error: {0}")]
    Client(String),
}

impl ApiError {
    /// The remote API does not know the hole. Callers treat this as "no match".
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

/// reqwest-backed [`HolesApi`]
#[derive(Clone)]
pub struct HttpHolesClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpHolesClient {
    /// Create a client for `base_url` (which already ends in `/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn holes_url(&self, project_id: i64) -> String {
        format!("{}/projects/{}/holes", self.base_url, project_id)
    }

    fn hole_url(&self, project_id: i64, hole_ref: &str) -> String {
        format!("{}/{}", self.holes_url(project_id), hole_ref)
    }

    /// Whether the server answers at all.
    ///
    /// 403 and 404 on the bare base URL still mean the server is up.
    pub async fn ping(&self) -> bool {
        let result = self
            .http
            .get(&self.base_url)
            .timeout(Duration::from_secs(API_PING_TIMEOUT_SECS))
            .send()
            .await;

        match result {
            Ok(resp) => matches!(
                resp.status(),
                StatusCode::OK | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            ),
            Err(e) => {
                debug!(url = %self.base_url, error = %e, "Holes API unreachable");
                false
            }
        }
    }

    async fn expect_ack(resp: reqwest::Response) -> Result<(), ApiError> {
        match resp.status() {
            StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
            status if !status.is_success() => return Err(ApiError::ServerError(status)),
            _ => {}
        }

        let body = resp.bytes().await?;
        Self::check_ack(&body)
    }

    fn check_ack(body: &[u8]) -> Result<(), ApiError> {
        match serde_json::from_slice::<AckResponse>(body) {
            Ok(ack) if ack.success => Ok(()),
            Ok(ack) => Err(ApiError::Rejected(
                ack.message.unwrap_or_else(|| "success=false".to_string()),
            )),
            Err(_) => Err(ApiError::Rejected("no acknowledgement in response".to_string())),
        }
    }
}

#[async_trait]
impl HolesApi for HttpHolesClient {
    async fn list_holes(&self, project_id: i64) -> Result<Vec<Hole>, ApiError> {
        let resp = self.http.get(self.holes_url(project_id)).send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::ServerError(resp.status()));
        }

        let body = resp.bytes().await?;
        let parsed: HolesResponse = serde_json::from_slice(&body)?;
        if !parsed.success {
            return Err(ApiError::Rejected(
                parsed.message.unwrap_or_else(|| "success=false".to_string()),
            ));
        }

        Ok(parsed
            .holes
            .into_iter()
            .filter_map(|h| h.into_hole())
            .collect())
    }

    async fn get_hole(&self, project_id: i64, hole_ref: &str) -> Result<Hole, ApiError> {
        let resp = self
            .http
            .get(self.hole_url(project_id, hole_ref))
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
            status if !status.is_success() => return Err(ApiError::ServerError(status)),
            _ => {}
        }

        let body = resp.bytes().await?;
        let parsed: HoleResponse = serde_json::from_slice(&body)?;
        match parsed.hole {
            Some(remote) if parsed.success => remote.into_hole().ok_or(ApiError::NotFound),
            _ => Err(ApiError::NotFound),
        }
    }

    async fn update_hole_depth(
        &self,
        project_id: i64,
        remote_id: i64,
        depth_m: f64,
    ) -> Result<(), ApiError> {
        let resp = self
            .http
            .put(self.hole_url(project_id, &remote_id.to_string()))
            .json(&DepthUpdate { depth: depth_m })
            .send()
            .await?;
        Self::expect_ack(resp).await
    }

    async fn post_drilling_speed(
        &self,
        project_id: i64,
        remote_id: i64,
        sample: &DrillingSpeedSample,
    ) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(format!(
                "{}/drilling-speed",
                self.hole_url(project_id, &remote_id.to_string())
            ))
            .json(sample)
            .send()
            .await?;
        Self::expect_ack(resp).await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = HttpHolesClient::new("http://localhost:3000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api");
        assert_eq!(client.holes_url(3), "http://localhost:3000/api/projects/3/holes");
        assert_eq!(
            client.hole_url(3, "LK1"),
            "http://localhost:3000/api/projects/3/holes/LK1"
        );
    }

    #[test]
    fn test_not_found_is_distinct() {
        assert!(ApiError::NotFound.is_not_found());
        assert!(!ApiError::ServerError(StatusCode::BAD_GATEWAY).is_not_found());
    }

    #[test]
    fn test_ack_needs_explicit_success() {
        assert!(HttpHolesClient::check_ack(br#"{"success": true}"#).is_ok());
        assert!(matches!(
            HttpHolesClient::check_ack(br#"{"success": false, "message": "locked"}"#),
            Err(ApiError::Rejected(msg)) if msg == "locked"
        ));
        assert!(matches!(
            HttpHolesClient::check_ack(b"{}"),
            Err(ApiError::Rejected(_))
        ));
        assert!(matches!(HttpHolesClient::check_ack(b""), Err(ApiError::Rejected(_))));
    }
}
