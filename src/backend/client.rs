//! BasePulse REST API Client
//!
//! HTTP client for the backend's analytics, participant, feedback,
//! SideShift and gas endpoints.

use crate::backend::dto::{
    AnalyticsStats, Envelope, ErrorBody, FeedbackReceipt, FeedbackRequest, GasPrice,
    LeaderboardEntry, LeaderboardResponse, PairsResponse, ParticipantPoints, Quest, QuestClaim,
    QuestsResponse, SideShiftPair, SideShiftQuote, SideShiftQuoteRequest,
};
use crate::backend::{BackendError, StatsBackend};
use crate::config::BackendConfig;
use crate::models::GlobalStats;
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Wait used for a 429 without a usable `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Longest `Retry-After` honoured
const MAX_RETRY_AFTER_SECS: u64 = 30;

/// BasePulse REST API client
pub struct BackendClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl BackendClient {
    /// Create a new client with the given configuration
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an `/api/...` path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ----- analytics -----

    pub async fn analytics_stats(&self) -> Result<GlobalStats, BackendError> {
        let raw: AnalyticsStats = self.get("/api/analytics/stats").await?;
        GlobalStats::try_from(raw)
    }

    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, BackendError> {
        let response: LeaderboardResponse = self
            .get(&format!("/api/analytics/leaderboard?limit={}", limit))
            .await?;
        Ok(response.leaderboard)
    }

    // ----- participant -----

    pub async fn participant_points(&self, address: &str) -> Result<ParticipantPoints, BackendError> {
        self.get(&format!(
            "/api/participant/{}/points",
            urlencoding::encode(&address.to_lowercase())
        ))
        .await
    }

    pub async fn participant_quests(&self, address: &str) -> Result<Vec<Quest>, BackendError> {
        let response: QuestsResponse = self
            .get(&format!(
                "/api/participant/{}/quests",
                urlencoding::encode(&address.to_lowercase())
            ))
            .await?;
        Ok(response.quests)
    }

    pub async fn claim_quest(&self, address: &str, quest_id: &str) -> Result<QuestClaim, BackendError> {
        self.post(
            &format!(
                "/api/participant/{}/quests/{}/claim",
                urlencoding::encode(&address.to_lowercase()),
                urlencoding::encode(quest_id)
            ),
            &serde_json::json!({}),
        )
        .await
    }

    // ----- feedback -----

    pub async fn submit_feedback(&self, feedback: &FeedbackRequest) -> Result<FeedbackReceipt, BackendError> {
        if feedback.message.trim().is_empty() {
            return Err(BackendError::Validation("feedback message is empty".to_string()));
        }
        if let Some(rating) = feedback.rating {
            if !(1..=5).contains(&rating) {
                return Err(BackendError::Validation(format!(
                    "rating must be between 1 and 5, got {}",
                    rating
                )));
            }
        }
        self.post("/api/feedback", feedback).await
    }

    // ----- sideshift -----

    pub async fn sideshift_pairs(&self) -> Result<Vec<SideShiftPair>, BackendError> {
        let response: PairsResponse = self.get("/api/sideshift/pairs").await?;
        Ok(response.pairs)
    }

    pub async fn sideshift_quote(&self, request: &SideShiftQuoteRequest) -> Result<SideShiftQuote, BackendError> {
        self.post("/api/sideshift/quote", request).await
    }

    // ----- gas -----

    pub async fn gas_price(&self) -> Result<GasPrice, BackendError> {
        self.get("/api/gas/price").await
    }

    // ----- transport -----

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        self.send(Method::POST, path, Some(body)).await
    }

    /// Send with retry on connection failures, timeouts and 429s.
    /// Non-idempotent methods are only resent when the connection was
    /// never established.
    async fn send<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut last_error = BackendError::Unavailable;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Backoff: 1s, 4s, 9s...
                let delay = Duration::from_secs((attempt as u64).pow(2));
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .request(method.clone(), &url)
                .header("X-Request-Id", &request_id);
            if let Some(body) = body {
                request = request.json(body);
            }

            tracing::debug!(%method, url = %url, request_id = %request_id, attempt, "Backend request");

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let envelope: Envelope<T> = response
                            .json()
                            .await
                            .map_err(|e| BackendError::Decode(e.to_string()))?;
                        return Ok(envelope.into_inner());
                    } else if status.as_u16() == 429 {
                        last_error = BackendError::RateLimited;
                        if attempt + 1 < self.max_retries {
                            let wait = retry_after(response.headers().get("Retry-After"));
                            tracing::debug!(url = %url, wait_secs = wait.as_secs(), "Rate limited");
                            tokio::time::sleep(wait).await;
                        }
                        continue;
                    } else {
                        let text = response.text().await.unwrap_or_default();
                        let message = serde_json::from_str::<ErrorBody>(&text)
                            .map(|b| b.error)
                            .unwrap_or(text);
                        return Err(BackendError::Api {
                            status: status.as_u16(),
                            message,
                        });
                    }
                }
                Err(e) => {
                    let connect_failed = e.is_connect();
                    last_error = if e.is_timeout() {
                        BackendError::Timeout
                    } else if connect_failed {
                        BackendError::Unavailable
                    } else {
                        BackendError::Request(e)
                    };
                    if !may_resend(&method, connect_failed) {
                        break;
                    }
                }
            }
        }

        tracing::warn!(url = %url, request_id = %request_id, error = %last_error, "Backend request failed");
        Err(last_error)
    }
}

/// Whether a failed send may be repeated
fn may_resend(method: &Method, connect_failed: bool) -> bool {
    connect_failed || method.is_idempotent()
}

/// Wait before retrying a 429, capped at [`MAX_RETRY_AFTER_SECS`]
fn retry_after(value: Option<&HeaderValue>) -> Duration {
    let secs = match value.map(|v| v.to_str().map(|s| s.trim().parse::<u64>())) {
        None => DEFAULT_RETRY_AFTER_SECS,
        Some(Ok(Ok(secs))) => secs,
        Some(_) => {
            tracing::warn!(value = ?value, "Unusable Retry-After header");
            DEFAULT_RETRY_AFTER_SECS
        }
    };
    Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS))
}

#[async_trait]
impl StatsBackend for BackendClient {
    async fn global_stats(&self) -> Result<GlobalStats, BackendError> {
        self.analytics_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_base_url_normalized() {
        let config = BackendConfig {
            base_url: "http://localhost:3001/".to_string(),
            ..BackendConfig::default()
        };
        let client = BackendClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert_eq!(
            client.url("/api/analytics/stats"),
            "http://localhost:3001/api/analytics/stats"
        );
    }

    #[tokio::test]
    async fn test_feedback_validation_happens_before_network() {
        // nothing listens on this port; validation must fail first
        let config = BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 1,
            ..BackendConfig::default()
        };
        let client = BackendClient::new(&config).unwrap();

        let empty = FeedbackRequest {
            address: None,
            category: "bug".to_string(),
            message: "   ".to_string(),
            rating: None,
        };
        assert!(matches!(
            client.submit_feedback(&empty).await,
            Err(BackendError::Validation(_))
        ));

        let bad_rating = FeedbackRequest {
            message: "love it".to_string(),
            rating: Some(9),
            ..empty
        };
        assert!(matches!(
            client.submit_feedback(&bad_rating).await,
            Err(BackendError::Validation(_))
        ));
    }

    #[test]
    fn test_only_idempotent_requests_resend_after_reaching_server() {
        assert!(may_resend(&Method::GET, false));
        assert!(may_resend(&Method::GET, true));
        assert!(may_resend(&Method::POST, true));
        assert!(!may_resend(&Method::POST, false));
    }

    #[test]
    fn test_retry_after_is_bounded() {
        let header = |v: &str| HeaderValue::from_str(v).unwrap();

        assert_eq!(retry_after(None), Duration::from_secs(5));
        assert_eq!(retry_after(Some(&header("2"))), Duration::from_secs(2));
        assert_eq!(retry_after(Some(&header("86400"))), Duration::from_secs(30));
        assert_eq!(retry_after(Some(&header("soon"))), Duration::from_secs(5));
        assert_eq!(
            retry_after(Some(&HeaderValue::from_bytes(b"\xff").unwrap())),
            Duration::from_secs(5)
        );
    }

    /// Accepts connections and never answers; counts them
    async fn silent_server() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });
        (url, accepted)
    }

    fn impatient_client(base_url: String) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url,
            request_timeout_secs: 1,
            max_retries: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_post_is_not_resent_after_timeout() {
        let (url, accepted) = silent_server().await;
        let client = impatient_client(url);

        let feedback = FeedbackRequest {
            address: None,
            category: "bug".to_string(),
            message: "love it".to_string(),
            rating: Some(5),
        };
        assert!(matches!(
            client.submit_feedback(&feedback).await,
            Err(BackendError::Timeout)
        ));
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_is_resent_after_timeout() {
        let (url, accepted) = silent_server().await;
        let client = impatient_client(url);

        assert!(matches!(client.gas_price().await, Err(BackendError::Timeout)));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }
}
