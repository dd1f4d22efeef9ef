// src/services/vision_client.rs
//! Boundary to the remote vision model, reached through an OpenAI-compatible
//! proxy. Credentials are supplied by an injected [`CredentialProvider`].

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Credentials are treated as expired this long before their actual expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl VisionError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, VisionError::Auth(_) | VisionError::InvalidImage(_))
    }
}

/// The external vision model: an image plus a prompt in, raw text out.
#[async_trait]
pub trait VisionModelClient: Send + Sync {
    async fn call(&self, image: &[u8], prompt: &str) -> Result<String, VisionError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get(&self) -> Result<Credential, VisionError>;

    fn is_expired(&self, credential: &Credential) -> bool {
        credential
            .expires_at
            .is_some_and(|at| Utc::now() + ChronoDuration::seconds(EXPIRY_SKEW_SECS) >= at)
    }

    /// Drops any cached credential so the next `get` fetches a fresh one.
    async fn invalidate(&self) {}
}

pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            credential: Credential {
                token: token.into(),
                expires_at: None,
            },
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn get(&self) -> Result<Credential, VisionError> {
        Ok(self.credential.clone())
    }
}

/// Where fresh credentials come from.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self) -> Result<Credential, VisionError>;
}

pub struct CachingCredentialProvider<S> {
    source: S,
    cached: Mutex<Option<Credential>>,
}

impl<S: CredentialSource> CachingCredentialProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<S: CredentialSource> CredentialProvider for CachingCredentialProvider<S> {
    async fn get(&self) -> Result<Credential, VisionError> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if !self.is_expired(credential) {
                return Ok(credential.clone());
            }
            debug!("Cached vision credential expired, refreshing");
        }

        let fresh = self.source.fetch().await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[derive(Debug, Deserialize)]
struct KeyResponse {
    key: String,
    expires_in: Option<i64>,
}

/// Fetches short-lived keys from the proxy's key endpoint.
pub struct ProxyCredentialSource {
    client: Client,
    endpoint: String,
}

impl ProxyCredentialSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for ProxyCredentialSource {
    async fn fetch(&self) -> Result<Credential, VisionError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status(status, error_text));
        }

        let body: KeyResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse(format!("Invalid key response: {}", e)))?;

        if body.key.trim().is_empty() {
            return Err(VisionError::Auth("Key endpoint returned an empty key".to_string()));
        }

        Ok(Credential {
            token: body.key,
            expires_at: body
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        })
    }
}

/// OpenAI-compatible chat-completions client with image input.
pub struct ProxyVisionClient {
    client: Client,
    base_url: String,
    model: String,
    credentials: Arc<dyn CredentialProvider>,
    timeout: Option<Duration>,
}

impl ProxyVisionClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            credentials,
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl VisionModelClient for ProxyVisionClient {
    async fn call(&self, image: &[u8], prompt: &str) -> Result<String, VisionError> {
        let credential = self.credentials.get().await?;
        let base64_image = general_purpose::STANDARD.encode(image);

        let mut request = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", credential.token))
            .json(&json!({
                "model": self.model,
                "messages": [{
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": prompt
                        },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:image/jpeg;base64,{}", base64_image),
                                "detail": "high"
                            }
                        }
                    ]
                }],
                "max_tokens": 2000,
                "temperature": 0.3
            }));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let err = map_status(status, error_text);
            if matches!(err, VisionError::Auth(_)) {
                warn!("Vision proxy rejected the credential, invalidating cache");
                self.credentials.invalidate().await;
            }
            return Err(err);
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse(format!("Failed to parse model response: {}", e)))?;

        extract_content(&result)
    }
}

fn extract_content(result: &serde_json::Value) -> Result<String, VisionError> {
    result["choices"][0]["message"]["content"]
        .as_str()
        .filter(|content| !content.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| VisionError::InvalidResponse("No content in model response".to_string()))
}

fn map_transport_error(err: &reqwest::Error) -> VisionError {
    if err.is_timeout() {
        VisionError::Timeout
    } else {
        VisionError::Network(err.to_string())
    }
}

fn map_status(status: StatusCode, body: String) -> VisionError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VisionError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => VisionError::RateLimited,
        StatusCode::PAYMENT_REQUIRED => VisionError::Quota(body),
        StatusCode::BAD_REQUEST if body.to_lowercase().contains("image") => {
            VisionError::InvalidImage(body)
        }
        s if s.is_server_error() => VisionError::Server {
            status: s.as_u16(),
            message: body,
        },
        s => VisionError::InvalidResponse(format!("Unexpected status {}: {}", s, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        ttl_secs: Option<i64>,
    }

    #[async_trait]
    impl CredentialSource for CountingSource {
        async fn fetch(&self) -> Result<Credential, VisionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Credential {
                token: format!("key-{}", n),
                expires_at: self.ttl_secs.map(|s| Utc::now() + ChronoDuration::seconds(s)),
            })
        }
    }

    fn source(ttl_secs: Option<i64>) -> CountingSource {
        CountingSource {
            calls: AtomicUsize::new(0),
            ttl_secs,
        }
    }

    #[tokio::test]
    async fn cached_credential_is_reused_until_expiry() {
        let provider = CachingCredentialProvider::new(source(Some(3600)));
        let first = provider.get().await.unwrap();
        let second = provider.get().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_credential_is_refetched() {
        // inside the refresh skew, so already considered expired
        let provider = CachingCredentialProvider::new(source(Some(10)));
        let first = provider.get().await.unwrap();
        let second = provider.get().await.unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(provider.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let provider = CachingCredentialProvider::new(source(None));
        provider.get().await.unwrap();
        provider.invalidate().await;
        let token = provider.get().await.unwrap().token;
        assert_eq!(token, "key-1");
    }

    #[test]
    fn expiry_check_honours_skew() {
        let provider = StaticCredentialProvider::new("k");
        let never = Credential {
            token: "a".into(),
            expires_at: None,
        };
        let soon = Credential {
            token: "b".into(),
            expires_at: Some(Utc::now() + ChronoDuration::seconds(30)),
        };
        let later = Credential {
            token: "c".into(),
            expires_at: Some(Utc::now() + ChronoDuration::hours(1)),
        };
        assert!(!provider.is_expired(&never));
        assert!(provider.is_expired(&soon));
        assert!(!provider.is_expired(&later));
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, String::new()),
            VisionError::Auth(_)
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            VisionError::RateLimited
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, "Invalid image data".into()),
            VisionError::InvalidImage(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, String::new()),
            VisionError::Server { status: 502, .. }
        ));
    }

    #[test]
    fn retryability_by_kind() {
        assert!(VisionError::Timeout.is_retryable());
        assert!(VisionError::RateLimited.is_retryable());
        assert!(VisionError::Network("reset".into()).is_retryable());
        assert!(!VisionError::Auth("bad key".into()).is_retryable());
        assert!(!VisionError::InvalidImage("corrupt".into()).is_retryable());
    }

    #[test]
    fn content_is_extracted_from_completion() {
        let ok = json!({"choices": [{"message": {"content": "{\"a\": 1}"}}]});
        assert_eq!(extract_content(&ok).unwrap(), "{\"a\": 1}");
        let empty = json!({"choices": []});
        assert!(matches!(
            extract_content(&empty),
            Err(VisionError::InvalidResponse(_))
        ));
    }
}
