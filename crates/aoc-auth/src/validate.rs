//! Session validation against the platform

use std::future::Future;
use std::pin::Pin;

use aoc_client::RetryingClient;
use common::Secret;
use tracing::debug;

use crate::error::Result;

/// Decides whether a session token is accepted.
pub trait Validator: Send + Sync {
    fn is_valid<'a>(
        &'a self,
        token: &'a Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}

/// One-shot probe: fetch a session-only page and accept any status below 300.
///
/// No retries. Transport failures surface as `Error::Http` rather than
/// being mistaken for an invalid session.
pub struct HttpValidator {
    client: RetryingClient,
    probe_path: String,
}

impl HttpValidator {
    pub fn new(client: RetryingClient, probe_path: impl Into<String>) -> Self {
        Self {
            client,
            probe_path: probe_path.into(),
        }
    }

    pub async fn check(&self, token: &Secret<String>) -> Result<bool> {
        let status = self.client.probe(&self.probe_path, token).await?;
        debug!(status, path = %self.probe_path, "session probe");
        Ok(status < 300)
    }
}

impl Validator for HttpValidator {
    fn is_valid<'a>(
        &'a self,
        token: &'a Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(self.check(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use aoc_client::BackoffPolicy;
    use axum::http::{HeaderMap, StatusCode};
    use tokio::net::TcpListener;

    /// Accepts only `session=good`, redirecting everyone else like a login wall.
    async fn start_platform() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let app = axum::Router::new().fallback(|headers: HeaderMap| async move {
                match headers.get("cookie").and_then(|v| v.to_str().ok()) {
                    Some("session=good") => (StatusCode::OK, "1\n2\n3\n"),
                    Some(_) => (StatusCode::FOUND, ""),
                    None => (StatusCode::BAD_REQUEST, "Please log in"),
                }
            });
            axum::serve(listener, app).await.unwrap();
        });
        url
    }

    fn validator(url: &str) -> HttpValidator {
        let client = RetryingClient::new(url, BackoffPolicy::default()).unwrap();
        HttpValidator::new(client, crate::DEFAULT_PROBE_PATH)
    }

    #[tokio::test]
    async fn accepted_session_is_valid() {
        let url = start_platform().await;
        let token = Secret::new("good".to_string());
        assert!(validator(&url).is_valid(&token).await.unwrap());
    }

    #[tokio::test]
    async fn redirect_means_invalid() {
        let url = start_platform().await;
        let token = Secret::new("expired".to_string());
        assert!(!validator(&url).is_valid(&token).await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_platform_is_an_error() {
        let token = Secret::new("good".to_string());
        let result = validator("http://127.0.0.1:1").is_valid(&token).await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
