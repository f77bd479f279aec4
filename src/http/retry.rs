//! Retry classification for registry requests.

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of attempts for a network operation.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Errors that will not go away by asking again.
#[derive(Debug, Error)]
pub enum NonRetryableError {
    /// HTTP 429
    #[error("Rate limit exceeded: {0}. Try again later.")]
    RateLimitExceeded(String),
    /// HTTP 404
    #[error("Not found: {0}")]
    NotFound(String),
    /// HTTP 401/403
    #[error("Access forbidden: {0}")]
    Forbidden(String),
    /// Other 4xx
    #[error("Request error: {0}")]
    ClientError(String),
}

/// Classifies an HTTP error. `Ok(())` means the request may be retried.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    let Some(status) = error.status() else {
        // Connection errors, timeouts, etc.
        return Ok(());
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(NonRetryableError::RateLimitExceeded(
            "the package index is throttling requests".to_string(),
        )),
        StatusCode::NOT_FOUND => Err(NonRetryableError::NotFound(
            "the search endpoint does not exist".to_string(),
        )),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(NonRetryableError::Forbidden(
            "the package index refused the request".to_string(),
        )),
        s if s.is_client_error() => Err(NonRetryableError::ClientError(format!(
            "HTTP {} error",
            s.as_u16()
        ))),
        _ => Ok(()),
    }
}

/// Converts an error from `error_for_status()`, replacing it with a
/// [`NonRetryableError`] when retrying is pointless.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_error(status: usize) -> reqwest::Error {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(status)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let response = client.get(server.url()).send().await.unwrap();
        response.error_for_status().unwrap_err()
    }

    #[test]
    fn test_non_retryable_error_display() {
        let err = NonRetryableError::RateLimitExceeded("test".to_string());
        assert!(err.to_string().contains("Rate limit"));

        let err = NonRetryableError::NotFound("test".to_string());
        assert!(err.to_string().contains("Not found"));

        let err = NonRetryableError::ClientError("HTTP 400 error".to_string());
        assert!(err.to_string().contains("HTTP 400"));
    }

    #[tokio::test]
    async fn test_classify_error_too_many_requests() {
        let err = status_error(429).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::RateLimitExceeded(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_not_found() {
        let err = status_error(404).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_forbidden() {
        let err = status_error(403).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_other_client_error() {
        let err = status_error(400).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::ClientError(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_server_error_is_retryable() {
        let err = status_error(502).await;
        assert!(classify_error(&err).is_ok());
    }

    #[tokio::test]
    async fn test_check_retryable() {
        let err = check_retryable(status_error(404).await);
        assert!(err.downcast_ref::<NonRetryableError>().is_some());

        let err = check_retryable(status_error(503).await);
        assert!(err.downcast_ref::<NonRetryableError>().is_none());
    }
}
