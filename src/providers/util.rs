use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Re-sends a request while the server answers `429 Too Many Requests`.
///
/// # Parameters
/// - `operation`: Closure returning the request future
/// - `retries`: Number of extra attempts after a 429 (total runs = 1 initial + retries)
/// - `base_delay`: Wait before the first retry, doubled on every further one
///
/// # Returns
/// The first non-429 response, the last 429 once retries are spent, or the
/// transport error of any attempt
pub async fn with_rate_limit_backoff<F, Fut>(
    mut operation: F,
    retries: usize,
    base_delay: Duration,
) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let response = operation().await?;
        if response.status() != StatusCode::TOO_MANY_REQUESTS || attempt >= retries {
            return Ok(response);
        }
        let delay = base_delay.saturating_mul(2u32.saturating_pow(attempt as u32));
        attempt += 1;
        debug!(
            "Rate limited, attempt {}/{}. Backing off for {:?}...",
            attempt, retries, delay
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_retries_until_not_rate_limited() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rates"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rates"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/rates", mock_server.uri());
        let client = reqwest::Client::new();
        let response =
            with_rate_limit_backoff(|| client.get(&url).send(), 2, Duration::from_millis(1))
                .await
                .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&mock_server)
            .await;

        let url = format!("{}/rates", mock_server.uri());
        let client = reqwest::Client::new();
        let response =
            with_rate_limit_backoff(|| client.get(&url).send(), 1, Duration::from_millis(1))
                .await
                .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/rates", mock_server.uri());
        let client = reqwest::Client::new();
        let response =
            with_rate_limit_backoff(|| client.get(&url).send(), 3, Duration::from_millis(1))
                .await
                .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
