use crate::error::{Result, ScanError};
use crate::outcome::FetchOutcome;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// Sent when the caller does not supply an identity. Plenty of sites refuse
/// requests that look like bots, so this mimics desktop Chrome.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Single-attempt page fetcher.
///
/// Holds one pooled `reqwest::Client` configured with the caller's timeout and
/// User-Agent, so it can be shared by every worker of a crawl.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(timeout: Duration, identity: Option<&str>) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ScanError::InvalidTimeout(
                "timeout must be greater than zero".to_string(),
            ));
        }

        let user_agent = match identity.map(str::trim) {
            Some(ua) if !ua.is_empty() => ua.to_string(),
            _ => DEFAULT_USER_AGENT.to_string(),
        };
        let user_agent = match reqwest::header::HeaderValue::from_str(&user_agent) {
            Ok(value) => value,
            Err(_) => return Err(ScanError::InvalidUserAgent(user_agent)),
        };

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Issue one GET for `url` and classify the result. Never retries.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        debug!("Fetching {}", url);
        let start = Instant::now();

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return self.network_error(url, e),
        };

        let status = response.status();
        if !status.is_success() {
            debug!("{} answered {} in {:?}", url, status, start.elapsed());
            return FetchOutcome::HttpError {
                status_code: status.as_u16(),
            };
        }

        match response.text().await {
            Ok(html) => {
                debug!(
                    "{} answered {} ({} bytes) in {:?}",
                    url,
                    status,
                    html.len(),
                    start.elapsed()
                );
                FetchOutcome::Success { html }
            }
            Err(e) => self.network_error(url, e),
        }
    }

    fn network_error(&self, url: &str, e: reqwest::Error) -> FetchOutcome {
        let message = if e.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs_f64())
        } else {
            describe_error(&e)
        };
        debug!("Fetch of {} failed: {}", url, message);
        FetchOutcome::NetworkError { message }
    }
}

/// Flatten an error and its sources into one line, e.g.
/// `error sending request: tcp connect error: Connection refused`.
fn describe_error(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    fn html_response(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(body.to_string())
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .respond_with(html_response("<html><body><p>Hello</p></body></html>"))
            .mount(&mock_server)
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5), None).unwrap();
        let outcome = fetcher.fetch(&format!("{}/post", mock_server.uri())).await;

        assert_eq!(
            outcome,
            FetchOutcome::Success {
                html: "<html><body><p>Hello</p></body></html>".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_is_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5), None).unwrap();

        let missing = fetcher.fetch(&format!("{}/missing", mock_server.uri())).await;
        assert_eq!(missing, FetchOutcome::HttpError { status_code: 404 });

        let broken = fetcher.fetch(&format!("{}/broken", mock_server.uri())).await;
        assert_eq!(broken, FetchOutcome::HttpError { status_code: 503 });
    }

    #[tokio::test]
    async fn test_fetch_sends_identity_header() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "InlinkerTest/1.0"))
            .respond_with(html_response("<p>ok</p>"))
            .mount(&mock_server)
            .await;

        let fetcher =
            PageFetcher::new(Duration::from_secs(5), Some("InlinkerTest/1.0")).unwrap();
        let outcome = fetcher.fetch(&mock_server.uri()).await;

        assert!(
            matches!(outcome, FetchOutcome::Success { .. }),
            "identity header not sent: {:?}",
            outcome
        );
    }

    // The default agent contains a comma, which wiremock's header matcher
    // splits on, so compare the raw header the server saw.
    #[tokio::test]
    async fn test_fetch_defaults_identity_to_browser() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html_response("<p>ok</p>"))
            .mount(&mock_server)
            .await;

        for identity in [None, Some("   ")] {
            let fetcher = PageFetcher::new(Duration::from_secs(5), identity).unwrap();
            let outcome = fetcher.fetch(&mock_server.uri()).await;
            assert!(matches!(outcome, FetchOutcome::Success { .. }));
        }

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            let sent = request
                .headers
                .get("user-agent")
                .and_then(|value| value.to_str().ok());
            assert_eq!(sent, Some(DEFAULT_USER_AGENT));
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_network_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html_response("<p>slow</p>").set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let fetcher = PageFetcher::new(Duration::from_millis(200), None).unwrap();
        let start = Instant::now();
        let outcome = fetcher.fetch(&mock_server.uri()).await;

        match outcome {
            FetchOutcome::NetworkError { message } => {
                assert!(message.contains("timed out"), "unexpected message: {}", message)
            }
            other => panic!("expected a network error, got {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_network_error() {
        let fetcher = PageFetcher::new(Duration::from_secs(2), None).unwrap();
        let outcome = fetcher.fetch("http://127.0.0.1:1/").await;
        assert!(matches!(outcome, FetchOutcome::NetworkError { .. }));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_is_network_error() {
        let fetcher = PageFetcher::new(Duration::from_secs(2), None).unwrap();
        let outcome = fetcher.fetch("not a url").await;
        assert!(matches!(outcome, FetchOutcome::NetworkError { .. }));
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(html_response("<p>moved</p>"))
            .mount(&mock_server)
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5), None).unwrap();
        let outcome = fetcher.fetch(&format!("{}/old", mock_server.uri())).await;
        assert_eq!(
            outcome,
            FetchOutcome::Success {
                html: "<p>moved</p>".to_string()
            }
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = PageFetcher::new(Duration::ZERO, None);
        assert!(matches!(result, Err(ScanError::InvalidTimeout(_))));
    }

    #[test]
    fn test_invalid_user_agent_rejected() {
        let result = PageFetcher::new(Duration::from_secs(5), Some("bad\nagent"));
        assert!(matches!(result, Err(ScanError::InvalidUserAgent(_))));
    }
}
