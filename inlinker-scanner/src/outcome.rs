use serde::{Deserialize, Serialize};

/// What a single GET against a target page produced.
///
/// Produced exactly once per target URL per crawl; the fetcher never retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchOutcome {
    /// 2xx response with the decoded body
    Success { html: String },
    /// Server answered with a non-2xx status
    HttpError { status_code: u16 },
    /// DNS, connect, TLS, timeout or body read failure
    NetworkError { message: String },
}
