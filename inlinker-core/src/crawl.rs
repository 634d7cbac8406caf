use crate::error::CrawlError;
use crate::matcher::find_opportunities;
use crate::model::{CrawlReport, KeywordSourcePair, Opportunity, SkipReason, SkippedUrl};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use inlinker_scanner::{FetchOutcome, PageFetcher, extract_paragraphs};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(500);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(120);
pub const MAX_PACING_DELAY: Duration = Duration::from_secs(60);
pub const MAX_WORKERS: usize = 64;

type PacingLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Per-request deadline, connect through body
    pub timeout: Duration,
    /// User-Agent sent with every request; `None` uses a desktop browser string
    pub user_agent: Option<String>,
    /// Minimum spacing between requests
    pub pacing_delay: Duration,
    /// 1 crawls strictly sequentially
    pub workers: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            pacing_delay: DEFAULT_PACING_DELAY,
            workers: 1,
        }
    }
}

impl CrawlOptions {
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.timeout.is_zero() || self.timeout > MAX_TIMEOUT {
            return Err(CrawlError::InvalidConfig(format!(
                "timeout must be between 1 and {} seconds",
                MAX_TIMEOUT.as_secs()
            )));
        }
        if self.pacing_delay > MAX_PACING_DELAY {
            return Err(CrawlError::InvalidConfig(format!(
                "pacing delay must not exceed {} seconds",
                MAX_PACING_DELAY.as_secs()
            )));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(CrawlError::InvalidConfig(format!(
                "workers must be between 1 and {}",
                MAX_WORKERS
            )));
        }
        Ok(())
    }
}

/// Notifications emitted while a crawl runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    /// Work on a target URL is starting. `index` is 1-based.
    Progress {
        index: usize,
        total: usize,
        url: String,
    },
    /// A target URL failed and was left out of matching
    Skipped { url: String, reason: SkipReason },
    /// The crawl finished or was cancelled
    Completed {
        processed: usize,
        total: usize,
        opportunities: usize,
        skipped: usize,
        cancelled: bool,
    },
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(CrawlEvent) + Send + Sync>;

/// Result of one fetch/extract/match unit
enum PageResult {
    Matched(Vec<Opportunity>),
    Skipped(SkipReason),
}

/// Crawl `urls`, matching every page against `pairs`.
///
/// Individual page failures are recorded in the report's skip list and never
/// abort the crawl; only invalid options or an unbuildable HTTP client fail
/// it. Cancelling `cancel` stops between URLs (and interrupts in-flight
/// requests) and returns what was aggregated so far.
pub async fn execute_crawl(
    urls: &[String],
    pairs: &[KeywordSourcePair],
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
    cancel: CancellationToken,
) -> Result<CrawlReport, CrawlError> {
    options.validate()?;
    let fetcher = PageFetcher::new(options.timeout, options.user_agent.as_deref())?;
    execute_crawl_with_fetcher(&fetcher, urls, pairs, &options, progress_callback, cancel).await
}

/// Same as [`execute_crawl`] with a caller-built fetcher. `options.timeout`
/// and `options.user_agent` are ignored in favour of the fetcher's own.
pub async fn execute_crawl_with_fetcher(
    fetcher: &PageFetcher,
    urls: &[String],
    pairs: &[KeywordSourcePair],
    options: &CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
    cancel: CancellationToken,
) -> Result<CrawlReport, CrawlError> {
    options.validate()?;

    info!(
        "Starting crawl of {} URLs against {} keyword pairs ({} workers)",
        urls.len(),
        pairs.len(),
        options.workers
    );

    let report = if options.workers > 1 && urls.len() > 1 {
        crawl_concurrent(fetcher, urls, pairs, options, &progress_callback, &cancel).await
    } else {
        crawl_sequential(fetcher, urls, pairs, options, &progress_callback, &cancel).await
    };

    if report.cancelled {
        info!(
            "Crawl cancelled after {}/{} URLs, {} opportunities kept",
            report.processed,
            report.total,
            report.opportunities.len()
        );
    } else {
        info!(
            "Crawl complete. {} URLs, {} opportunities, {} skipped",
            report.processed,
            report.opportunities.len(),
            report.skipped.len()
        );
    }

    emit(
        &progress_callback,
        CrawlEvent::Completed {
            processed: report.processed,
            total: report.total,
            opportunities: report.opportunities.len(),
            skipped: report.skipped.len(),
            cancelled: report.cancelled,
        },
    );

    Ok(report)
}

async fn crawl_sequential(
    fetcher: &PageFetcher,
    urls: &[String],
    pairs: &[KeywordSourcePair],
    options: &CrawlOptions,
    progress_callback: &Option<CrawlProgressCallback>,
    cancel: &CancellationToken,
) -> CrawlReport {
    let total = urls.len();
    let mut report = CrawlReport {
        total,
        ..CrawlReport::default()
    };

    for (idx, url) in urls.iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        emit(
            progress_callback,
            CrawlEvent::Progress {
                index: idx + 1,
                total,
                url: url.clone(),
            },
        );

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                report.cancelled = true;
                break;
            }
            page = process_page(fetcher, url, pairs) => page,
        };
        notify_skip(progress_callback, url, &page);
        record(&mut report, url, page);

        if idx + 1 < total && !options.pacing_delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(options.pacing_delay) => {}
            }
        }
    }

    report
}

/// Bounded pool: at most `workers` pages in flight, request starts spaced by
/// the pacing delay across all workers. Results are collected in URL order so
/// the aggregate matches a sequential crawl.
async fn crawl_concurrent(
    fetcher: &PageFetcher,
    urls: &[String],
    pairs: &[KeywordSourcePair],
    options: &CrawlOptions,
    progress_callback: &Option<CrawlProgressCallback>,
    cancel: &CancellationToken,
) -> CrawlReport {
    let total = urls.len();
    let semaphore = Arc::new(Semaphore::new(options.workers));
    let limiter: Option<Arc<PacingLimiter>> = Quota::with_period(options.pacing_delay)
        .map(|quota| Arc::new(RateLimiter::direct(quota)));
    let pairs: Arc<Vec<KeywordSourcePair>> = Arc::new(pairs.to_vec());

    let mut worker_tasks = Vec::with_capacity(total);
    for (idx, url) in urls.iter().enumerate() {
        let fetcher = fetcher.clone();
        let slot_url = url.clone();
        let url = url.clone();
        let pairs = pairs.clone();
        let semaphore = semaphore.clone();
        let limiter = limiter.clone();
        let progress_cb = progress_callback.clone();
        let cancel = cancel.clone();

        let task = tokio::spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                permit = semaphore.acquire_owned() => permit.ok()?,
            };

            if let Some(limiter) = limiter {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    _ = limiter.until_ready() => {}
                }
            }

            emit(
                &progress_cb,
                CrawlEvent::Progress {
                    index: idx + 1,
                    total,
                    url: url.clone(),
                },
            );

            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                page = process_page(&fetcher, &url, &pairs) => page,
            };
            notify_skip(&progress_cb, &url, &page);
            Some(page)
        });

        worker_tasks.push((slot_url, task));
    }

    let mut report = CrawlReport {
        total,
        ..CrawlReport::default()
    };

    // Awaiting in spawn order keeps opportunities in URL order regardless of
    // completion order.
    for (url, task) in worker_tasks {
        match task.await {
            Ok(Some(page)) => record(&mut report, &url, page),
            Ok(None) => report.cancelled = true,
            Err(e) => {
                error!("Worker for {} failed: {}", url, e);
                let reason = SkipReason::Network(format!("worker task failed: {}", e));
                emit(
                    progress_callback,
                    CrawlEvent::Skipped {
                        url: url.clone(),
                        reason: reason.clone(),
                    },
                );
                report.skipped.push(SkippedUrl { url, reason });
                report.processed += 1;
            }
        }
    }

    report.cancelled |= cancel.is_cancelled() && report.processed < total;
    report
}

async fn process_page(
    fetcher: &PageFetcher,
    url: &str,
    pairs: &[KeywordSourcePair],
) -> PageResult {
    match fetcher.fetch(url).await {
        FetchOutcome::Success { html } => {
            let paragraphs = extract_paragraphs(&html);
            let opportunities = find_opportunities(url, &paragraphs, pairs);
            debug!(
                "{}: {} paragraphs, {} opportunities",
                url,
                paragraphs.len(),
                opportunities.len()
            );
            PageResult::Matched(opportunities)
        }
        FetchOutcome::HttpError { status_code } => {
            PageResult::Skipped(SkipReason::HttpStatus(status_code))
        }
        FetchOutcome::NetworkError { message } => PageResult::Skipped(SkipReason::Network(message)),
    }
}

fn notify_skip(progress_callback: &Option<CrawlProgressCallback>, url: &str, page: &PageResult) {
    if let PageResult::Skipped(reason) = page {
        warn!("Failed to retrieve {}: {}", url, reason);
        emit(
            progress_callback,
            CrawlEvent::Skipped {
                url: url.to_string(),
                reason: reason.clone(),
            },
        );
    }
}

fn record(report: &mut CrawlReport, url: &str, page: PageResult) {
    report.processed += 1;
    match page {
        PageResult::Matched(opportunities) => report.opportunities.extend(opportunities),
        PageResult::Skipped(reason) => report.skipped.push(SkippedUrl {
            url: url.to_string(),
            reason,
        }),
    }
}

fn emit(progress_callback: &Option<CrawlProgressCallback>, event: CrawlEvent) {
    if let Some(callback) = progress_callback {
        callback(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn html_page(paragraphs: &[&str]) -> ResponseTemplate {
        let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(format!("<html><body>{}</body></html>", body))
    }

    fn fast_options(workers: usize) -> CrawlOptions {
        CrawlOptions {
            timeout: Duration::from_secs(5),
            user_agent: None,
            pacing_delay: Duration::ZERO,
            workers,
        }
    }

    fn recording_callback() -> (CrawlProgressCallback, Arc<Mutex<Vec<CrawlEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        let callback: CrawlProgressCallback = Arc::new(move |event| {
            events_clone.lock().unwrap().push(event);
        });
        (callback, events)
    }

    #[test]
    fn test_default_options() {
        let options = CrawlOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.pacing_delay, Duration::from_millis(500));
        assert_eq!(options.workers, 1);
        assert!(options.user_agent.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let zero_timeout = CrawlOptions {
            timeout: Duration::ZERO,
            ..CrawlOptions::default()
        };
        assert!(matches!(
            zero_timeout.validate(),
            Err(CrawlError::InvalidConfig(_))
        ));

        let no_workers = CrawlOptions {
            workers: 0,
            ..CrawlOptions::default()
        };
        assert!(no_workers.validate().is_err());

        let huge_delay = CrawlOptions {
            pacing_delay: Duration::from_secs(3600),
            ..CrawlOptions::default()
        };
        assert!(huge_delay.validate().is_err());
    }

    #[tokio::test]
    async fn test_invalid_options_fail_before_crawling() {
        let result = execute_crawl(
            &["http://127.0.0.1:1/".to_string()],
            &[],
            fast_options(0),
            None,
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(CrawlError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_progress_events_in_order() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/one"))
            .respond_with(html_page(&["seo here"]))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/two"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let urls = vec![
            format!("{}/one", mock_server.uri()),
            format!("{}/two", mock_server.uri()),
        ];
        let pairs = vec![KeywordSourcePair::new("seo", "https://elsewhere")];
        let (callback, events) = recording_callback();

        let report = execute_crawl(
            &urls,
            &pairs,
            fast_options(1),
            Some(callback),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.opportunities.len(), 1);
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                CrawlEvent::Progress {
                    index: 1,
                    total: 2,
                    url: urls[0].clone()
                },
                CrawlEvent::Progress {
                    index: 2,
                    total: 2,
                    url: urls[1].clone()
                },
                CrawlEvent::Skipped {
                    url: urls[1].clone(),
                    reason: SkipReason::HttpStatus(500)
                },
                CrawlEvent::Completed {
                    processed: 2,
                    total: 2,
                    opportunities: 1,
                    skipped: 1,
                    cancelled: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_pacing_delay_applied_between_urls() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html_page(&["text"]))
            .mount(&mock_server)
            .await;

        let urls: Vec<String> = (1..=3)
            .map(|i| format!("{}/page{}", mock_server.uri(), i))
            .collect();
        let options = CrawlOptions {
            pacing_delay: Duration::from_millis(150),
            ..fast_options(1)
        };

        let start = Instant::now();
        let report = execute_crawl(&urls, &[], options, None, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.processed, 3);
        // two gaps between three requests
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_cancel_during_pacing_keeps_results() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html_page(&["seo text"]))
            .mount(&mock_server)
            .await;

        let urls: Vec<String> = (1..=3)
            .map(|i| format!("{}/page{}", mock_server.uri(), i))
            .collect();
        let pairs = vec![KeywordSourcePair::new("seo", "https://a")];
        let options = CrawlOptions {
            pacing_delay: Duration::from_secs(30),
            ..fast_options(1)
        };

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let callback: CrawlProgressCallback = Arc::new(move |event| {
            if matches!(event, CrawlEvent::Progress { index: 1, .. }) {
                cancel_clone.cancel();
            }
        });

        let start = Instant::now();
        let report = execute_crawl(&urls, &pairs, options, Some(callback), cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(start.elapsed() < Duration::from_secs(10));
        // the first page was either finished before the cancel was seen or dropped
        assert!(report.processed <= 1);
        assert_eq!(report.opportunities.len(), report.processed);
    }
}
