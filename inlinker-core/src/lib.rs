pub mod crawl;
pub mod error;
pub mod input;
pub mod matcher;
pub mod model;
pub mod report;

pub use crawl::{
    CrawlEvent, CrawlOptions, CrawlProgressCallback, execute_crawl, execute_crawl_with_fetcher,
};
pub use error::{CrawlError, InputError, ReportError};
pub use input::{Table, build_pairs, unique_target_urls};
pub use matcher::find_opportunities;
pub use model::{CrawlReport, KeywordSourcePair, Opportunity, SkipReason, SkippedUrl};
