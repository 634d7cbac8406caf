pub mod error;
pub mod extract;
pub mod fetcher;
pub mod outcome;

pub use error::ScanError;
pub use extract::extract_paragraphs;
pub use fetcher::{DEFAULT_USER_AGENT, PageFetcher};
pub use outcome::FetchOutcome;
