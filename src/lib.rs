pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod model;
pub mod output;
pub mod parser;

pub use batch::{batch_bounds, BatchDriver};
pub use checkpoint::Checkpoint;
pub use crawler::{CrawlSummary, PageCrawler, PageSummary};
pub use error::{Error, Result};
pub use fetcher::{RequestFetcher, RetryPolicy};
pub use metrics::{BatchReport, RunStatistics};
pub use model::{Record, WorkItem};
pub use parser::{decode_listing, ListingParser, RecordParser, StorefrontParser};
