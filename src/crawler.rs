use crate::batch::BatchDriver;
use crate::checkpoint::Checkpoint;
use crate::config::schema::{CrawlConfig, OutputFormat};
use crate::error::Result;
use crate::fetcher::RequestFetcher;
use crate::output;
use crate::parser::{ListingParser, RecordParser, StorefrontParser};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub page: u32,
    pub records: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlSummary {
    pub pages: Vec<PageSummary>,
    pub skipped_pages: u32,
}

impl CrawlSummary {
    pub fn records_written(&self) -> usize {
        self.pages.iter().map(|p| p.records).sum()
    }
}

/// Walks aggregator pages, fetching details for every listed app and writing
/// one table per page.
pub struct PageCrawler {
    listing: ListingParser,
    parser: Box<dyn RecordParser>,
    driver: BatchDriver,
    output_dir: PathBuf,
    format: OutputFormat,
    columns: Vec<String>,
}

impl PageCrawler {
    pub fn new(
        listing: ListingParser,
        parser: Box<dyn RecordParser>,
        driver: BatchDriver,
        output_dir: impl Into<PathBuf>,
        format: OutputFormat,
        columns: Vec<String>,
    ) -> Self {
        Self {
            listing,
            parser,
            driver,
            output_dir: output_dir.into(),
            format,
            columns,
        }
    }

    pub fn from_config(config: &CrawlConfig, progress: Option<ProgressBar>) -> Result<Self> {
        let fetcher = RequestFetcher::new(
            &config.user_agent,
            config.request_timeout(),
            config.retry.to_policy(),
        )?;

        let listing = ListingParser::new(fetcher.clone(), config.listing_url.clone());
        let parser = StorefrontParser::new(fetcher, config.detail_url.clone(), config.id_field.clone());

        let mut driver = BatchDriver::new(config.batch_size, config.pause());
        if let Some(pb) = progress {
            driver = driver.with_progress(pb);
        }

        Ok(Self::new(
            listing,
            Box::new(parser),
            driver,
            &config.output_dir,
            config.format,
            config.columns.clone(),
        ))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Crawls pages `start..=end`. With `resume`, pages at or below the saved
    /// checkpoint are skipped.
    pub async fn run(&self, start: u32, end: u32, resume: bool) -> Result<CrawlSummary> {
        fs::create_dir_all(&self.output_dir)?;

        let checkpoint = if resume {
            Checkpoint::load(&self.output_dir)?
        } else {
            None
        };
        let first = match &checkpoint {
            Some(cp) => {
                let first = cp.resume_from(start);
                log::info!(
                    "Resuming after page {} ({} records already written)",
                    cp.last_completed_page,
                    cp.records_written
                );
                first
            }
            None => start,
        };
        let mut records_written = checkpoint.as_ref().map_or(0, |cp| cp.records_written);

        let mut summary = CrawlSummary {
            skipped_pages: first.saturating_sub(start).min(end.saturating_sub(start) + 1),
            ..CrawlSummary::default()
        };

        for page in first..=end {
            let page_summary = self.crawl_page(page).await?;
            records_written += page_summary.records as u64;
            Checkpoint::new(page, records_written).save(&self.output_dir)?;
            summary.pages.push(page_summary);
        }

        Ok(summary)
    }

    /// Fetches, shapes and writes a single page. The page is buffered in
    /// memory and only becomes visible on disk once fully written.
    pub async fn crawl_page(&self, page: u32) -> Result<PageSummary> {
        log::info!("Fetching page {}", page);
        let items = self.listing.fetch_page(page).await?;
        let records = self.driver.run(self.parser.as_ref(), &items, 0, None).await?;

        let mut handler = output::open_page(&self.output_dir, page, self.format, &self.columns)?;
        for record in &records {
            handler.write(record).await?;
        }
        let path = handler.close().await?;

        log::info!("Exported {} records from page {} to {}", records.len(), page, path.display());
        Ok(PageSummary {
            page,
            records: records.len(),
            path,
        })
    }
}
