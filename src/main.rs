use appcrawler::config::{ConfigLoader, CrawlConfig, OutputFormat};
use appcrawler::crawler::PageCrawler;
use clap::{CommandFactory, Parser};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use validator::Validate;

#[derive(Parser)]
#[command(name = "appcrawler")]
#[command(version)]
#[command(about = "Crawls aggregator listing pages and storefront details into one table per page", long_about = None)]
struct Cli {
    /// First aggregator page to crawl
    start_page: u32,

    /// Last aggregator page to crawl (inclusive)
    end_page: u32,

    /// Path to a configuration file (JSON/YAML/TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for page files and the checkpoint
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Items per timing batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Pause after every request, in milliseconds
    #[arg(long)]
    pause_ms: Option<u64>,

    /// Give up on a request after this many retries (default: retry forever)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Output table format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Skip pages already recorded in the checkpoint
    #[arg(long)]
    resume: bool,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn apply(&self, config: &mut CrawlConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.display().to_string();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(pause_ms) = self.pause_ms {
            config.pause_ms = pause_ms;
        }
        if let Some(max_retries) = self.max_retries {
            config.retry.max_retries = Some(max_retries);
        }
        if let Some(format) = self.format {
            config.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();

    if cli.start_page > cli.end_page {
        Cli::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!(
                    "start page {} is after end page {}",
                    cli.start_page, cli.end_page
                ),
            )
            .exit();
    }

    let logger = env_logger::Builder::from_default_env().build();
    let multi = MultiProgress::new();
    let progress = !cli.no_progress;
    if progress {
        indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init()?;
    } else {
        let level = logger.filter();
        log::set_boxed_logger(Box::new(logger))?;
        log::set_max_level(level);
    }

    let mut config = match &cli.config {
        Some(path) => {
            log::info!("Loading config from {:?}", path);
            ConfigLoader::load(path)?
        }
        None => CrawlConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    let progress_bar = if progress {
        let pb = multi.add(ProgressBar::new(0));
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"));
        Some(pb)
    } else {
        None
    };

    let crawler = PageCrawler::from_config(&config, progress_bar.clone())?;
    log::info!(
        "Crawling pages {}-{} into {}",
        cli.start_page,
        cli.end_page,
        crawler.output_dir().display()
    );

    let summary = tokio::select! {
        result = crawler.run(cli.start_page, cli.end_page, cli.resume) => result?,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted; the page in progress was not written.");
            if let Some(pb) = &progress_bar {
                pb.abandon();
            }
            std::process::exit(130);
        }
    };

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    println!("\n✅ Crawl Completed:");
    println!("   Pages Written: {}", summary.pages.len());
    println!("   Pages Skipped: {}", summary.skipped_pages);
    println!("   Records Written: {}", summary.records_written());
    for page in &summary.pages {
        println!("   {} ({} records)", page.path.display(), page.records);
    }

    Ok(())
}
