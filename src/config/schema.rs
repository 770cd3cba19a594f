use crate::fetcher::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

pub const STOREFRONT_COLUMNS: &[&str] = &[
    "type", "name", "steam_appid", "required_age", "is_free", "controller_support",
    "dlc", "detailed_description", "about_the_game", "short_description", "fullgame",
    "supported_languages", "header_image", "website", "pc_requirements", "mac_requirements",
    "linux_requirements", "legal_notice", "drm_notice", "ext_user_account_notice",
    "developers", "publishers", "demos", "price_overview", "packages", "package_groups",
    "platforms", "metacritic", "reviews", "categories", "genres", "screenshots",
    "movies", "recommendations", "achievements", "release_date", "support_info",
    "background", "content_descriptors",
];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CrawlConfig {
    #[serde(default = "default_listing_url")]
    #[validate(url)]
    pub listing_url: String,

    #[serde(default = "default_detail_url")]
    #[validate(url)]
    pub detail_url: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,

    #[serde(default = "default_pause")]
    pub pause_ms: u64,

    /// Key under which the app id is stored in placeholder records.
    #[serde(default = "default_id_field")]
    #[validate(length(min = 1))]
    pub id_field: String,

    #[serde(default = "default_columns")]
    #[validate(length(min = 1))]
    pub columns: Vec<String>,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    #[validate]
    pub retry: RetryConfig,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            detail_url: default_detail_url(),
            output_dir: default_output_dir(),
            batch_size: default_batch_size(),
            pause_ms: default_pause(),
            id_field: default_id_field(),
            columns: default_columns(),
            format: OutputFormat::default(),
            retry: RetryConfig::default(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl CrawlConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetryConfig {
    /// Unset means retry forever.
    #[serde(default)]
    pub max_retries: Option<u32>,

    #[serde(default = "default_transport_delay")]
    pub transport_delay_ms: u64,

    #[serde(default = "default_empty_response_delay")]
    pub empty_response_delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    #[validate(range(min = 1.0))]
    pub backoff_factor: f64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            transport_delay_ms: default_transport_delay(),
            empty_response_delay_ms: default_empty_response_delay(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            transport_delay: Duration::from_millis(self.transport_delay_ms),
            empty_response_delay: Duration::from_millis(self.empty_response_delay_ms),
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

fn default_listing_url() -> String {
    "https://steamspy.com/api.php".to_string()
}

fn default_detail_url() -> String {
    "https://store.steampowered.com/api/appdetails/".to_string()
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_pause() -> u64 {
    1000
}

fn default_id_field() -> String {
    "steam_appid".to_string()
}

fn default_columns() -> Vec<String> {
    STOREFRONT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_user_agent() -> String {
    concat!("appcrawler/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_transport_delay() -> u64 {
    5_000
}

fn default_empty_response_delay() -> u64 {
    10_000
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_delay() -> u64 {
    300_000
}
