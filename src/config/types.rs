use serde::Deserialize;

/// Main configuration structure for Shelf-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryEntry>,
}

/// Request pacing and admission configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvesterConfig {
    /// Maximum number of requests in flight across the whole run
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Per-request timeout (seconds); a timeout counts as a transient failure
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Lower bound of the jittered pre-request delay (milliseconds)
    #[serde(rename = "min-request-delay-ms")]
    pub min_request_delay_ms: u64,

    /// Upper bound of the jittered pre-request delay (milliseconds)
    #[serde(rename = "max-request-delay-ms")]
    pub max_request_delay_ms: u64,

    /// How much each rolling error stretches the pre-request delay
    #[serde(rename = "error-delay-factor", default = "default_error_delay_factor")]
    pub error_delay_factor: f64,
}

fn default_error_delay_factor() -> f64 {
    0.5
}

/// Retry budget and backoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Attempts per request, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds); doubles every attempt
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Cap on a single backoff delay (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Remote catalog layout
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base endpoint, e.g. "https://www.goodreads.com"
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing path template; `{list}` is replaced by the category's list id
    #[serde(rename = "list-path")]
    pub list_path: String,

    /// Entries on a full listing page; a shorter page is taken as the last one
    #[serde(rename = "page-size")]
    pub page_size: usize,

    /// Hard ceiling on listing pages walked per category
    #[serde(rename = "max-pages-per-category")]
    pub max_pages_per_category: u32,

    /// Disables TLS certificate validation. Off unless explicitly set.
    #[serde(rename = "accept-invalid-certs", default)]
    pub accept_invalid_certs: bool,
}

/// Client identity headers sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Value of the User-Agent header
    #[serde(rename = "browser-string")]
    pub browser_string: String,

    /// Value of the Accept header
    #[serde(default)]
    pub accept: Option<String>,

    /// Value of the Accept-Language header
    #[serde(rename = "accept-language", default)]
    pub accept_language: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Periodic checkpoint file (overwritten on every save)
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Final artifact written once after all categories
    #[serde(rename = "final-path")]
    pub final_path: String,

    /// Newly committed records between periodic checkpoints
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: usize,

    /// Processed records between progress lines
    #[serde(rename = "progress-interval")]
    pub progress_interval: usize,
}

/// One category to harvest
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CategoryEntry {
    /// Category name, also part of every record's identity
    pub name: String,

    /// Remote list identifier substituted into the listing path
    #[serde(rename = "list-id")]
    pub list_id: String,

    /// Number of unique records wanted from this category
    pub quota: usize,
}
