use serde::Deserialize;

/// Floor for the continuation-token delay; the places API rejects tokens reused sooner
pub const MIN_PAGE_TOKEN_DELAY_MS: u64 = 2000;

/// Main configuration structure for Placecrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    pub output: OutputConfig,
}

/// Upstream API endpoints and the environment variables holding their keys
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the geocoding/places provider
    #[serde(rename = "places-base-url", default = "default_places_base_url")]
    pub places_base_url: String,

    /// Base URL of the search-aggregator provider (single-city mode)
    #[serde(rename = "serper-base-url", default = "default_serper_base_url")]
    pub serper_base_url: String,

    /// Environment variable holding the places API key
    #[serde(rename = "places-key-env", default = "default_places_key_env")]
    pub places_key_env: String,

    /// Environment variable holding the aggregator API key
    #[serde(rename = "serper-key-env", default = "default_serper_key_env")]
    pub serper_key_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            places_base_url: default_places_base_url(),
            serper_base_url: default_serper_base_url(),
            places_key_env: default_places_key_env(),
            serper_key_env: default_serper_key_env(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Country appended to every geocode query
    pub country: String,

    /// Places API category (e.g. "bar", "dentist")
    pub category: String,

    /// District or area names to crawl, in order
    #[serde(default)]
    pub regions: Vec<String>,

    /// Delay before a continuation token may be reused (milliseconds)
    #[serde(rename = "page-token-delay-ms", default = "default_page_token_delay_ms")]
    pub page_token_delay_ms: u64,

    /// Optional cap on nearby-search pages per region
    #[serde(rename = "max-pages-per-region", default)]
    pub max_pages_per_region: Option<u32>,

    /// Additional attempts on transient upstream failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Merge each saved region into the master result set
    #[serde(rename = "merge-into-master", default = "default_true")]
    pub merge_into_master: bool,

    /// Skip regions whose region file already exists
    #[serde(rename = "skip-completed-regions", default = "default_true")]
    pub skip_completed_regions: bool,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding one JSON file per region
    #[serde(rename = "region-dir")]
    pub region_dir: String,

    /// Path to the master results file
    #[serde(rename = "master-path")]
    pub master_path: String,

    /// How long to wait for the master lock (milliseconds)
    #[serde(rename = "lock-timeout-ms", default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_places_base_url() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

fn default_serper_base_url() -> String {
    "https://google.serper.dev".to_string()
}

fn default_places_key_env() -> String {
    "GOOGLE_PLACES_API_KEY".to_string()
}

fn default_serper_key_env() -> String {
    "SERPER_API_KEY".to_string()
}

fn default_page_token_delay_ms() -> u64 {
    MIN_PAGE_TOKEN_DELAY_MS
}

fn default_max_retries() -> u32 {
    1
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    concat!("placecrawl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}
