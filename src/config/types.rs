use serde::{Deserialize, Deserializer};

/// Main configuration structure for Booru-Harvester
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    pub validation: ValidationConfig,
}

/// Where and what to crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin of the listing and post pages (no trailing slash)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Search query, passed verbatim into the listing URL
    pub query: String,

    /// Cookies sent with every request (`name=value`)
    pub cookies: Vec<String>,

    /// User agent header
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gelbooru.com".to_string(),
            query: "sort:score:desc -video -real_life -animated -3d".to_string(),
            cookies: vec!["fringeBenefits=yup".to_string()],
            user_agent: format!("booru-harvester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Crawl driver and worker pool behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrently running download workers
    pub workers: usize,

    /// Stop discovering once this many items have been seen (None = unlimited)
    #[serde(rename = "item-cap", deserialize_with = "deserialize_limit")]
    pub item_cap: Option<u64>,

    /// Admission ceiling for queued-but-not-started downloads (None = unlimited)
    #[serde(rename = "queue-ceiling", deserialize_with = "deserialize_limit")]
    pub queue_ceiling: Option<usize>,

    /// Poll interval of the admission gate (milliseconds)
    #[serde(rename = "admission-poll-ms")]
    pub admission_poll_ms: u64,

    /// Pause before re-fetching a listing page that failed (milliseconds)
    #[serde(rename = "page-retry-delay-ms")]
    pub page_retry_delay_ms: u64,

    /// Pause before a failed download is resubmitted (milliseconds)
    #[serde(rename = "requeue-delay-ms")]
    pub requeue_delay_ms: u64,

    /// Give up on an item after this many attempts (None = retry forever)
    #[serde(rename = "max-attempts", deserialize_with = "deserialize_limit")]
    pub max_attempts: Option<u32>,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 16,
            item_cap: None,
            queue_ceiling: Some(500),
            admission_poll_ms: 100,
            page_retry_delay_ms: 5000,
            requeue_delay_ms: 3000,
            max_attempts: None,
            request_timeout_secs: 60,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving assets and the tag ledger
    pub directory: String,

    /// File name of the tag ledger inside `directory`
    #[serde(rename = "tag-file")]
    pub tag_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "outputs".to_string(),
            tag_file: "tags.psv".to_string(),
        }
    }
}

/// Optional pipeline stages
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Append one tag record per saved item
    #[serde(rename = "save-tags")]
    pub save_tags: bool,

    /// Accept short assets that are within the 1/5 tolerance
    #[serde(rename = "soft-length-check")]
    pub soft_length_check: bool,

    /// Decode every asset and probe it with a vertical flip
    #[serde(rename = "validate-images")]
    pub validate_images: bool,
}

/// Converts the CLI/TOML convention (`-1` = unlimited) into an `Option`
pub fn limit_from_signed<T: TryFrom<i64>>(value: i64) -> Option<T> {
    if value < 0 {
        None
    } else {
        T::try_from(value).ok()
    }
}

fn deserialize_limit<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = i64::deserialize(deserializer)?;
    if value < 0 {
        return Ok(None);
    }
    T::try_from(value)
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("limit {} is out of range", value)))
}

impl Config {
    /// Strips trailing slashes from the base URL so paths can be appended
    pub fn normalized(mut self) -> Self {
        let trimmed = self.site.base_url.trim().trim_end_matches('/').to_string();
        self.site.base_url = trimmed;
        self
    }
}
