use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for pricewatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub feed: FeedConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Orchestration behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Maximum number of concurrently active parser sessions
    #[serde(rename = "max-concurrent-parsers")]
    pub max_concurrent_parsers: u32,

    /// Maximum number of URLs dispatched and delivered as one batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Target length of one full marketplace cycle (seconds)
    #[serde(rename = "cycle-interval-seconds")]
    pub cycle_interval_seconds: u64,

    /// Pause between marketplaces within a cycle (seconds)
    #[serde(rename = "inter-marketplace-delay-seconds")]
    pub inter_marketplace_delay_seconds: u64,

    /// Upper bound on a single product parse, including page load (seconds)
    #[serde(rename = "parse-timeout-seconds", default = "default_parse_timeout")]
    pub parse_timeout_seconds: u64,

    /// Sleep before retrying after a cycle that produced no work (seconds)
    #[serde(rename = "retry-interval-seconds", default = "default_retry_interval")]
    pub retry_interval_seconds: u64,

    /// Ordered list of marketplace keys to visit each cycle
    pub marketplaces: Vec<String>,
}

impl ScraperConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_seconds)
    }

    pub fn inter_marketplace_delay(&self) -> Duration {
        Duration::from_secs(self.inter_marketplace_delay_seconds)
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_secs(self.parse_timeout_seconds)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }
}

/// Egress proxy configuration
///
/// An empty endpoint list means direct connections; the rebind options are
/// only meaningful for providers that authorize a single client IP and expose
/// a rebind call for switching it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Proxy endpoint URLs; one is picked uniformly at random per session
    #[serde(default)]
    pub endpoints: Vec<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Provider API endpoint for rebinding the authorized egress IP
    #[serde(rename = "rebind-url", default)]
    pub rebind_url: Option<String>,

    /// The IP to rebind to when the blocked-failure threshold is crossed
    #[serde(rename = "rebind-ip", default)]
    pub rebind_ip: Option<String>,

    /// Minimum spacing between successful rebinds (seconds)
    #[serde(
        rename = "rebind-cooldown-seconds",
        default = "default_rebind_cooldown"
    )]
    pub rebind_cooldown_seconds: u64,

    /// Blocked-failure count per cycle that triggers a rebind attempt
    #[serde(
        rename = "blocked-rebind-threshold",
        default = "default_blocked_threshold"
    )]
    pub blocked_rebind_threshold: u64,
}

impl ProxyConfig {
    pub fn rebind_cooldown(&self) -> Duration {
        Duration::from_secs(self.rebind_cooldown_seconds)
    }
}

// An omitted [proxy] section must pick up the same defaults as omitted
// fields, which derive(Default) would not do.
impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            username: None,
            password: None,
            rebind_url: None,
            rebind_ip: None,
            rebind_cooldown_seconds: default_rebind_cooldown(),
            blocked_rebind_threshold: default_blocked_threshold(),
        }
    }
}

/// Which backend serves pending URLs and receives snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// The remote table API
    Api,
    /// A local SQLite database
    Sqlite,
}

/// URL source / snapshot sink configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub kind: FeedKind,

    /// Base URL of the table API (required when kind = "api")
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Path to the SQLite database (required when kind = "sqlite")
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "product-name")]
    pub product_name: String,

    #[serde(rename = "product-version")]
    pub product_version: String,
}

impl UserAgentConfig {
    /// The User-Agent header value sessions send
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.product_name, self.product_version)
    }
}

fn default_parse_timeout() -> u64 {
    30
}

fn default_retry_interval() -> u64 {
    60
}

fn default_rebind_cooldown() -> u64 {
    600
}

fn default_blocked_threshold() -> u64 {
    25
}
