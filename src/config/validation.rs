use crate::config::types::{Config, FeedConfig, FeedKind, ProxyConfig, ScraperConfig};
use crate::marketplace::Marketplace;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_proxy_config(&config.proxy)?;
    validate_feed_config(&config.feed)?;
    Ok(())
}

/// Validates orchestration settings
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_parsers < 1 || config.max_concurrent_parsers > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_parsers must be between 1 and 64, got {}",
            config.max_concurrent_parsers
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.cycle_interval_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "cycle_interval_seconds must be >= 1, got {}",
            config.cycle_interval_seconds
        )));
    }

    if config.parse_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "parse_timeout_seconds must be >= 1, got {}",
            config.parse_timeout_seconds
        )));
    }

    validate_marketplace_list(&config.marketplaces)?;

    Ok(())
}

/// Validates the marketplace list: non-empty, known keys, no duplicates
fn validate_marketplace_list(keys: &[String]) -> Result<(), ConfigError> {
    if keys.is_empty() {
        return Err(ConfigError::Validation(
            "marketplaces list cannot be empty".to_string(),
        ));
    }

    let mut seen = Vec::new();
    for key in keys {
        let marketplace = Marketplace::from_key(key).ok_or_else(|| {
            ConfigError::Validation(format!("unknown marketplace key '{}'", key))
        })?;

        if seen.contains(&marketplace) {
            return Err(ConfigError::Validation(format!(
                "duplicate marketplace key '{}'",
                key
            )));
        }
        seen.push(marketplace);
    }

    Ok(())
}

/// Validates proxy settings
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    for endpoint in &config.endpoints {
        let url = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("proxy endpoint '{}': {}", endpoint, e)))?;

        if !matches!(url.scheme(), "http" | "https" | "socks5") {
            return Err(ConfigError::Validation(format!(
                "proxy endpoint '{}' must use http, https or socks5",
                endpoint
            )));
        }
    }

    if let Some(rebind_url) = &config.rebind_url {
        Url::parse(rebind_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("rebind-url: {}", e)))?;

        if config.rebind_cooldown_seconds < 1 {
            return Err(ConfigError::Validation(format!(
                "rebind_cooldown_seconds must be >= 1, got {}",
                config.rebind_cooldown_seconds
            )));
        }
    }

    // A rebind target without a provider endpoint can never take effect.
    if config.rebind_ip.is_some() && config.rebind_url.is_none() {
        return Err(ConfigError::Validation(
            "rebind-ip is set but rebind-url is missing".to_string(),
        ));
    }

    Ok(())
}

/// Validates feed settings against the selected backend
fn validate_feed_config(config: &FeedConfig) -> Result<(), ConfigError> {
    match config.kind {
        FeedKind::Api => {
            let base = config.base_url.as_deref().ok_or_else(|| {
                ConfigError::Validation("feed kind 'api' requires base-url".to_string())
            })?;
            Url::parse(base).map_err(|e| ConfigError::InvalidUrl(format!("base-url: {}", e)))?;
        }
        FeedKind::Sqlite => {
            let path = config.database_path.as_deref().unwrap_or("");
            if path.is_empty() {
                return Err(ConfigError::Validation(
                    "feed kind 'sqlite' requires database-path".to_string(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper_config() -> ScraperConfig {
        ScraperConfig {
            max_concurrent_parsers: 3,
            batch_size: 100,
            cycle_interval_seconds: 900,
            inter_marketplace_delay_seconds: 5,
            parse_timeout_seconds: 30,
            retry_interval_seconds: 60,
            marketplaces: vec!["kaspi".to_string(), "ozon".to_string()],
        }
    }

    #[test]
    fn test_valid_scraper_config() {
        assert!(validate_scraper_config(&scraper_config()).is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = scraper_config();
        config.max_concurrent_parsers = 0;
        assert!(matches!(
            validate_scraper_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = scraper_config();
        config.batch_size = 0;
        assert!(validate_scraper_config(&config).is_err());
    }

    #[test]
    fn test_unknown_marketplace_rejected() {
        let mut config = scraper_config();
        config.marketplaces.push("amazon".to_string());
        assert!(validate_scraper_config(&config).is_err());
    }

    #[test]
    fn test_duplicate_marketplace_rejected() {
        let mut config = scraper_config();
        config.marketplaces.push("kaspi".to_string());
        assert!(validate_scraper_config(&config).is_err());
    }

    #[test]
    fn test_wb_alias_counts_as_duplicate() {
        let mut config = scraper_config();
        config.marketplaces = vec!["wildberries".to_string(), "wb".to_string()];
        assert!(validate_scraper_config(&config).is_err());
    }

    #[test]
    fn test_empty_marketplaces_rejected() {
        let mut config = scraper_config();
        config.marketplaces.clear();
        assert!(validate_scraper_config(&config).is_err());
    }

    #[test]
    fn test_proxy_endpoint_scheme_checked() {
        let config = ProxyConfig {
            endpoints: vec!["ftp://proxy.example.com:21".to_string()],
            ..ProxyConfig::default()
        };
        assert!(validate_proxy_config(&config).is_err());
    }

    #[test]
    fn test_proxy_valid_endpoints() {
        let config = ProxyConfig {
            endpoints: vec![
                "http://45.130.43.9:8085".to_string(),
                "socks5://45.130.43.10:1080".to_string(),
            ],
            ..ProxyConfig::default()
        };
        assert!(validate_proxy_config(&config).is_ok());
    }

    #[test]
    fn test_rebind_ip_without_url_rejected() {
        let config = ProxyConfig {
            rebind_ip: Some("2.76.176.224".to_string()),
            ..ProxyConfig::default()
        };
        assert!(validate_proxy_config(&config).is_err());
    }

    #[test]
    fn test_api_feed_requires_base_url() {
        let config = FeedConfig {
            kind: FeedKind::Api,
            base_url: None,
            database_path: None,
        };
        assert!(validate_feed_config(&config).is_err());

        let config = FeedConfig {
            kind: FeedKind::Api,
            base_url: Some("https://parse.example.com".to_string()),
            database_path: None,
        };
        assert!(validate_feed_config(&config).is_ok());
    }

    #[test]
    fn test_sqlite_feed_requires_path() {
        let config = FeedConfig {
            kind: FeedKind::Sqlite,
            base_url: None,
            database_path: None,
        };
        assert!(validate_feed_config(&config).is_err());

        let config = FeedConfig {
            kind: FeedKind::Sqlite,
            base_url: None,
            database_path: Some("./products.db".to_string()),
        };
        assert!(validate_feed_config(&config).is_ok());
    }
}
