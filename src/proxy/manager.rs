use crate::config::ProxyConfig;
use crate::WatchError;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Egress settings for one scraping session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressConfig {
    /// Proxy server URL
    pub server: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Result of a rebind attempt
///
/// Rebinds being refused or failing is normal operation, so this is a plain
/// value rather than an error: callers log it and move on.
#[derive(Debug, Clone)]
pub enum RotateOutcome {
    /// The provider confirmed the new binding
    Rotated { ip: String },

    /// The cooldown window since the last confirmed rebind has not elapsed;
    /// no provider call was made
    CoolingDown { remaining: Duration },

    /// The binding was left as it was (no endpoint configured, transport
    /// failure, or the provider refused)
    Unchanged { reason: String },
}

/// Owns egress endpoint selection and the provider-side IP binding
///
/// The binding timestamp is only advanced on a confirmed successful rebind,
/// so a failed provider call never eats into the cooldown budget.
pub struct ProxyManager {
    endpoints: Vec<String>,
    username: Option<String>,
    password: Option<String>,
    rebind_url: Option<String>,
    cooldown: Duration,
    last_rebind: Mutex<Option<Instant>>,
    http: reqwest::Client,
}

impl ProxyManager {
    pub fn new(
        endpoints: Vec<String>,
        username: Option<String>,
        password: Option<String>,
        rebind_url: Option<String>,
        cooldown: Duration,
    ) -> Result<Self, WatchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            endpoints,
            username,
            password,
            rebind_url,
            cooldown,
            last_rebind: Mutex::new(None),
            http,
        })
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, WatchError> {
        Self::new(
            config.endpoints.clone(),
            config.username.clone(),
            config.password.clone(),
            config.rebind_url.clone(),
            config.rebind_cooldown(),
        )
    }

    /// Returns true when sessions should go through a proxy at all
    pub fn has_endpoints(&self) -> bool {
        !self.endpoints.is_empty()
    }

    /// Picks egress settings for a new session
    ///
    /// Selection is uniformly random over the configured endpoints; a single
    /// configured endpoint is simply always returned. This is a pure read
    /// with no rate limiting.
    pub fn egress_config(&self) -> Option<EgressConfig> {
        let server = self.endpoints.choose(&mut rand::thread_rng())?;
        Some(EgressConfig {
            server: server.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }

    /// Asks the provider to rebind the authorized egress IP
    ///
    /// Inside the cooldown window this returns [`RotateOutcome::CoolingDown`]
    /// without touching the network. The whole call is serialized so two
    /// concurrent rotations cannot both slip past the cooldown check.
    pub async fn rotate_binding(&self, new_ip: &str) -> RotateOutcome {
        let mut last_rebind = self.last_rebind.lock().await;

        let rebind_url = match &self.rebind_url {
            Some(url) => url,
            None => {
                return RotateOutcome::Unchanged {
                    reason: "no rebind endpoint configured".to_string(),
                }
            }
        };

        if let Some(last) = *last_rebind {
            let elapsed = last.elapsed();
            if elapsed < self.cooldown {
                return RotateOutcome::CoolingDown {
                    remaining: self.cooldown - elapsed,
                };
            }
        }

        let request = self.http.get(rebind_url).query(&[
            ("action", "setip"),
            ("login", self.username.as_deref().unwrap_or("")),
            ("password", self.password.as_deref().unwrap_or("")),
            ("ip", new_ip),
        ]);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Rebind call failed: {}", e);
                return RotateOutcome::Unchanged {
                    reason: format!("transport failure: {}", e),
                };
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Rebind call returned HTTP {}", status);
            return RotateOutcome::Unchanged {
                reason: format!("provider returned HTTP {}", status),
            };
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Rebind response was not JSON: {}", e);
                return RotateOutcome::Unchanged {
                    reason: format!("unreadable provider response: {}", e),
                };
            }
        };

        if body.get("result").and_then(|v| v.as_str()) == Some("success") {
            *last_rebind = Some(Instant::now());
            tracing::info!("Egress binding rotated to {}", new_ip);
            RotateOutcome::Rotated {
                ip: new_ip.to_string(),
            }
        } else {
            tracing::error!("Provider refused rebind: {}", body);
            RotateOutcome::Unchanged {
                reason: format!("provider refused: {}", body),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager_with(rebind_url: Option<String>, cooldown: Duration) -> ProxyManager {
        ProxyManager::new(
            vec!["http://45.130.43.9:8085".to_string()],
            Some("proxyuser".to_string()),
            Some("proxypass".to_string()),
            rebind_url,
            cooldown,
        )
        .unwrap()
    }

    #[test]
    fn test_egress_config_single_endpoint() {
        let manager = manager_with(None, Duration::from_secs(600));
        let egress = manager.egress_config().unwrap();
        assert_eq!(egress.server, "http://45.130.43.9:8085");
        assert_eq!(egress.username.as_deref(), Some("proxyuser"));
    }

    #[test]
    fn test_egress_config_empty_endpoints() {
        let manager =
            ProxyManager::new(vec![], None, None, None, Duration::from_secs(600)).unwrap();
        assert!(!manager.has_endpoints());
        assert!(manager.egress_config().is_none());
    }

    #[test]
    fn test_egress_config_picks_from_list() {
        let endpoints = vec![
            "http://proxy-a.example.com:8085".to_string(),
            "http://proxy-b.example.com:8085".to_string(),
        ];
        let manager =
            ProxyManager::new(endpoints.clone(), None, None, None, Duration::from_secs(600))
                .unwrap();

        for _ in 0..20 {
            let egress = manager.egress_config().unwrap();
            assert!(endpoints.contains(&egress.server));
        }
    }

    #[tokio::test]
    async fn test_rotate_without_endpoint_is_unchanged() {
        let manager = manager_with(None, Duration::from_secs(600));
        let outcome = manager.rotate_binding("2.76.176.224").await;
        assert!(matches!(outcome, RotateOutcome::Unchanged { .. }));
    }

    #[tokio::test]
    async fn test_rotate_then_cooldown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "setip"))
            .and(query_param("ip", "2.76.176.224"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "success"
            })))
            .mount(&server)
            .await;

        let manager = manager_with(Some(server.uri()), Duration::from_secs(600));

        let first = manager.rotate_binding("2.76.176.224").await;
        assert!(matches!(first, RotateOutcome::Rotated { .. }));

        // Second attempt lands inside the cooldown window and must not reach
        // the provider.
        let second = manager.rotate_binding("2.76.176.225").await;
        match second {
            RotateOutcome::CoolingDown { remaining } => {
                assert!(remaining <= Duration::from_secs(600));
                assert!(remaining > Duration::from_secs(590));
            }
            other => panic!("expected CoolingDown, got {:?}", other),
        }

        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_refusal_does_not_start_cooldown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "error"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let manager = manager_with(Some(server.uri()), Duration::from_secs(600));

        let first = manager.rotate_binding("2.76.176.224").await;
        assert!(matches!(first, RotateOutcome::Unchanged { .. }));

        // The failed attempt did not update the rebind time, so the next try
        // still goes out to the provider instead of cooling down.
        let second = manager.rotate_binding("2.76.176.224").await;
        assert!(matches!(second, RotateOutcome::Unchanged { .. }));
    }

    #[tokio::test]
    async fn test_provider_http_error_is_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let manager = manager_with(Some(server.uri()), Duration::from_secs(600));
        let outcome = manager.rotate_binding("2.76.176.224").await;
        assert!(matches!(outcome, RotateOutcome::Unchanged { .. }));
    }
}
