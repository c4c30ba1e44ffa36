use crate::engine::pool::PoolError;
use crate::proxy::EgressConfig;
use reqwest::Client;
use std::time::Duration;

/// One reusable scraping session
///
/// Wraps an HTTP client with its own cookie store, user agent and egress
/// wiring. A session is exclusively owned: it lives in the pool's idle list
/// or inside exactly one in-flight parse, never both.
pub struct ParserSession {
    id: u64,
    client: Client,
}

impl ParserSession {
    pub(crate) fn new(
        id: u64,
        user_agent: &str,
        timeout: Duration,
        egress: Option<&EgressConfig>,
    ) -> Result<Self, PoolError> {
        let mut builder = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .cookie_store(true)
            .gzip(true)
            .brotli(true);

        if let Some(egress) = egress {
            let mut proxy = reqwest::Proxy::all(&egress.server)?;
            if let (Some(username), Some(password)) = (&egress.username, &egress.password) {
                proxy = proxy.basic_auth(username, password);
            }
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            id,
            client: builder.build()?,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The HTTP client adapters issue requests through
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl std::fmt::Debug for ParserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserSession").field("id", &self.id).finish()
    }
}
