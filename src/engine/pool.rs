//! Bounded parser session pool
//!
//! Caps the number of concurrently active scraping sessions at a fixed
//! capacity. Sessions are created lazily up to the cap, reused across
//! parses, and discarded only when their handle is unusable — capacity is
//! governed solely by semaphore permits, so a discarded session is replaced
//! on a later acquire without any bookkeeping.

use crate::engine::session::ParserSession;
use crate::proxy::ProxyManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Errors surfaced by the pool
///
/// `Closed` is the only failure callers see in steady state; it is handed to
/// every waiter when the pool shuts down.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("parser pool is shut down")]
    Closed,

    #[error("failed to initialize parser session: {0}")]
    Session(#[from] reqwest::Error),
}

/// Bounded pool of reusable parser sessions
pub struct ParserPool {
    semaphore: Arc<Semaphore>,
    idle: Mutex<Vec<ParserSession>>,
    next_id: AtomicU64,
    capacity: usize,
    user_agent: String,
    parse_timeout: Duration,
    proxy: Arc<ProxyManager>,
}

impl ParserPool {
    pub fn new(
        capacity: usize,
        user_agent: String,
        parse_timeout: Duration,
        proxy: Arc<ProxyManager>,
    ) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            idle: Mutex::new(Vec::with_capacity(capacity)),
            next_id: AtomicU64::new(1),
            capacity,
            user_agent,
            parse_timeout,
            proxy,
        }
    }

    /// Borrows a session, suspending while the pool is at capacity
    ///
    /// Reuses an idle session when one exists, otherwise builds a fresh one.
    /// The returned guard gives the session back on drop — on every path,
    /// including cancellation — unless it was marked unhealthy first.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledSession, PoolError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let reused = self.idle.lock().unwrap().pop();
        let session = match reused {
            Some(session) => session,
            None => self.build_session()?,
        };

        tracing::trace!("Borrowed parser session {}", session.id());
        Ok(PooledSession {
            session: Some(session),
            pool: Arc::clone(self),
            healthy: true,
            _permit: permit,
        })
    }

    /// Shuts the pool down
    ///
    /// All pending and future `acquire` calls return [`PoolError::Closed`];
    /// idle sessions are dropped immediately.
    pub fn close(&self) {
        self.semaphore.close();
        self.idle.lock().unwrap().clear();
        tracing::debug!("Parser pool closed");
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of sessions currently parked in the pool
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().len()
    }

    /// Free capacity; equals `capacity` when nothing is borrowed
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    fn build_session(&self) -> Result<ParserSession, PoolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let egress = self.proxy.egress_config();
        let session = ParserSession::new(id, &self.user_agent, self.parse_timeout, egress.as_ref())?;
        tracing::debug!("Created parser session {}", id);
        Ok(session)
    }

    fn release(&self, session: ParserSession, healthy: bool) {
        if healthy {
            tracing::trace!("Returned parser session {}", session.id());
            self.idle.lock().unwrap().push(session);
        } else {
            tracing::warn!("Discarding crashed parser session {}", session.id());
        }
    }
}

/// RAII guard for a borrowed session
///
/// Holds the semaphore permit for the borrow's lifetime; dropping the guard
/// returns the session and frees the permit in that order, so a woken waiter
/// finds the session already parked.
pub struct PooledSession {
    session: Option<ParserSession>,
    pool: Arc<ParserPool>,
    healthy: bool,
    _permit: OwnedSemaphorePermit,
}

impl PooledSession {
    pub fn session(&self) -> &ParserSession {
        // The Option is only emptied in Drop.
        self.session.as_ref().expect("session taken before drop")
    }

    pub fn id(&self) -> u64 {
        self.session().id()
    }

    /// Flags the underlying handle as unusable
    ///
    /// The session will be discarded instead of returned; the pool rebuilds
    /// capacity lazily on a later acquire.
    pub fn mark_unhealthy(&mut self) {
        self.healthy = false;
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.release(session, self.healthy);
        }
    }
}
