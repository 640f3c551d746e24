use crate::api::session_name::{parse_session_name, ParseSessionNameError};
use crate::api::wiring::{try_create_candidate, CandidateConfig, CandidateCreationError};
use crate::engine::{CandidateState, ElectionState, LeaderChangeListener};
use crate::store::{QueryOptions, SessionEntry, Store, StoreError};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;

const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Candidate is this process's participant in an election over a single lock key.
///
/// While alive, two background tasks run on the tokio runtime: one keeps the candidate's session
/// alive (rebuilding it if the store lost it), the other watches the lock and takes it whenever it
/// becomes free. Use `elected()` or `register_update()` to learn whether we're leader.
///
/// Dropping a candidate without calling `resign()` still winds it down, just without waiting.
pub struct Candidate<S> {
    state: Arc<CandidateState<S>>,
    logger: slog::Logger,
    tasks: Mutex<Option<CandidateTasks>>,
}

struct CandidateTasks {
    keep_alive: JoinHandle<()>,
    lock_runner: JoinHandle<()>,
}

#[derive(Debug, thiserror::Error)]
pub enum LeaderLookupError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("kv \"{key}\" not found in datacenter \"{datacenter}\"")]
    KeyNotFound { key: String, datacenter: String },
    #[error("kv \"{key}\" has no session in datacenter \"{datacenter}\"")]
    NoSession { key: String, datacenter: String },
    #[error("Unable to parse leader session name: {0}")]
    SessionName(#[from] ParseSessionNameError),
    #[error("Unable to parse IP address from \"{0}\"")]
    InvalidIp(String),
}

impl<S: Store + 'static> Candidate<S> {
    /// See `try_create_candidate()`.
    pub async fn new(store: Arc<S>, config: CandidateConfig) -> Result<Self, CandidateCreationError> {
        try_create_candidate(store, config).await
    }

    pub(super) fn from_parts(
        state: Arc<CandidateState<S>>,
        logger: slog::Logger,
        keep_alive: JoinHandle<()>,
        lock_runner: JoinHandle<()>,
    ) -> Self {
        Candidate {
            state,
            logger,
            tasks: Mutex::new(Some(CandidateTasks { keep_alive, lock_runner })),
        }
    }

    pub fn id(&self) -> &str {
        &self.state.params.id
    }

    pub fn lock_key(&self) -> &str {
        &self.state.params.lock_key
    }

    /// Current session. This changes if the session had to be rebuilt.
    pub fn session_id(&self) -> String {
        self.state.session_id()
    }

    /// The TTL as it was requested, not the clamped value sent to the store.
    pub fn session_ttl(&self) -> Duration {
        self.state.params.session_ttl
    }

    pub fn session_name(&self) -> &str {
        &self.state.params.session_request.name
    }

    /// True if this candidate's session holds the lock.
    pub fn elected(&self) -> bool {
        self.state.election_state().is_leader()
    }

    pub fn state(&self) -> ElectionState {
        self.state.election_state()
    }

    /// Returns a listener for changes in this candidate's leader status. Without an id, a random
    /// one is assigned. At most one notification is queued per listener; newer ones are dropped
    /// until it has been consumed.
    pub fn register_update(&self, id: Option<&str>) -> (String, LeaderChangeListener) {
        self.state.register_update(id)
    }

    pub fn deregister_update(&self, id: &str) {
        self.state.deregister_update(id);
    }

    pub fn deregister_updates(&self) {
        self.state.deregister_all();
    }

    /// Blocks until some candidate, not necessarily this one, holds the lock. Polls once a second,
    /// forever.
    pub async fn wait(&self) {
        loop {
            if self.leader_service().await.is_ok() {
                return;
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Leaves the election and waits for both background tasks to exit. The session is destroyed
    /// on the way out, which releases the lock if we held it.
    ///
    /// Shutdown is cooperative: the tasks only notice at their next wake-up, so this can take up
    /// to one blocking read of the lock (the clamped session TTL) plus one keep-alive interval.
    /// Calling it again is a no-op.
    pub async fn resign(&self) {
        if !self.state.close() {
            slog::debug!(self.logger, "Resign called while not in election pool");
            return;
        }
        slog::debug!(self.logger, "Resigning candidacy, waiting for tasks to exit");

        let tasks = self.tasks.lock().expect("Candidate.tasks mutex guard poison").take();
        if let Some(tasks) = tasks {
            let (keep_alive, lock_runner) = tokio::join!(tasks.keep_alive, tasks.lock_runner);
            if let Err(e) = keep_alive {
                slog::warn!(self.logger, "Keep-alive task failed: {}", e);
            }
            if let Err(e) = lock_runner {
                slog::warn!(self.logger, "Lock runner task failed: {}", e);
            }
        }

        slog::info!(self.logger, "Candidacy resigned. We're no longer in the running.");
    }

    /// Same as `leader_service()`.
    pub async fn leader(&self) -> Result<SessionEntry, LeaderLookupError> {
        self.leader_service().await
    }

    /// Session of whoever currently holds the lock, in the local datacenter.
    pub async fn leader_service(&self) -> Result<SessionEntry, LeaderLookupError> {
        self.lookup_leader(None).await
    }

    /// Session of whoever currently holds the lock in `datacenter`. An empty name means local.
    pub async fn foreign_leader_service(&self, datacenter: &str) -> Result<SessionEntry, LeaderLookupError> {
        let datacenter = Some(datacenter).filter(|dc| !dc.is_empty());
        self.lookup_leader(datacenter).await
    }

    /// Leader's candidate id interpreted as an IP address. Only useful if candidates use their IP
    /// as id.
    pub async fn leader_ip(&self) -> Result<IpAddr, LeaderLookupError> {
        self.foreign_leader_ip("").await
    }

    pub async fn foreign_leader_ip(&self, datacenter: &str) -> Result<IpAddr, LeaderLookupError> {
        let leader = self.foreign_leader_service(datacenter).await?;
        let parts = parse_session_name(&leader.name)?;

        parts
            .id
            .parse()
            .map_err(|_| LeaderLookupError::InvalidIp(parts.id.clone()))
    }

    async fn lookup_leader(&self, datacenter: Option<&str>) -> Result<SessionEntry, LeaderLookupError> {
        let key = &self.state.params.lock_key;
        let options = QueryOptions::in_datacenter(datacenter);

        let (entry, _) = self.state.store.get(key, &options).await?;
        let entry = entry.ok_or_else(|| LeaderLookupError::KeyNotFound {
            key: key.clone(),
            datacenter: datacenter.unwrap_or_default().to_string(),
        })?;

        let session = match entry.session {
            Some(session) if !session.is_empty() => self.state.store.session_info(&session, &options).await?,
            _ => None,
        };

        session.ok_or_else(|| LeaderLookupError::NoSession {
            key: key.clone(),
            datacenter: datacenter.unwrap_or_default().to_string(),
        })
    }
}

impl<S> Drop for Candidate<S> {
    fn drop(&mut self) {
        if self.state.close() {
            slog::debug!(self.logger, "Candidate dropped without resigning, tasks will exit on their own");
        }
    }
}
