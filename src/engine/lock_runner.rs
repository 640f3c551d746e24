use crate::engine::session::validate_session;
use crate::engine::shared::CandidateState;
use crate::store::{KvEntry, QueryOptions, Store};
use std::sync::Arc;
use tokio::time::Duration;

/// Upper bound, in seconds, on the wait between failed reads of the lock. The wait grows by one
/// second per consecutive failure.
pub(crate) const MAX_RETRY_WAIT_SECS: u64 = 10;

/// What a single read of the lock entry told us.
#[derive(Debug, Eq, PartialEq)]
enum LockObservation {
    HeldByUs,
    HeldByOther,
    Free,
    /// We couldn't tell who holds it.
    Unresolved,
}

/// LockRunnerTask is the election loop. It blocks on the lock entry until it changes, decides
/// whether we're leader or follower, and tries to take the lock whenever it looks free.
///
/// The blocking read is the only place this task waits on the store for long. It never gets
/// interrupted; the loop notices that the candidate was closed after the read returns.
pub(crate) struct LockRunnerTask<S> {
    state: Arc<CandidateState<S>>,
    logger: slog::Logger,
    wait_index: u64,
    retry_wait_secs: u64,
}

impl<S: Store + 'static> LockRunnerTask<S> {
    pub(crate) fn new(state: Arc<CandidateState<S>>, logger: slog::Logger) -> Self {
        LockRunnerTask {
            state,
            logger,
            wait_index: 0,
            retry_wait_secs: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let options = QueryOptions {
                datacenter: None,
                wait_index: self.wait_index,
                wait_time: Some(self.state.params.long_poll_wait),
            };

            let (entry, meta) = match self.state.store.get(&self.state.params.lock_key, &options).await {
                Ok(result) => result,
                Err(e) => {
                    if self.retry_wait_secs < MAX_RETRY_WAIT_SECS {
                        self.retry_wait_secs += 1;
                    }
                    slog::warn!(
                        self.logger,
                        "Error checking lock: {}. Retrying in {}s.",
                        e,
                        self.retry_wait_secs
                    );
                    tokio::time::sleep(Duration::from_secs(self.retry_wait_secs)).await;
                    continue;
                }
            };
            self.retry_wait_secs = 0;

            if self.state.is_closed() {
                slog::debug!(self.logger, "Lock runner exiting");
                return;
            }

            // Even if we fail below, don't block on a state we've already seen.
            self.wait_index = meta.last_index;

            self.handle_lock_entry(entry).await;
        }
    }

    async fn handle_lock_entry(&self, entry: Option<KvEntry>) {
        let session_id = self.state.session_id();

        match self.observe(entry, &session_id).await {
            LockObservation::HeldByUs => self.state.mark_leader(),
            LockObservation::HeldByOther => self.state.mark_follower(),
            LockObservation::Unresolved => validate_session(&self.state, &self.logger).await,
            LockObservation::Free => {
                self.state.mark_follower();
                self.try_acquire(&session_id).await;
            }
        }
    }

    async fn observe(&self, entry: Option<KvEntry>, my_session_id: &str) -> LockObservation {
        let holder = match entry.and_then(|e| e.session) {
            Some(holder) if !holder.is_empty() => holder,
            _ => return LockObservation::Free,
        };

        if holder == my_session_id {
            return LockObservation::HeldByUs;
        }

        match self.state.store.session_info(&holder, &QueryOptions::default()).await {
            Ok(Some(_)) => LockObservation::HeldByOther,
            // Holder's session is gone. Its lock will be (or already was) released by the store.
            Ok(None) => LockObservation::Free,
            Err(e) => {
                slog::warn!(self.logger, "Error fetching session {}: {}", holder, e);
                LockObservation::Unresolved
            }
        }
    }

    async fn try_acquire(&self, session_id: &str) {
        slog::debug!(self.logger, "Lock looks free, attempting to acquire it");

        match self.state.store.acquire(&self.state.params.lock_key, session_id).await {
            Ok(true) => {
                slog::info!(self.logger, "Acquired lock with session {}", session_id);
                self.state.mark_leader();
            }
            Ok(false) => {
                slog::debug!(self.logger, "Lost the race for the lock");
            }
            Err(e) => {
                slog::warn!(self.logger, "Failed to acquire lock: {}", e);
                validate_session(&self.state, &self.logger).await;
            }
        }
    }
}
