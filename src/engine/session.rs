use crate::engine::shared::CandidateState;
use crate::store::Store;
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};

/// SessionKeepAliveTask keeps the candidate's session alive until the candidate is closed, then
/// destroys it. Store failures never stop the task, they're retried on the next tick.
pub(crate) struct SessionKeepAliveTask<S> {
    state: Arc<CandidateState<S>>,
    logger: slog::Logger,
}

impl<S: Store + 'static> SessionKeepAliveTask<S> {
    pub(crate) fn new(state: Arc<CandidateState<S>>, logger: slog::Logger) -> Self {
        SessionKeepAliveTask { state, logger }
    }

    pub(crate) async fn run(self) {
        let period = self.state.params.keep_alive_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if self.state.is_closed() {
                self.destroy_session().await;
                slog::debug!(self.logger, "Keep-alive exiting");
                return;
            }

            validate_session(&self.state, &self.logger).await;
        }
    }

    async fn destroy_session(&self) {
        let session_id = self.state.session_id();
        if let Err(e) = self.state.store.destroy_session(&session_id).await {
            // It will expire on its own once the TTL runs out.
            slog::warn!(self.logger, "Failed to destroy session {}: {}", session_id, e);
        }
    }
}

/// Renews the current session. If that fails for any reason, a replacement session is created
/// with the same parameters and swapped in.
///
/// The swap only happens if nobody else replaced the session in the meantime and the candidate
/// isn't closed; otherwise the replacement is destroyed right away.
pub(crate) async fn validate_session<S: Store>(state: &CandidateState<S>, logger: &slog::Logger) {
    let stale_session_id = state.session_id();

    match state.store.renew_session(&stale_session_id).await {
        Ok(Some(_)) => return,
        Ok(None) => {
            slog::warn!(logger, "Failed to renew session {}: not found", stale_session_id);
        }
        Err(e) => {
            slog::warn!(logger, "Failed to renew session {}: {}", stale_session_id, e);
            if let Err(e) = state.store.destroy_session(&stale_session_id).await {
                slog::debug!(logger, "Failed to destroy stale session {}: {}", stale_session_id, e);
            }
        }
    }

    let new_session_id = match state.store.create_session(&state.params.session_request).await {
        Ok(session_id) => session_id,
        Err(e) => {
            slog::error!(logger, "Failed to rebuild session: {}", e);
            return;
        }
    };

    if state.replace_session_id(&stale_session_id, new_session_id.clone()) {
        slog::debug!(logger, "Registered new session {}", new_session_id);
    } else {
        slog::debug!(
            logger,
            "Session {} was already replaced, discarding {}",
            stale_session_id,
            new_session_id
        );
        if let Err(e) = state.store.destroy_session(&new_session_id).await {
            slog::debug!(logger, "Failed to destroy discarded session {}: {}", new_session_id, e);
        }
    }
}
