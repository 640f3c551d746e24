use crate::api::candidate::Candidate;
use crate::api::candidate_id::{validate_candidate_id, VALID_CANDIDATE_ID_PATTERN};
use crate::api::options::{CandidateOptions, CandidateOptionsValidated};
use crate::api::session_name::new_session_name;
use crate::engine::{CandidateParams, CandidateState, LockRunnerTask, SessionKeepAliveTask};
use crate::store::{SessionRequest, Store, StoreError};
use std::convert::TryFrom;
use std::sync::Arc;

pub struct CandidateConfig {
    /// Implementation-relevant identifier, must match `[A-Za-z0-9:._-]+`. Surrounding whitespace
    /// is trimmed.
    ///
    /// The id ends up as a field of the `-`-separated session name. An id containing `-` is
    /// accepted, but the resulting name no longer parses with `parse_session_name()`, so
    /// `Candidate::leader_ip()` fails for such a leader. Use IPs or `-`-free ids if you need it.
    pub id: String,
    /// Full path of the contested key. It's created if it doesn't exist yet.
    pub lock_key: String,
    pub logger: slog::Logger,
    pub options: CandidateOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum CandidateCreationError {
    #[error("Candidate ID must obey \"{pattern}\", got \"{id}\"")]
    InvalidId { id: String, pattern: &'static str },
    #[error("Invalid session TTL: {0}")]
    InvalidTtl(String),
    #[error("Unable to determine local node name")]
    NodeName(#[source] StoreError),
    #[error("Unable to create session")]
    SessionCreation(#[source] StoreError),
}

/// Validates `config`, creates the candidate's session and starts the keep-alive and lock runner
/// tasks. Nothing is sent to the store if validation fails.
pub async fn try_create_candidate<S>(store: Arc<S>, config: CandidateConfig) -> Result<Candidate<S>, CandidateCreationError>
where
    S: Store + 'static,
{
    let id = validate_candidate_id(&config.id).ok_or_else(|| CandidateCreationError::InvalidId {
        id: config.id.clone(),
        pattern: VALID_CANDIDATE_ID_PATTERN,
    })?;
    let options = CandidateOptionsValidated::try_from(config.options).map_err(CandidateCreationError::InvalidTtl)?;

    let logger = config
        .logger
        .new(slog::o!("candidate" => id.clone(), "key" => config.lock_key.clone()));

    let node_name = store.node_name().await.map_err(CandidateCreationError::NodeName)?;

    let session_request = SessionRequest {
        name: new_session_name(&id, &node_name),
        ttl: options.wire_session_ttl.clone(),
        behavior: options.session_behavior,
    };
    slog::debug!(
        logger,
        "Session name \"{}\", TTL \"{}\"",
        session_request.name,
        session_request.ttl
    );

    let session_id = store
        .create_session(&session_request)
        .await
        .map_err(CandidateCreationError::SessionCreation)?;
    slog::debug!(logger, "Session created with id \"{}\"", session_id);

    let params = CandidateParams {
        id,
        lock_key: config.lock_key,
        session_ttl: options.session_ttl,
        keep_alive_interval: options.keep_alive_interval,
        long_poll_wait: options.long_poll_wait,
        session_request,
    };
    let state = Arc::new(CandidateState::new(store, params, session_id));

    let keep_alive = SessionKeepAliveTask::new(state.clone(), logger.new(slog::o!("task" => "keep_alive")));
    let lock_runner = LockRunnerTask::new(state.clone(), logger.new(slog::o!("task" => "lock_runner")));
    let keep_alive_handle = tokio::spawn(keep_alive.run());
    let lock_runner_handle = tokio::spawn(lock_runner.run());

    Ok(Candidate::from_parts(state, logger, keep_alive_handle, lock_runner_handle))
}
