use crate::engine::election_state::{ElectionState, ElectionTracker};
use crate::engine::notifier::LeaderChangeListener;
use crate::store::SessionRequest;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Duration;

/// Immutable parameters of a candidate, fixed at construction.
pub(crate) struct CandidateParams {
    pub id: String,
    pub lock_key: String,
    /// The TTL as requested by the caller, before clamping.
    pub session_ttl: Duration,
    pub keep_alive_interval: Duration,
    pub long_poll_wait: Duration,
    /// Used for the initial session and every replacement.
    pub session_request: SessionRequest,
}

/// CandidateState is everything the keep-alive and lock-runner tasks share. All mutable fields
/// live behind one mutex, which is only ever held for in-memory reads and writes; never across
/// a store call.
pub(crate) struct CandidateState<S> {
    pub store: Arc<S>,
    pub params: CandidateParams,
    guarded: Mutex<Guarded>,
}

struct Guarded {
    session_id: String,
    election: ElectionTracker,
}

impl<S> CandidateState<S> {
    pub(crate) fn new(store: Arc<S>, params: CandidateParams, session_id: String) -> Self {
        CandidateState {
            store,
            params,
            guarded: Mutex::new(Guarded {
                session_id,
                election: ElectionTracker::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Guarded> {
        self.guarded.lock().expect("CandidateState mutex guard poison")
    }

    pub(crate) fn session_id(&self) -> String {
        self.lock().session_id.clone()
    }

    /// CAS: swaps in `new_session_id` iff the current session is still `expected` and we're not
    /// closed. Returns true if we mutated state.
    pub(crate) fn replace_session_id(&self, expected: &str, new_session_id: String) -> bool {
        let mut guarded = self.lock();
        if guarded.session_id != expected || guarded.election.current_state().is_closed() {
            return false;
        }

        guarded.session_id = new_session_id;
        true
    }

    pub(crate) fn election_state(&self) -> ElectionState {
        self.lock().election.current_state()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.election_state().is_closed()
    }

    pub(crate) fn mark_leader(&self) {
        self.lock().election.transition_to(ElectionState::Leader);
    }

    pub(crate) fn mark_follower(&self) {
        self.lock().election.transition_to(ElectionState::Follower);
    }

    /// Returns false if we were already closed.
    pub(crate) fn close(&self) -> bool {
        self.lock().election.transition_to(ElectionState::Closed)
    }

    pub(crate) fn register_update(&self, id: Option<&str>) -> (String, LeaderChangeListener) {
        self.lock().election.notifier_mut().register(id)
    }

    pub(crate) fn deregister_update(&self, id: &str) {
        self.lock().election.notifier_mut().deregister(id);
    }

    pub(crate) fn deregister_all(&self) {
        self.lock().election.notifier_mut().deregister_all();
    }
}
