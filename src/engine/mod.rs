//! The election engine: shared candidate state, the two background tasks that drive it, and the
//! leadership notifier.
mod election_state;
mod lock_runner;
mod notifier;
mod session;
mod shared;

pub use election_state::ElectionState;
pub use notifier::LeaderChangeListener;

pub(crate) use lock_runner::LockRunnerTask;
pub(crate) use session::SessionKeepAliveTask;
pub(crate) use shared::CandidateParams;
pub(crate) use shared::CandidateState;
