use crate::engine::notifier::LeaderNotifier;
use std::fmt;

/// Where a candidate stands in the election.
///
/// ```text
/// Unknown ──> Follower <──> Leader
///    │           │            │
///    └───────────┴────────────┴──> Closed
/// ```
///
/// `Closed` is terminal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElectionState {
    /// The lock has not been observed yet.
    Unknown,
    Follower,
    Leader,
    /// The candidate resigned.
    Closed,
}

impl ElectionState {
    pub fn is_leader(&self) -> bool {
        *self == ElectionState::Leader
    }

    pub fn is_closed(&self) -> bool {
        *self == ElectionState::Closed
    }

    fn can_transition_to(&self, next: ElectionState) -> bool {
        match (self, next) {
            (ElectionState::Closed, _) => false,
            (_, ElectionState::Unknown) => false,
            _ => true,
        }
    }
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectionState::Unknown => write!(f, "Unknown"),
            ElectionState::Follower => write!(f, "Follower"),
            ElectionState::Leader => write!(f, "Leader"),
            ElectionState::Closed => write!(f, "Closed"),
        }
    }
}

/// ElectionTracker holds the current `ElectionState` and tells listeners when the leader flag
/// flips. It knows nothing about the store; callers decide "when", this decides "what".
pub(crate) struct ElectionTracker {
    state: ElectionState,
    notifier: LeaderNotifier,
}

impl ElectionTracker {
    pub(crate) fn new() -> Self {
        ElectionTracker {
            state: ElectionState::Unknown,
            notifier: LeaderNotifier::new(),
        }
    }

    pub(crate) fn current_state(&self) -> ElectionState {
        self.state
    }

    pub(crate) fn notifier_mut(&mut self) -> &mut LeaderNotifier {
        &mut self.notifier
    }

    /// Returns false if the transition isn't allowed from the current state, in which case
    /// nothing changes. Listeners hear about it only when the leader flag actually flips.
    pub(crate) fn transition_to(&mut self, next: ElectionState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }

        let was_leader = self.state.is_leader();
        self.state = next;
        if was_leader != next.is_leader() {
            self.notifier.notify(next.is_leader());
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_is_terminal() {
        let mut tracker = ElectionTracker::new();

        assert!(tracker.transition_to(ElectionState::Closed));
        assert!(!tracker.transition_to(ElectionState::Leader));
        assert!(!tracker.transition_to(ElectionState::Follower));
        assert_eq!(tracker.current_state(), ElectionState::Closed);
    }

    #[test]
    fn cannot_go_back_to_unknown() {
        let mut tracker = ElectionTracker::new();

        assert!(tracker.transition_to(ElectionState::Follower));
        assert!(!tracker.transition_to(ElectionState::Unknown));
        assert_eq!(tracker.current_state(), ElectionState::Follower);
    }

    #[test]
    fn notifies_only_on_leader_flag_change() {
        let mut tracker = ElectionTracker::new();
        let (_, mut listener) = tracker.notifier_mut().register(Some("l"));

        // Unknown -> Follower doesn't flip the flag.
        tracker.transition_to(ElectionState::Follower);
        assert_eq!(listener.try_next(), None);

        tracker.transition_to(ElectionState::Leader);
        tracker.transition_to(ElectionState::Leader);
        assert_eq!(listener.try_next(), Some(true));
        assert_eq!(listener.try_next(), None);

        tracker.transition_to(ElectionState::Closed);
        assert_eq!(listener.try_next(), Some(false));
    }
}
