use rand::Rng;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// LeaderNotifier is the registry of parties interested in this candidate's leadership changes.
///
/// Each listener owns a queue with room for exactly one value. Sends never block: if a listener
/// hasn't consumed its previous notification, the new one is dropped. So a listener is promised
/// at most one pending notification, not delivery of every transition.
pub(crate) struct LeaderNotifier {
    listeners: HashMap<String, mpsc::Sender<bool>>,
}

impl LeaderNotifier {
    pub(crate) fn new() -> Self {
        LeaderNotifier {
            listeners: HashMap::new(),
        }
    }

    /// Registering an id that is already registered replaces its queue, which disconnects the
    /// previously returned listener.
    pub(crate) fn register(&mut self, id: Option<&str>) -> (String, LeaderChangeListener) {
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => random_listener_id(),
        };
        let (snd, rcv) = mpsc::channel(1);
        self.listeners.insert(id.clone(), snd);

        (id.clone(), LeaderChangeListener { id, rcv })
    }

    pub(crate) fn deregister(&mut self, id: &str) {
        self.listeners.remove(id);
    }

    pub(crate) fn deregister_all(&mut self) {
        self.listeners.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn notify(&mut self, is_leader: bool) {
        self.listeners.retain(|_, snd| match snd.try_send(is_leader) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => true,
            // Listener was dropped, nobody will ever read this queue again.
            Err(TrySendError::Closed(_)) => false,
        });
    }
}

fn random_listener_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Receiving end of a leadership-change registration. `true` means this candidate became leader,
/// `false` means it stopped being leader.
#[derive(Debug)]
pub struct LeaderChangeListener {
    id: String,
    rcv: mpsc::Receiver<bool>,
}

impl LeaderChangeListener {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for the next leadership change. Returns `None` once this listener has been
    /// deregistered (or replaced) and its pending notification, if any, has been consumed.
    pub async fn next(&mut self) -> Option<bool> {
        self.rcv.recv().await
    }

    /// Returns a pending notification without waiting.
    pub fn try_next(&mut self) -> Option<bool> {
        self.rcv.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_assigns_random_id_when_missing() {
        let mut notifier = LeaderNotifier::new();

        let (id1, listener1) = notifier.register(None);
        let (id2, _) = notifier.register(Some(""));
        let (id3, _) = notifier.register(Some("mine"));

        assert_eq!(id1.len(), 16);
        assert_eq!(listener1.id(), id1);
        assert_ne!(id1, id2);
        assert_eq!(id3, "mine");
        assert_eq!(notifier.len(), 3);
    }

    #[test]
    fn full_queue_keeps_first_pending_value() {
        let mut notifier = LeaderNotifier::new();
        let (_, mut listener) = notifier.register(Some("a"));

        notifier.notify(true);
        notifier.notify(false);

        assert_eq!(listener.try_next(), Some(true));
        assert_eq!(listener.try_next(), None);

        notifier.notify(false);
        assert_eq!(listener.try_next(), Some(false));
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let mut notifier = LeaderNotifier::new();
        let (_, listener) = notifier.register(Some("a"));
        let (_, _keep) = notifier.register(Some("b"));
        drop(listener);

        notifier.notify(true);

        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn deregister_closes_listener() {
        let mut notifier = LeaderNotifier::new();
        let (_, mut a) = notifier.register(Some("a"));
        let (_, mut b) = notifier.register(Some("b"));

        notifier.notify(true);
        notifier.deregister("a");
        assert_eq!(a.next().await, Some(true));
        assert_eq!(a.next().await, None);

        notifier.deregister_all();
        assert_eq!(b.next().await, Some(true));
        assert_eq!(b.next().await, None);
        assert_eq!(notifier.len(), 0);
    }
}
