use kv_election::{
    Candidate, CandidateConfig, CandidateOptions, InMemoryStore, KvEntry, LeaderChangeListener, QueryMeta,
    QueryOptions, SessionEntry, SessionRequest, Store, StoreError,
};
use slog::Drain;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

pub const LOCK_KEY: &str = "kv-election/tests/candidate-lock";
pub const LOCK_TTL: &str = "10s";

pub fn create_test_logger(name: &str) -> slog::Logger {
    let decorator = slog_term::PlainSyncDecorator::new(slog_term::TestStdoutWriter);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();

    slog::Logger::root(drain, slog::o!("test" => name.to_string()))
}

pub fn config(id: &str, logger: &slog::Logger) -> CandidateConfig {
    CandidateConfig {
        id: id.to_string(),
        lock_key: LOCK_KEY.to_string(),
        logger: logger.clone(),
        options: CandidateOptions {
            session_ttl: Some(LOCK_TTL.to_string()),
            ..CandidateOptions::default()
        },
    }
}

pub async fn make_candidate<S: Store + 'static>(store: &Arc<S>, id: &str, logger: &slog::Logger) -> Candidate<S> {
    Candidate::new(store.clone(), config(id, logger))
        .await
        .expect("candidate creation")
}

/// Everything in these tests runs on paused time, so this is a bound on simulated time, not on
/// how long the test takes.
pub async fn with_sanity_timeout<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(120), future)
        .await
        .expect("Unexpected timeout")
}

/// Polls until some candidate is elected, asserting at every sample that no two are.
pub async fn wait_for_single_leader<S: Store + 'static>(candidates: &[&Candidate<S>]) -> usize {
    with_sanity_timeout(async {
        loop {
            let elected: Vec<usize> = candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.elected())
                .map(|(i, _)| i)
                .collect();
            assert!(elected.len() <= 1, "More than one leader: {:?}", elected);

            if let Some(i) = elected.first() {
                return *i;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
}

/// Applies every pending notification to `flags` (one flag per listener, true while that
/// candidate last heard it is leader) and asserts that no two flags are up at once. Returns the
/// index of the candidate whose flag is up, if any.
pub fn drain_leader_flags(listeners: &mut [LeaderChangeListener], flags: &mut [bool]) -> Option<usize> {
    for (listener, flag) in listeners.iter_mut().zip(flags.iter_mut()) {
        while let Some(is_leader) = listener.try_next() {
            *flag = is_leader;
        }
    }

    let up: Vec<usize> = flags.iter().enumerate().filter(|(_, f)| **f).map(|(i, _)| i).collect();
    assert!(up.len() <= 1, "Notifications claim more than one leader: {:?}", up);
    up.first().copied()
}

/// FlakyStore passes everything through to an `InMemoryStore`, unless told to fail.
pub struct FlakyStore {
    inner: InMemoryStore,
    failing: AtomicBool,
    get_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        FlakyStore {
            inner: InMemoryStore::new(),
            failing: AtomicBool::new(false),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::Acquire) {
            Err(StoreError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Store for FlakyStore {
    async fn node_name(&self) -> Result<String, StoreError> {
        self.check()?;
        self.inner.node_name().await
    }

    async fn create_session(&self, request: &SessionRequest) -> Result<String, StoreError> {
        self.check()?;
        self.inner.create_session(request).await
    }

    async fn renew_session(&self, session_id: &str) -> Result<Option<SessionEntry>, StoreError> {
        self.check()?;
        self.inner.renew_session(session_id).await
    }

    async fn destroy_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.destroy_session(session_id).await
    }

    async fn session_info(
        &self,
        session_id: &str,
        options: &QueryOptions,
    ) -> Result<Option<SessionEntry>, StoreError> {
        self.check()?;
        self.inner.session_info(session_id, options).await
    }

    async fn get(&self, key: &str, options: &QueryOptions) -> Result<(Option<KvEntry>, QueryMeta), StoreError> {
        self.get_calls.fetch_add(1, Ordering::AcqRel);
        self.check()?;
        self.inner.get(key, options).await
    }

    async fn acquire(&self, key: &str, session_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.acquire(key, session_id).await
    }
}
