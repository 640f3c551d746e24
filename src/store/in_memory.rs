use crate::store::{
    KvEntry, QueryMeta, QueryOptions, SessionBehavior, SessionEntry, SessionRequest, Store, StoreError,
};
use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};

const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(300);
const MAX_WAIT_TIME: Duration = Duration::from_secs(600);

/// InMemoryStore is a single-node, single-datacenter `Store` living inside the process. It keeps
/// the semantics that elections depend on (a global modify index, blocking reads, TTL sessions
/// and their invalidation behavior) without any of the durability.
///
/// Session expiry is lazy: expired sessions are reaped at the start of every operation.
pub struct InMemoryStore {
    node_name: String,
    datacenter: String,
    state: Mutex<StoreState>,
    index_tx: watch::Sender<u64>,
}

struct StoreState {
    index: u64,
    sessions: HashMap<String, SessionRecord>,
    kv: HashMap<String, KvEntry>,
}

struct SessionRecord {
    entry: SessionEntry,
    ttl: Duration,
    expires_at: Instant,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_names("node1", "dc1")
    }

    pub fn with_names(node_name: impl Into<String>, datacenter: impl Into<String>) -> Self {
        let (index_tx, _) = watch::channel(0);

        InMemoryStore {
            node_name: node_name.into(),
            datacenter: datacenter.into(),
            state: Mutex::new(StoreState {
                index: 0,
                sessions: HashMap::new(),
                kv: HashMap::new(),
            }),
            index_tx,
        }
    }

    pub fn datacenter(&self) -> &str {
        &self.datacenter
    }

    /// Writes `value` to `key` without touching its lock.
    pub fn put(&self, key: &str, value: Bytes) {
        self.with_state(|state| {
            let index = state.bump_index();
            match state.kv.get_mut(key) {
                Some(entry) => {
                    entry.value = value;
                    entry.modify_index = index;
                }
                None => {
                    state.kv.insert(
                        key.to_string(),
                        KvEntry {
                            key: key.to_string(),
                            value,
                            session: None,
                            create_index: index,
                            modify_index: index,
                            lock_index: 0,
                        },
                    );
                }
            }
        })
    }

    /// Session currently holding the lock on `key`.
    pub fn lock_holder(&self, key: &str) -> Option<String> {
        self.with_state(|state| state.kv.get(key).and_then(|entry| entry.session.clone()))
    }

    pub fn session_count(&self) -> usize {
        self.with_state(|state| state.sessions.len())
    }

    /// Invalidates a session as if an operator (or the store itself) had killed it.
    pub fn invalidate_session(&self, session_id: &str) {
        self.with_state(|state| state.invalidate(session_id))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut StoreState) -> T) -> T {
        let (result, index) = {
            let mut state = self.state.lock().expect("InMemoryStore.state mutex guard poison");
            state.reap_expired(Instant::now());
            let result = f(&mut *state);
            (result, state.index)
        };

        self.index_tx.send_if_modified(|published| {
            if *published != index {
                *published = index;
                true
            } else {
                false
            }
        });

        result
    }

    fn check_datacenter(&self, datacenter: Option<&str>) -> Result<(), StoreError> {
        match datacenter {
            Some(dc) if !dc.is_empty() && dc != self.datacenter => Err(StoreError::UnknownDatacenter(dc.to_string())),
            _ => Ok(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreState {
    fn bump_index(&mut self) -> u64 {
        self.index += 1;
        self.index
    }

    fn reap_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, record)| record.expires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for session_id in expired {
            self.invalidate(&session_id);
        }
    }

    fn invalidate(&mut self, session_id: &str) {
        let record = match self.sessions.remove(session_id) {
            Some(record) => record,
            None => return,
        };
        let index = self.bump_index();

        match record.entry.behavior {
            SessionBehavior::Delete => {
                self.kv.retain(|_, entry| entry.session.as_deref() != Some(session_id));
            }
            SessionBehavior::Release => {
                for entry in self.kv.values_mut() {
                    if entry.session.as_deref() == Some(session_id) {
                        entry.session = None;
                        entry.modify_index = index;
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn node_name(&self) -> Result<String, StoreError> {
        Ok(self.node_name.clone())
    }

    async fn create_session(&self, request: &SessionRequest) -> Result<String, StoreError> {
        let ttl = humantime::parse_duration(&request.ttl)
            .map_err(|e| StoreError::Unavailable(format!("bad session ttl \"{}\": {}", request.ttl, e)))?;
        let session_id = random_session_id();
        let node = self.node_name.clone();

        self.with_state(|state| {
            let create_index = state.bump_index();
            let entry = SessionEntry {
                id: session_id.clone(),
                name: request.name.clone(),
                node,
                ttl: request.ttl.clone(),
                behavior: request.behavior,
                create_index,
                created_at: Utc::now(),
            };
            state.sessions.insert(
                session_id.clone(),
                SessionRecord {
                    entry,
                    ttl,
                    expires_at: Instant::now() + ttl,
                },
            );
        });

        Ok(session_id)
    }

    async fn renew_session(&self, session_id: &str) -> Result<Option<SessionEntry>, StoreError> {
        let renewed = self.with_state(|state| {
            state.sessions.get_mut(session_id).map(|record| {
                record.expires_at = Instant::now() + record.ttl;
                record.entry.clone()
            })
        });

        Ok(renewed)
    }

    async fn destroy_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.with_state(|state| state.invalidate(session_id));
        Ok(())
    }

    async fn session_info(
        &self,
        session_id: &str,
        options: &QueryOptions,
    ) -> Result<Option<SessionEntry>, StoreError> {
        self.check_datacenter(options.datacenter.as_deref())?;

        Ok(self.with_state(|state| state.sessions.get(session_id).map(|record| record.entry.clone())))
    }

    async fn get(&self, key: &str, options: &QueryOptions) -> Result<(Option<KvEntry>, QueryMeta), StoreError> {
        self.check_datacenter(options.datacenter.as_deref())?;

        // Subscribe before reading, so a write between the read and the wait isn't missed.
        let mut index_rx = self.index_tx.subscribe();
        let wait_time = options.wait_time.unwrap_or(DEFAULT_WAIT_TIME).min(MAX_WAIT_TIME);
        let deadline = Instant::now() + wait_time;

        loop {
            let (entry, index) = self.with_state(|state| (state.kv.get(key).cloned(), state.index));
            let meta = QueryMeta { last_index: index };

            if options.wait_index == 0 || index > options.wait_index {
                return Ok((entry, meta));
            }

            match tokio::time::timeout_at(deadline, index_rx.changed()).await {
                Ok(Ok(())) => continue,
                // Sender lives as long as `self`, so this can't happen while we're borrowed.
                Ok(Err(_)) => return Ok((entry, meta)),
                Err(_elapsed) => {
                    let (entry, index) = self.with_state(|state| (state.kv.get(key).cloned(), state.index));
                    return Ok((entry, QueryMeta { last_index: index }));
                }
            }
        }
    }

    async fn acquire(&self, key: &str, session_id: &str) -> Result<bool, StoreError> {
        self.with_state(|state| {
            if !state.sessions.contains_key(session_id) {
                return Err(StoreError::InvalidSession(session_id.to_string()));
            }

            let holder = state.kv.get(key).map(|entry| entry.session.clone());
            match holder {
                Some(Some(holder)) => Ok(holder == session_id),
                Some(None) => {
                    let index = state.bump_index();
                    if let Some(entry) = state.kv.get_mut(key) {
                        entry.session = Some(session_id.to_string());
                        entry.lock_index += 1;
                        entry.modify_index = index;
                    }
                    Ok(true)
                }
                None => {
                    let index = state.bump_index();
                    state.kv.insert(
                        key.to_string(),
                        KvEntry {
                            key: key.to_string(),
                            value: Bytes::new(),
                            session: Some(session_id.to_string()),
                            create_index: index,
                            modify_index: index,
                            lock_index: 1,
                        },
                    );
                    Ok(true)
                }
            }
        })
    }
}

fn random_session_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
