use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::time::Duration;

/// What the store does to locks held by a session once that session is invalidated, either by
/// explicit destroy or by TTL expiry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionBehavior {
    /// Keys locked by the session are deleted.
    Delete,
    /// Keys locked by the session are kept, but their lock is released.
    Release,
}

impl Default for SessionBehavior {
    fn default() -> Self {
        SessionBehavior::Delete
    }
}

impl fmt::Display for SessionBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionBehavior::Delete => write!(f, "delete"),
            SessionBehavior::Release => write!(f, "release"),
        }
    }
}

/// Parameters for creating a session. `ttl` is already in the store's wire format, e.g. "30s".
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionRequest {
    pub name: String,
    pub ttl: String,
    pub behavior: SessionBehavior,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionEntry {
    pub id: String,
    pub name: String,
    pub node: String,
    pub ttl: String,
    pub behavior: SessionBehavior,
    pub create_index: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KvEntry {
    pub key: String,
    pub value: Bytes,
    /// Session currently holding the lock on this key, if any.
    pub session: Option<String>,
    pub create_index: u64,
    pub modify_index: u64,
    /// Number of times this key has been successfully acquired.
    pub lock_index: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryOptions {
    /// `None` targets the local agent's datacenter.
    pub datacenter: Option<String>,
    /// Blocking query cursor. Zero means "don't block".
    pub wait_index: u64,
    /// Upper bound on how long a blocking query may wait. `None` lets the store pick.
    pub wait_time: Option<Duration>,
}

impl QueryOptions {
    pub fn in_datacenter(datacenter: Option<&str>) -> Self {
        QueryOptions {
            datacenter: datacenter.map(str::to_string),
            ..QueryOptions::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryMeta {
    pub last_index: u64,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unknown datacenter \"{0}\"")]
    UnknownDatacenter(String),
    #[error("invalid session \"{0}\"")]
    InvalidSession(String),
}
