use crate::store::{KvEntry, QueryMeta, QueryOptions, SessionEntry, SessionRequest, StoreError};

/// Store is the strongly consistent key-value store that elections run on top of. It is expected
/// to provide linearizable reads, an atomic acquire-if-unlocked primitive, and TTL-bound sessions
/// whose invalidation releases any lock they hold.
///
/// Every method is a short request/response round trip, except `get()` with a non-zero
/// `wait_index`, which is a blocking query.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Name of the store node (agent) this client talks to.
    async fn node_name(&self) -> Result<String, StoreError>;

    /// Returns the id of the newly created session.
    async fn create_session(&self, request: &SessionRequest) -> Result<String, StoreError>;

    /// Resets the session's TTL. Returns `None` if the session doesn't exist (anymore).
    async fn renew_session(&self, session_id: &str) -> Result<Option<SessionEntry>, StoreError>;

    async fn destroy_session(&self, session_id: &str) -> Result<(), StoreError>;

    async fn session_info(
        &self,
        session_id: &str,
        options: &QueryOptions,
    ) -> Result<Option<SessionEntry>, StoreError>;

    /// Reads `key`. If `options.wait_index` is non-zero, this blocks until the store's index moves
    /// past `wait_index` or `options.wait_time` elapses, whichever is first.
    async fn get(&self, key: &str, options: &QueryOptions) -> Result<(Option<KvEntry>, QueryMeta), StoreError>;

    /// Locks `key` with `session_id` iff it is not locked by some other session. Creates the key
    /// if it doesn't exist. Returns true if `session_id` holds the lock afterwards.
    async fn acquire(&self, key: &str, session_id: &str) -> Result<bool, StoreError>;
}
