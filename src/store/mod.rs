mod api;
mod in_memory;
mod types;

pub use api::Store;
pub use in_memory::InMemoryStore;
pub use types::KvEntry;
pub use types::QueryMeta;
pub use types::QueryOptions;
pub use types::SessionBehavior;
pub use types::SessionEntry;
pub use types::SessionRequest;
pub use types::StoreError;
