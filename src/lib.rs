mod api;
mod engine;
mod store;

pub use api::parse_session_name;
pub use api::try_create_candidate;
pub use api::Candidate;
pub use api::CandidateConfig;
pub use api::CandidateCreationError;
pub use api::CandidateOptions;
pub use api::LeaderLookupError;
pub use api::ParseSessionNameError;
pub use api::SessionNameParts;
pub use engine::ElectionState;
pub use engine::LeaderChangeListener;
pub use store::InMemoryStore;
pub use store::KvEntry;
pub use store::QueryMeta;
pub use store::QueryOptions;
pub use store::SessionBehavior;
pub use store::SessionEntry;
pub use store::SessionRequest;
pub use store::Store;
pub use store::StoreError;

// Learning 1: `create::{root_mod}` should not have any code. Just `mod` and `pub use` statements.
// Learning 2: All `mod` statements, anywhere, should not be `pub`. Only export `pub` via individual
//             use statements.
//
// This keeps the `crate::{root_mod}` root_mod only responsible for exporting types to the rest of
// crate, and allows me to organize my root_mod impl however I want.
