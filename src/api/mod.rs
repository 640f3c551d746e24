//! This mod is meant to hold most of the code for the library's client-facing API.
mod candidate;
mod candidate_id;
mod options;
mod session_name;
mod wiring;

pub use candidate::Candidate;
pub use candidate::LeaderLookupError;
pub use options::CandidateOptions;
pub use session_name::parse_session_name;
pub use session_name::ParseSessionNameError;
pub use session_name::SessionNameParts;
pub use wiring::try_create_candidate;
pub use wiring::CandidateConfig;
pub use wiring::CandidateCreationError;
