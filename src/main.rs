use kv_election::{Candidate, CandidateConfig, CandidateOptions, InMemoryStore};
use slog::Drain;
use std::error::Error;
use std::sync::Arc;

const LOCK_KEY: &str = "service/demo/leader";

/// Runs a three-way election against an in-process store, then makes the leader resign and
/// watches someone else take over.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let logger = create_root_logger_for_stdout();
    let store = Arc::new(InMemoryStore::new());

    let mut candidates = Vec::with_capacity(3);
    for i in 1..=3 {
        let candidate = Candidate::new(store.clone(), candidate_config(&logger, i)).await?;
        candidates.push(candidate);
    }

    candidates[0].wait().await;
    let leader = candidates[0].leader_service().await?;
    slog::info!(logger, "Leader elected"; "session" => &leader.id, "name" => &leader.name);

    let (first, rest): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|c| c.session_id() == leader.id);
    for c in first.iter() {
        c.resign().await;
    }

    rest[0].wait().await;
    let new_leader = rest[0].leader_service().await?;
    slog::info!(logger, "Leader re-elected"; "session" => &new_leader.id, "name" => &new_leader.name);

    for c in rest.iter() {
        c.resign().await;
    }

    Ok(())
}

fn candidate_config(logger: &slog::Logger, i: usize) -> CandidateConfig {
    CandidateConfig {
        id: format!("demo{}", i),
        lock_key: LOCK_KEY.to_string(),
        logger: logger.clone(),
        options: CandidateOptions {
            session_ttl: Some("10s".to_string()),
            ..CandidateOptions::default()
        },
    }
}

fn create_root_logger_for_stdout() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!("app" => "kv-election-demo"))
}
