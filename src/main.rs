use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use adaptive_mastery::logging::{init_tracing, LogSettings};
use adaptive_mastery::{InMemoryMasteryStore, MasteryConfig, MasteryEngine, TopicRef};

const DEFAULT_SEED: u64 = 42;

/// Hidden per-topic skill of the simulated learner: (topic, subject, p(correct)).
const SIMULATED_SKILLS: &[(&str, &str, f64)] = &[
    ("fractions", "math", 0.35),
    ("linear-equations", "math", 0.7),
    ("geometry", "math", 0.9),
    ("photosynthesis", "biology", 0.55),
    ("cell-division", "biology", 0.25),
];

fn main() {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing(&LogSettings::from_env());

    if let Err(err) = run() {
        tracing::error!(error = %err, "mastery simulation failed");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = MasteryConfig::from_env();
    let seed = std::env::var("MASTERY_SIM_SEED")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SEED);
    tracing::info!(?config, seed, "Starting mastery simulation");

    let store = Arc::new(InMemoryMasteryStore::new(config.store_shards));
    let engine = MasteryEngine::new(store, config);
    let mut rng = StdRng::seed_from_u64(seed);

    let topics: Vec<TopicRef> = SIMULATED_SKILLS
        .iter()
        .map(|(topic, subject, _)| TopicRef::new(*topic).with_subject(*subject))
        .collect();

    let mut session = engine.start_session("simulated-learner", topics)?;
    while let Some(probe) = session.next_probe()? {
        let skill = SIMULATED_SKILLS
            .iter()
            .find(|(topic, _, _)| *topic == probe.topic_id)
            .map(|(_, _, skill)| *skill)
            .unwrap_or(0.5);
        let is_correct = rng.random_bool(skill);
        tracing::debug!(
            topic_id = %probe.topic_id,
            difficulty = probe.difficulty.as_str(),
            is_correct,
            reason = %probe.reason,
            "Simulated answer"
        );
        session.submit(is_correct, Utc::now())?;
    }

    let report = session.finish()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
