// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregator;
pub mod ai;
pub mod api;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod metrics;
pub mod normalize;
pub mod render;
pub mod sources;
pub mod synthesis;
pub mod types;

pub use crate::aggregator::{Aggregator, Answer, AnswerOptions};
pub use crate::api::{create_router, AppState};
pub use crate::dispatcher::{DispatchPolicy, Dispatcher, SourceCall};
pub use crate::types::{Classification, ResultBag, SourceId, SourceOutcome};

use crate::config::{AggregatorConfig, AiConfig};

/// Wire the full service from loaded configuration: shared HTTP client,
/// all default adapters, and the classifier/synthesizer strategies for the
/// configured AI backend.
pub fn build_aggregator(
    cfg: &AggregatorConfig,
    ai: Option<&AiConfig>,
) -> anyhow::Result<Aggregator> {
    let client = sources::http::build_client(&cfg.sources)?;
    let registry = sources::SourceRegistry::with_defaults(client);
    let backend = ai::build_backend(ai)?;
    let classifier = classifier::build_classifier(backend.clone(), cfg.selection.max_sources);
    let synthesizer = synthesis::build_synthesizer(backend, cfg.render.synthesis_char_cap);
    tracing::info!(
        sources = registry.ids().len(),
        classifier = classifier.name(),
        synthesizer = synthesizer.name(),
        "aggregator ready"
    );
    Ok(Aggregator::new(registry, classifier, synthesizer, cfg))
}
