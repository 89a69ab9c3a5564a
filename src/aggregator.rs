// src/aggregator.rs
//! Query pipeline: classify → select → dispatch → render.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::classifier::DynClassifier;
use crate::config::aggregator::{AggregatorConfig, SelectionMode, SourcesConfig};
use crate::dispatcher::{DispatchPolicy, Dispatcher};
use crate::render::{RenderPolicy, StructuredRenderer, StructuredView};
use crate::sources::SourceRegistry;
use crate::synthesis::{DynSynthesizer, RenderMode, Rendered};
use crate::types::{query_id, CallParams, Classification, ResultBag, SourceId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOptions {
    #[serde(default)]
    pub mode: RenderMode,
    /// Overrides the configured selection mode for this query.
    #[serde(default)]
    pub selection: Option<SelectionMode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub query: String,
    pub classification: Classification,
    pub results: ResultBag,
    pub structured: StructuredView,
    pub rendered: Rendered,
    pub elapsed_ms: u64,
}

pub struct Aggregator {
    registry: SourceRegistry,
    dispatcher: Dispatcher,
    classifier: DynClassifier,
    synthesizer: DynSynthesizer,
    renderer: StructuredRenderer,
    sources: SourcesConfig,
    selection: SelectionMode,
}

impl Aggregator {
    pub fn new(
        registry: SourceRegistry,
        classifier: DynClassifier,
        synthesizer: DynSynthesizer,
        cfg: &AggregatorConfig,
    ) -> Self {
        Self {
            registry,
            dispatcher: Dispatcher::new(DispatchPolicy::from(&cfg.dispatch)),
            classifier,
            synthesizer,
            renderer: StructuredRenderer::new(RenderPolicy::from(&cfg.render)),
            sources: cfg.sources.clone(),
            selection: cfg.selection.mode,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    pub fn synthesizer_name(&self) -> &'static str {
        self.synthesizer.name()
    }

    /// Sources to call for this classification, in SourceId order.
    pub fn select(&self, classification: &Classification, mode: SelectionMode) -> Vec<SourceId> {
        let mut picked: Vec<SourceId> = match mode {
            SelectionMode::All => self.registry.ids(),
            SelectionMode::Classified => classification
                .sources
                .iter()
                .copied()
                .filter(|id| {
                    let known = self.registry.contains(*id);
                    if !known {
                        tracing::debug!(target: "dispatch", source = %id, "classified source not registered");
                    }
                    known
                })
                .collect(),
        };
        picked.sort();
        picked.dedup();
        picked
    }

    pub fn params_for(&self, id: SourceId, classification: &Classification) -> CallParams {
        let location = if id.wants_location() {
            classification.location.clone()
        } else {
            None
        };
        CallParams::new(classification.search_terms.clone())
            .with_location(location)
            .with_limit(self.sources.limit_for(id))
            .with_text_cap(self.sources.text_cap_for(id))
    }

    /// Classify and fan out; no rendering.
    pub async fn gather(
        &self,
        query: &str,
        selection: Option<SelectionMode>,
    ) -> (Classification, ResultBag) {
        let classification = self.classifier.classify(query).await;
        let mode = selection.unwrap_or(self.selection);
        let chosen = self.select(&classification, mode);
        tracing::info!(
            target: "dispatch",
            id = %query_id(query),
            classifier = self.classifier.name(),
            sources = ?chosen,
            "query classified"
        );

        let calls = chosen
            .into_iter()
            .filter_map(|id| self.registry.call(id, self.params_for(id, &classification)))
            .collect();
        let bag = self.dispatcher.run(calls).await;
        (classification, bag)
    }

    /// Full pipeline. Always produces an answer; per-source problems show up
    /// inside it, never as an error.
    pub async fn answer(&self, query: &str, options: AnswerOptions) -> Answer {
        let started = Instant::now();
        let (classification, results) = self.gather(query, options.selection).await;
        let structured = self.renderer.render(&results);
        let rendered = self
            .synthesizer
            .render(query, &results, &structured, options.mode)
            .await;
        Answer {
            query: query.to_string(),
            classification,
            results,
            structured,
            rendered,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}
