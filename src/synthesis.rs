// src/synthesis.rs
//! Final output: structured listing or an AI-written narrative.
//!
//! The narrative path caps the serialized result bag before it reaches the
//! backend and falls back to the structured listing, with an inline note, on
//! any backend problem.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::ai::DynAiBackend;
use crate::render::StructuredView;
use crate::types::{query_id, ResultBag};

pub const DEFAULT_SYNTHESIS_CHAR_CAP: usize = 15_000;
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "synthesis_failures_total",
            "Narrative requests answered with the structured fallback."
        );
    });
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Structured,
    Narrative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    /// The mode actually produced, which may differ from the one requested.
    pub mode: RenderMode,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Rendered {
    fn structured(view: &StructuredView) -> Self {
        Self {
            mode: RenderMode::Structured,
            text: view.to_markdown(),
            note: None,
        }
    }

    fn nothing_found(query: &str, view: &StructuredView) -> Self {
        Self {
            mode: RenderMode::Narrative,
            text: format!(
                "No information was found for \"{}\".\n\n{}",
                query.trim(),
                view.to_markdown()
            ),
            note: None,
        }
    }

    fn synthesis_failed(view: &StructuredView, reason: &str) -> Self {
        let note = format!("Synthesis failed: {reason}");
        Self {
            mode: RenderMode::Structured,
            text: format!("_{note}. Showing per-source results._\n\n{}", view.to_markdown()),
            note: Some(note),
        }
    }
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn render(
        &self,
        query: &str,
        bag: &ResultBag,
        view: &StructuredView,
        mode: RenderMode,
    ) -> Rendered;
    fn name(&self) -> &'static str;
}

pub type DynSynthesizer = Arc<dyn Synthesizer>;

/// Cap `blob` at `cap` chars, appending the truncation marker when cut.
pub fn truncate_for_synthesis(blob: &str, cap: usize) -> String {
    match blob.char_indices().nth(cap) {
        None => blob.to_string(),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&blob[..cut]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
    }
}

/// No backend: always the structured listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSynthesizer;

#[async_trait]
impl Synthesizer for TemplateSynthesizer {
    async fn render(
        &self,
        query: &str,
        bag: &ResultBag,
        view: &StructuredView,
        mode: RenderMode,
    ) -> Rendered {
        if mode == RenderMode::Narrative && !bag.has_usable_data() {
            return Rendered::nothing_found(query, view);
        }
        Rendered::structured(view)
    }

    fn name(&self) -> &'static str {
        "template"
    }
}

pub struct AiSynthesizer {
    backend: DynAiBackend,
    char_cap: usize,
}

impl AiSynthesizer {
    pub fn new(backend: DynAiBackend, char_cap: usize) -> Self {
        Self { backend, char_cap }
    }

    fn fail(&self, query: &str, view: &StructuredView, reason: &str) -> Rendered {
        ensure_metrics_described();
        counter!("synthesis_failures_total").increment(1);
        tracing::warn!(target: "synthesis", id = %query_id(query), reason, "narrative synthesis failed");
        Rendered::synthesis_failed(view, reason)
    }
}

#[async_trait]
impl Synthesizer for AiSynthesizer {
    async fn render(
        &self,
        query: &str,
        bag: &ResultBag,
        view: &StructuredView,
        mode: RenderMode,
    ) -> Rendered {
        if mode == RenderMode::Structured {
            return Rendered::structured(view);
        }
        if !bag.has_usable_data() {
            return Rendered::nothing_found(query, view);
        }

        let blob = match serde_json::to_string_pretty(bag) {
            Ok(b) => b,
            Err(e) => return self.fail(query, view, &e.to_string()),
        };
        let payload = truncate_for_synthesis(&blob, self.char_cap);
        tracing::debug!(
            target: "synthesis",
            id = %query_id(query),
            chars = blob.chars().count(),
            truncated = payload.len() != blob.len(),
            "synthesizing"
        );

        match self.backend.synthesize(query, &payload).await {
            Ok(text) if !text.trim().is_empty() => Rendered {
                mode: RenderMode::Narrative,
                text: text.trim().to_string(),
                note: None,
            },
            Ok(_) => self.fail(query, view, "empty reply"),
            Err(e) => self.fail(query, view, &e.to_string()),
        }
    }

    fn name(&self) -> &'static str {
        "ai"
    }
}

/// AI-backed when the backend is configured, template otherwise.
pub fn build_synthesizer(backend: DynAiBackend, char_cap: usize) -> DynSynthesizer {
    if backend.is_configured() {
        Arc::new(AiSynthesizer::new(backend, char_cap))
    } else {
        Arc::new(TemplateSynthesizer)
    }
}
