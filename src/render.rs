// src/render.rs
//! Structured rendering: one section per source in SourceId order, each item
//! formatted from that source's known keys.
//!
//! Empty and Failure outcomes render as a single diagnostic line. Nothing is
//! invented for sources that returned no data.

use serde::Serialize;
use serde_json::Value;

use crate::config::aggregator::RenderConfig;
use crate::sources::cap_text;
use crate::types::{Item, ResultBag, SourceId, SourceOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPolicy {
    pub max_items_per_source: usize,
    pub snippet_chars: usize,
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            max_items_per_source: 3,
            snippet_chars: 200,
        }
    }
}

impl From<&RenderConfig> for RenderPolicy {
    fn from(cfg: &RenderConfig) -> Self {
        Self {
            max_items_per_source: cfg.max_items_per_source,
            snippet_chars: cfg.snippet_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub source: SourceId,
    pub label: &'static str,
    /// "success" | "empty" | "failure"
    pub status: &'static str,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredView {
    pub sections: Vec<Section>,
}

impl StructuredView {
    pub fn to_markdown(&self) -> String {
        self.sections
            .iter()
            .map(|s| {
                let mut block = format!("**{}**", s.label.to_uppercase());
                for line in &s.lines {
                    block.push_str("\n- ");
                    block.push_str(line);
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredRenderer {
    policy: RenderPolicy,
}

impl StructuredRenderer {
    pub fn new(policy: RenderPolicy) -> Self {
        Self { policy }
    }

    pub fn render(&self, bag: &ResultBag) -> StructuredView {
        let sections = bag
            .iter()
            .map(|(id, outcome)| Section {
                source: id,
                label: id.label(),
                status: outcome.kind(),
                lines: self.lines_for(id, outcome),
            })
            .collect();
        StructuredView { sections }
    }

    fn lines_for(&self, id: SourceId, outcome: &SourceOutcome) -> Vec<String> {
        match outcome {
            SourceOutcome::Empty { reason } => vec![format!("No data: {reason}")],
            SourceOutcome::Failure { error } => vec![format!("Unavailable: {error}")],
            SourceOutcome::Success { items } => {
                let lines: Vec<String> = match id {
                    // One summary object whose stations are the real items.
                    SourceId::AirQuality => items
                        .iter()
                        .flat_map(air_quality_lines)
                        .take(self.policy.max_items_per_source)
                        .collect(),
                    SourceId::Dictionary => items
                        .iter()
                        .flat_map(|i| self.dictionary_lines(i))
                        .take(self.policy.max_items_per_source)
                        .collect(),
                    _ => items
                        .iter()
                        .take(self.policy.max_items_per_source)
                        .map(|i| self.item_line(id, i))
                        .collect(),
                };
                if lines.is_empty() {
                    vec!["No data: nothing displayable".to_string()]
                } else {
                    lines
                }
            }
        }
    }

    fn snippet(&self, s: &str) -> String {
        cap_text(s, self.policy.snippet_chars)
    }

    fn item_line(&self, id: SourceId, item: &Item) -> String {
        let f = |k: &str| field(item, k);
        let line = match id {
            SourceId::Weather => Some(format!(
                "{}: {}, {}°C ({}°F), feels like {}°C, humidity {}%, wind {} km/h",
                f("location").unwrap_or_default(),
                f("condition").unwrap_or_default(),
                f("temperature_c").unwrap_or_default(),
                f("temperature_f").unwrap_or_default(),
                f("feels_like_c").unwrap_or_default(),
                f("humidity").unwrap_or_default(),
                f("wind_speed_kmph").unwrap_or_default(),
            )),
            SourceId::Geocoding => f("display_name").map(|name| {
                format!(
                    "{name} ({}, {})",
                    f("latitude").unwrap_or_default(),
                    f("longitude").unwrap_or_default()
                )
            }),
            SourceId::Countries => f("name").map(|name| {
                format!(
                    "{name}: capital {}, region {}, population {}, languages {}",
                    f("capital").unwrap_or_default(),
                    f("region").unwrap_or_default(),
                    f("population").unwrap_or_default(),
                    f("languages").unwrap_or_default()
                )
            }),
            SourceId::Wikipedia => f("title").map(|t| {
                with_url(
                    format!("{t}: {}", self.snippet(&f("summary").unwrap_or_default())),
                    f("url"),
                )
            }),
            SourceId::Duckduckgo => f("title").map(|t| {
                with_url(
                    format!("{t}: {}", self.snippet(&f("body").unwrap_or_default())),
                    f("url"),
                )
            }),
            SourceId::Wikidata => f("label").map(|l| {
                let desc = f("description").unwrap_or_default();
                with_url(format!("{l}: {desc}"), f("url"))
            }),
            SourceId::Arxiv => f("title").map(|t| {
                with_url(
                    format!(
                        "{t} by {} ({})",
                        f("authors").unwrap_or_default(),
                        f("published").unwrap_or_default()
                    ),
                    f("url"),
                )
            }),
            SourceId::Pubmed => f("title").map(|t| {
                with_url(
                    format!(
                        "{t} by {} ({})",
                        f("authors").unwrap_or_default(),
                        f("year").unwrap_or_default()
                    ),
                    f("url"),
                )
            }),
            SourceId::Books => f("title").map(|t| {
                format!(
                    "{t} by {} ({})",
                    f("authors").unwrap_or_default(),
                    f("first_publish_year")
                        .or_else(|| f("publish_date"))
                        .unwrap_or_else(|| "n.d.".into())
                )
            }),
            SourceId::Github => f("name").map(|n| {
                with_url(
                    format!(
                        "{n} ({} stars, {}): {}",
                        f("stars").unwrap_or_default(),
                        f("language").unwrap_or_default(),
                        self.snippet(&f("description").unwrap_or_default())
                    ),
                    f("url"),
                )
            }),
            SourceId::Stackoverflow => f("title").map(|t| {
                with_url(
                    format!(
                        "{t} (score {}, {} answers)",
                        f("score").unwrap_or_default(),
                        f("answer_count").unwrap_or_default()
                    ),
                    f("url"),
                )
            }),
            SourceId::Quotes => f("content").map(|c| {
                format!("\"{}\" - {}", self.snippet(&c), f("author").unwrap_or_default())
            }),
            SourceId::AirQuality | SourceId::Dictionary => None,
        };
        line.unwrap_or_else(|| self.generic_line(item))
    }

    fn dictionary_lines(&self, item: &Item) -> Vec<String> {
        let word = field(item, "word").unwrap_or_default();
        let Some(meanings) = item.get("meanings").and_then(Value::as_array) else {
            return vec![self.generic_line(item)];
        };
        meanings
            .iter()
            .filter_map(|m| {
                let pos = m.get("part_of_speech").and_then(Value::as_str).unwrap_or("");
                let def = m
                    .get("definitions")
                    .and_then(Value::as_array)
                    .and_then(|d| d.first())
                    .and_then(|d| d.get("definition"))
                    .and_then(Value::as_str)?;
                Some(format!("{word} ({pos}): {}", self.snippet(def)))
            })
            .collect()
    }

    /// Unknown shapes: first five `key: value` pairs.
    fn generic_line(&self, item: &Item) -> String {
        let joined = item
            .iter()
            .take(5)
            .map(|(k, v)| format!("{k}: {}", display_value(v)))
            .collect::<Vec<_>>()
            .join("; ");
        self.snippet(&joined)
    }
}

fn air_quality_lines(item: &Item) -> Vec<String> {
    let Some(stations) = item.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };
    stations
        .iter()
        .map(|s| {
            let name = s.get("location").map(display_value).unwrap_or_default();
            let country = s.get("country").map(display_value).unwrap_or_default();
            let readings = s
                .get("measurements")
                .and_then(Value::as_array)
                .map(|ms| {
                    ms.iter()
                        .map(|m| {
                            format!(
                                "{} {} {}",
                                m.get("parameter").map(display_value).unwrap_or_default(),
                                m.get("value").map(display_value).unwrap_or_default(),
                                m.get("unit").map(display_value).unwrap_or_default()
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("{name} ({country}): {readings}")
        })
        .collect()
}

fn with_url(text: String, url: Option<String>) -> String {
    match url {
        Some(u) if !u.is_empty() => format!("{text} <{u}>"),
        _ => text,
    }
}

/// A present, non-null field rendered for display.
fn field(item: &Item, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::Null => None,
        v => Some(display_value(v)),
    }
}

fn display_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(xs) => xs.iter().map(display_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(v: Value) -> Item {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn weather_line_uses_domain_fields() {
        let mut bag = ResultBag::new();
        bag.insert_once(
            SourceId::Weather,
            SourceOutcome::Success {
                items: vec![item(json!({
                    "location": "Paris", "condition": "Sunny", "temperature_c": "21",
                    "temperature_f": "70", "feels_like_c": "20", "humidity": "40",
                    "wind_speed_kmph": "9"
                }))],
            },
        );
        let view = StructuredRenderer::default().render(&bag);
        assert_eq!(
            view.sections[0].lines,
            vec!["Paris: Sunny, 21°C (70°F), feels like 20°C, humidity 40%, wind 9 km/h"]
        );
    }

    #[test]
    fn items_are_capped_per_source() {
        let items = (0..6)
            .map(|i| {
                item(json!({
                    "title": format!("Paper {i}"),
                    "authors": ["A"],
                    "published": "2020-01-01",
                    "url": "u"
                }))
            })
            .collect();
        let mut bag = ResultBag::new();
        bag.insert_once(SourceId::Arxiv, SourceOutcome::Success { items });
        let view = StructuredRenderer::new(RenderPolicy {
            max_items_per_source: 2,
            snippet_chars: 200,
        })
        .render(&bag);
        assert_eq!(view.sections[0].lines.len(), 2);
        assert_eq!(view.sections[0].lines[0], "Paper 0 by A (2020-01-01) <u>");
    }

    #[test]
    fn failure_and_empty_are_one_line_each() {
        let mut bag = ResultBag::new();
        bag.insert_once(
            SourceId::Github,
            SourceOutcome::Failure {
                error: "upstream returned HTTP 503".into(),
            },
        );
        bag.insert_once(
            SourceId::Books,
            SourceOutcome::Empty {
                reason: "No books found".into(),
            },
        );
        let md = StructuredRenderer::default().render(&bag).to_markdown();
        assert_eq!(
            md,
            "**BOOKS (OPENLIBRARY)**\n- No data: No books found\n\n**GITHUB**\n- Unavailable: upstream returned HTTP 503"
        );
    }

    #[test]
    fn unknown_shape_falls_back_to_key_values() {
        let mut bag = ResultBag::new();
        bag.insert_once(
            SourceId::Wikipedia,
            SourceOutcome::Success {
                items: vec![item(json!({"value": 42}))],
            },
        );
        let view = StructuredRenderer::default().render(&bag);
        assert_eq!(view.sections[0].lines, vec!["value: 42"]);
    }
}
