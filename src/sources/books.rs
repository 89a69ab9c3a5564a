// src/sources/books.rs
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, Endpoint};
use super::{no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://openlibrary.org";

/// Book search over OpenLibrary. A query carrying an ISBN is looked up
/// directly first.
pub struct BooksAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<Doc>,
}

#[derive(Debug, Deserialize)]
struct Doc {
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    first_publish_year: Option<i32>,
    #[serde(default)]
    isbn: Vec<String>,
    #[serde(default)]
    subject: Vec<String>,
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct IsbnBook {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<Named>,
    #[serde(default)]
    publishers: Vec<Named>,
    publish_date: Option<String>,
    number_of_pages: Option<u32>,
    #[serde(default)]
    subjects: Vec<Named>,
    url: Option<String>,
}

/// First whitespace-separated token that reads as an ISBN-10 or ISBN-13,
/// hyphens removed. An `isbn:` prefix is accepted.
pub fn find_isbn(query: &str) -> Option<String> {
    query.split_whitespace().find_map(|token| {
        let lower = token.to_ascii_lowercase();
        let bare = lower.strip_prefix("isbn:").unwrap_or(&lower);
        let digits: String = bare.chars().filter(|c| *c != '-').collect();
        let valid = match digits.len() {
            13 => digits.chars().all(|c| c.is_ascii_digit()),
            10 => {
                let (head, check) = digits.split_at(9);
                head.chars().all(|c| c.is_ascii_digit())
                    && check.chars().all(|c| c.is_ascii_digit() || c == 'x')
            }
            _ => false,
        };
        valid.then(|| digits.to_ascii_uppercase())
    })
}

fn names(list: Vec<Named>) -> Vec<String> {
    list.into_iter()
        .map(|n| n.name)
        .filter(|n| !n.is_empty())
        .collect()
}

impl BooksAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            endpoint: Endpoint::new(client, DEFAULT_BASE),
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.endpoint = self.endpoint.with_base(base);
        self
    }
}

#[async_trait]
impl SourceAdapter for BooksAdapter {
    fn id(&self) -> SourceId {
        SourceId::Books
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        if let Some(isbn) = find_isbn(&params.query) {
            if let Some(book) = self.by_isbn(&isbn).await? {
                return Ok(Value::Array(vec![book]));
            }
            tracing::debug!(target: "sources", isbn, "isbn not found; falling back to search");
        }

        let limit = params.limit.to_string();
        let req = self
            .endpoint
            .get(self.endpoint.url("/search.json"))
            .query(&[("q", params.query.as_str()), ("limit", limit.as_str())]);
        let resp: SearchResponse = fetch_json(req).await?;

        if resp.docs.is_empty() {
            return Ok(no_results(format!("No books found for '{}'", params.query)));
        }

        let books: Vec<Value> = resp
            .docs
            .into_iter()
            .take(params.limit)
            .map(|d| {
                let authors = if d.author_name.is_empty() {
                    vec!["Unknown".to_string()]
                } else {
                    d.author_name
                };
                json!({
                    "title": d.title.unwrap_or_else(|| "Unknown".into()),
                    "authors": authors,
                    "first_publish_year": d.first_publish_year,
                    "isbn": d.isbn.into_iter().next().unwrap_or_else(|| "N/A".into()),
                    "subjects": d.subject.into_iter().take(5).collect::<Vec<_>>(),
                    "url": d.key.map(|k| format!("https://openlibrary.org{k}")),
                })
            })
            .collect();
        Ok(Value::Array(books))
    }
}

impl BooksAdapter {
    async fn by_isbn(&self, isbn: &str) -> Result<Option<Value>, SourceError> {
        let bibkey = format!("ISBN:{isbn}");
        let req = self.endpoint.get(self.endpoint.url("/api/books")).query(&[
            ("bibkeys", bibkey.as_str()),
            ("format", "json"),
            ("jscmd", "data"),
        ]);
        let mut found: HashMap<String, IsbnBook> = fetch_json(req).await?;
        let Some(book) = found.remove(&bibkey) else {
            return Ok(None);
        };

        let mut authors = names(book.authors);
        if authors.is_empty() {
            authors.push("Unknown".to_string());
        }
        Ok(Some(json!({
            "title": book.title.unwrap_or_else(|| "Unknown".into()),
            "authors": authors,
            "publishers": names(book.publishers),
            "publish_date": book.publish_date.unwrap_or_else(|| "N/A".into()),
            "pages": book.number_of_pages,
            "isbn": isbn,
            "subjects": names(book.subjects).into_iter().take(5).collect::<Vec<_>>(),
            "url": book.url,
        })))
    }
}
