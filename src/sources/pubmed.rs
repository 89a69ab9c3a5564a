// src/sources/pubmed.rs
//! PubMed via NCBI E-utilities: `esearch` (JSON) for ids, then `efetch` (XML)
//! for the articles. The efetch XML carries inline markup inside titles and
//! abstracts, so it is walked with a streaming reader instead of serde.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{fetch_json, fetch_text, Endpoint};
use super::{cap_text, clean_text, no_results, SourceAdapter, SourceError};
use crate::types::{CallParams, SourceId};

pub const DEFAULT_BASE: &str = "https://eutils.ncbi.nlm.nih.gov";

pub struct PubmedAdapter {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Default)]
struct Article {
    pmid: Option<String>,
    title: String,
    abstract_text: String,
    authors: Vec<String>,
    year: Option<String>,
}

#[derive(Debug, Default)]
struct AuthorName {
    last: String,
    fore: String,
}

impl PubmedAdapter {
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

fn decode_err(e: impl std::fmt::Display) -> SourceError {
    SourceError::Decode(format!("pubmed xml: {e}"))
}

/// Walk an efetch `PubmedArticleSet` document.
pub fn parse_articles(xml: &str, text_cap: usize) -> Result<Vec<Value>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut articles = Vec::new();
    let mut current: Option<Article> = None;
    let mut author: Option<AuthorName> = None;

    loop {
        match reader.read_event().map_err(decode_err)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "PubmedArticle" => current = Some(Article::default()),
                    "Author" => author = Some(AuthorName::default()),
                    "AbstractText" => {
                        if let Some(a) = current.as_mut() {
                            if !a.abstract_text.is_empty() {
                                a.abstract_text.push(' ');
                            }
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Event::End(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"Author" => {
                        if let (Some(a), Some(au)) = (current.as_mut(), author.take()) {
                            let last = au.last.trim();
                            if !last.is_empty() && a.authors.len() < 3 {
                                let fore = au.fore.trim();
                                a.authors.push(if fore.is_empty() {
                                    last.to_string()
                                } else {
                                    format!("{fore} {last}")
                                });
                            }
                        }
                    }
                    b"PubmedArticle" => {
                        if let Some(a) = current.take() {
                            articles.push(finish(a, text_cap));
                        }
                    }
                    _ => {}
                }
                stack.pop();
            }
            Event::Text(t) => {
                let Some(a) = current.as_mut() else { continue };
                let text = t.unescape().map_err(decode_err)?;
                collect_text(a, author.as_mut(), &stack, &text);
            }
            Event::CData(c) => {
                let Some(a) = current.as_mut() else { continue };
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                collect_text(a, author.as_mut(), &stack, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(articles)
}

fn collect_text(a: &mut Article, author: Option<&mut AuthorName>, stack: &[String], text: &str) {
    let inside = |tag: &str| stack.iter().any(|s| s == tag);
    let leaf = stack.last().map(String::as_str).unwrap_or_default();

    if inside("ArticleTitle") {
        a.title.push_str(text);
    } else if inside("AbstractText") {
        a.abstract_text.push_str(text);
    } else if leaf == "PMID" && a.pmid.is_none() && inside("MedlineCitation") {
        a.pmid = Some(text.trim().to_string());
    } else if leaf == "Year" && inside("PubDate") && a.year.is_none() {
        a.year = Some(text.trim().to_string());
    } else if let Some(au) = author {
        match leaf {
            "LastName" => au.last.push_str(text),
            "ForeName" => au.fore.push_str(text),
            _ => {}
        }
    }
}

fn finish(a: Article, text_cap: usize) -> Value {
    let title = clean_text(&a.title);
    let abstract_text = clean_text(&a.abstract_text);
    let url = a
        .pmid
        .as_deref()
        .map(|id| format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"));
    json!({
        "title": if title.is_empty() { "Unknown".to_string() } else { title },
        "authors": a.authors,
        "abstract": if abstract_text.is_empty() {
            "No abstract available".to_string()
        } else {
            cap_text(&abstract_text, text_cap)
        },
        "year": a.year.unwrap_or_else(|| "N/A".into()),
        "pmid": a.pmid.unwrap_or_else(|| "N/A".into()),
        "url": url,
    })
}

#[async_trait]
impl SourceAdapter for PubmedAdapter {
    fn id(&self) -> SourceId {
        SourceId::Pubmed
    }

    async fn fetch(&self, params: &CallParams) -> Result<Value, SourceError> {
        let retmax = params.limit.to_string();
        let search = self
            .endpoint
            .get(self.endpoint.url("/entrez/eutils/esearch.fcgi"))
            .query(&[
                ("db", "pubmed"),
                ("term", params.query.as_str()),
                ("retmax", retmax.as_str()),
                ("retmode", "json"),
            ]);
        let found: SearchResponse = fetch_json(search).await?;
        let ids = found.esearchresult.idlist;
        if ids.is_empty() {
            return Ok(no_results(format!(
                "No PubMed articles found for '{}'",
                params.query
            )));
        }

        let id_list = ids.join(",");
        let fetch = self
            .endpoint
            .get(self.endpoint.url("/entrez/eutils/efetch.fcgi"))
            .query(&[("db", "pubmed"), ("id", id_list.as_str()), ("retmode", "xml")]);
        let xml = fetch_text(fetch).await?;
        let articles = parse_articles(&xml, params.text_cap)?;
        if articles.is_empty() {
            return Ok(no_results(format!(
                "No PubMed articles found for '{}'",
                params.query
            )));
        }
        Ok(Value::Array(articles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">31452104</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <PubDate><Year>2019</Year><Month>Sep</Month></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Effects of <i>metformin</i> on aging.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Metformin is widely used.</AbstractText>
          <AbstractText Label="RESULTS">Lifespan &amp; healthspan improved.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author><LastName>Smith</LastName><ForeName>Jane</ForeName></Author>
          <Author><CollectiveName>Aging Consortium</CollectiveName></Author>
          <Author><LastName>Doe</LastName></Author>
        </AuthorList>
      </Article>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="Cites"><PMID Version="1">1111</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn walks_inline_markup_and_authors() {
        let items = parse_articles(SAMPLE, 500).unwrap();
        assert_eq!(items.len(), 1);
        let a = &items[0];
        assert_eq!(a["title"], "Effects of metformin on aging.");
        assert_eq!(
            a["abstract"],
            "Metformin is widely used. Lifespan & healthspan improved."
        );
        assert_eq!(a["pmid"], "31452104");
        assert_eq!(a["year"], "2019");
        assert_eq!(a["authors"], serde_json::json!(["Jane Smith", "Doe"]));
        assert_eq!(a["url"], "https://pubmed.ncbi.nlm.nih.gov/31452104/");
    }
}
