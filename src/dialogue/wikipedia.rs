//! Wikipedia summaries through the MediaWiki action API.
//!
//! A lookup is three steps: full-text search for the best title, fetch the
//! plain-text intro of that page (following redirects), and, if the page
//! turns out to be a disambiguation page, collect its article links as the
//! candidate options.

use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, trace};

use super::{KnowledgeSource, LookupError};

/// User agent sent when `WIKIPEDIA_USER_AGENT` is not set.
pub const DEFAULT_USER_AGENT: &str = "VoiceGanga/2.0";

#[derive(Debug, Clone)]
pub struct WikipediaSettings {
    /// Wikipedia language edition, e.g. "en".
    pub language: String,
    pub user_agent: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
        }
    }
}

pub struct WikipediaClient {
    client: reqwest::Client,
    api_url: String,
    runtime: Handle,
}

/// What a page fetch resolved to.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PageResolution {
    Missing,
    Disambiguation { title: String },
    Extract(String),
}

impl WikipediaClient {
    pub fn new(settings: &WikipediaSettings, runtime: Handle) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(settings.user_agent.clone());
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_url: format!("https://{}.wikipedia.org/w/api.php", settings.language),
            runtime,
        })
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value, LookupError> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(map_transport_error)?
            .error_for_status()
            .map_err(map_transport_error)?;

        let json: Value = resp.json().await.map_err(map_transport_error)?;
        if let Some(info) = json["error"]["info"].as_str() {
            return Err(LookupError::Http(info.to_string()));
        }
        trace!(%json, "MediaWiki response");
        Ok(json)
    }

    async fn fetch_summary(&self, query: &str, sentences: usize) -> Result<String, LookupError> {
        let search = self
            .get_json(&[
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
                ("srinfo", "suggestion"),
                ("srprop", ""),
            ])
            .await?;
        let title = search_title(&search).ok_or_else(|| LookupError::NotFound(query.to_string()))?;
        debug!(query, title = %title, "Resolved lookup title");

        let sentences = sentences.to_string();
        let page = self
            .get_json(&[
                ("prop", "extracts|pageprops"),
                ("ppprop", "disambiguation"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exsentences", sentences.as_str()),
                ("redirects", "1"),
                ("titles", title.as_str()),
            ])
            .await?;

        match resolve_page(&page)? {
            PageResolution::Extract(text) => Ok(text),
            PageResolution::Missing => Err(LookupError::NotFound(title)),
            PageResolution::Disambiguation { title } => {
                let links = self
                    .get_json(&[
                        ("prop", "links"),
                        ("plnamespace", "0"),
                        ("pllimit", "max"),
                        ("titles", title.as_str()),
                    ])
                    .await?;
                Err(LookupError::Ambiguous {
                    options: link_titles(&links),
                    title,
                })
            }
        }
    }
}

impl KnowledgeSource for WikipediaClient {
    fn summary(&self, query: &str, sentences: usize) -> Result<String, LookupError> {
        self.runtime.block_on(self.fetch_summary(query, sentences))
    }
}

fn map_transport_error(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout
    } else {
        LookupError::Http(e.to_string())
    }
}

/// Best title from a search response: the top hit, else the suggestion.
pub(crate) fn search_title(json: &Value) -> Option<String> {
    json["query"]["search"]
        .get(0)
        .and_then(|hit| hit["title"].as_str())
        .or_else(|| json["query"]["searchinfo"]["suggestion"].as_str())
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
}

pub(crate) fn resolve_page(json: &Value) -> Result<PageResolution, LookupError> {
    let page = json["query"]["pages"]
        .get(0)
        .ok_or_else(|| LookupError::Malformed("response has no pages".into()))?;

    if page["missing"].as_bool().unwrap_or(false) || page["invalid"].as_bool().unwrap_or(false) {
        return Ok(PageResolution::Missing);
    }
    if page["pageprops"].get("disambiguation").is_some() {
        let title = page["title"]
            .as_str()
            .ok_or_else(|| LookupError::Malformed("page has no title".into()))?;
        return Ok(PageResolution::Disambiguation {
            title: title.to_string(),
        });
    }
    match page["extract"].as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(PageResolution::Extract(text.to_string())),
        _ => Ok(PageResolution::Missing),
    }
}

pub(crate) fn link_titles(json: &Value) -> Vec<String> {
    json["query"]["pages"]
        .get(0)
        .and_then(|page| page["links"].as_array())
        .map(|links| {
            links
                .iter()
                .filter_map(|l| l["title"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
