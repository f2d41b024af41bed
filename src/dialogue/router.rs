//! Utterance routing: web search, factual lookup, or chat.
//!
//! Classification is a case-insensitive substring test, first match wins:
//! "search"/"find" opens a web search, a question word asks the knowledge
//! source, anything else goes to the chat model.

use tracing::{debug, info, warn};

use super::{Browser, ChatModel, KnowledgeSource, LookupError};

const SEARCH_KEYWORDS: [&str; 2] = ["search", "find"];
const QUESTION_KEYWORDS: [&str; 4] = ["who", "what", "where", "when"];

/// Disambiguation lists longer than this are not read out.
pub const MAX_LISTED_OPTIONS: usize = 5;

/// Sentences requested from the knowledge source.
pub const DEFAULT_SUMMARY_SENTENCES: usize = 3;

const SEARCH_URL: &str = "https://www.google.com/search?q=";

pub const TOO_MANY_RESULTS: &str = "Sorry, there were too many results. Please be more specific.";
pub const NOT_FOUND: &str = "Sorry, I couldn't find any information for that.";
pub const TIMED_OUT: &str = "Sorry, there was a timeout error while fetching the data.";
pub const NO_RESPONSE: &str = "Sorry, I'm not sure how to respond to that.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Open a web search for `query`.
    Search { query: String },
    /// Ask the knowledge source about the whole utterance.
    Lookup,
    /// Hand the utterance to the chat model.
    Chat,
}

impl Intent {
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if SEARCH_KEYWORDS.iter().any(|k| lower.contains(k)) {
            let query = SEARCH_KEYWORDS
                .iter()
                .fold(lower.clone(), |acc, k| acc.replace(k, ""))
                .trim()
                .to_string();
            return Self::Search { query };
        }
        if QUESTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Self::Lookup;
        }
        Self::Chat
    }
}

pub struct DialogueRouter {
    knowledge: Box<dyn KnowledgeSource>,
    browser: Box<dyn Browser>,
    chat: Box<dyn ChatModel>,
    sentences: usize,
}

impl DialogueRouter {
    pub fn new(
        knowledge: Box<dyn KnowledgeSource>,
        browser: Box<dyn Browser>,
        chat: Box<dyn ChatModel>,
    ) -> Self {
        Self {
            knowledge,
            browser,
            chat,
            sentences: DEFAULT_SUMMARY_SENTENCES,
        }
    }

    pub fn with_summary_sentences(mut self, sentences: usize) -> Self {
        self.sentences = sentences.max(1);
        self
    }

    /// Produce the response for one utterance. Never fails: every lookup
    /// outcome becomes a sentence for the user.
    pub fn route(&self, utterance: &str) -> String {
        let intent = Intent::classify(utterance);
        debug!(?intent, "Routing utterance");
        match intent {
            Intent::Search { query } => self.search(&query),
            Intent::Lookup => lookup_response(self.knowledge.summary(utterance, self.sentences)),
            Intent::Chat => {
                let reply = self.chat.respond(utterance);
                if reply.trim().is_empty() {
                    NO_RESPONSE.to_string()
                } else {
                    reply
                }
            }
        }
    }

    fn search(&self, query: &str) -> String {
        let url = format!("{SEARCH_URL}{}", urlencoding::encode(query));
        info!(query, "Opening web search");
        if let Err(e) = self.browser.open(&url) {
            warn!("Failed to open browser: {e:#}");
        }
        format!("Searching for {query} on Google.")
    }
}

/// Turn a lookup outcome into the sentence spoken to the user.
pub fn lookup_response(result: Result<String, LookupError>) -> String {
    match result {
        Ok(summary) => summary,
        Err(LookupError::Ambiguous { options, .. }) if options.len() <= MAX_LISTED_OPTIONS => {
            format!(
                "Sorry, there were multiple results. Please be more specific: {}",
                options.join(", ")
            )
        }
        Err(LookupError::Ambiguous { .. }) => TOO_MANY_RESULTS.to_string(),
        Err(LookupError::NotFound(_)) => NOT_FOUND.to_string(),
        Err(LookupError::Timeout) => TIMED_OUT.to_string(),
        Err(other) => format!("Sorry, I couldn't retrieve information for that: {other}"),
    }
}
