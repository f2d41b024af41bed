//! Dialogue: classify an utterance and produce a spoken response.
//!
//! The router talks to three collaborators through small traits so it can
//! be exercised without a network, a browser, or a trained model.

pub mod browse;
pub mod chat;
pub mod router;
pub mod wikipedia;

pub use browse::SystemBrowser;
pub use chat::PhraseModel;
pub use router::{DialogueRouter, Intent};
pub use wikipedia::WikipediaClient;

/// Failure modes of a factual lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The query matched a disambiguation page.
    #[error("\"{title}\" may refer to: {}", .options.join(", "))]
    Ambiguous { title: String, options: Vec<String> },

    #[error("no page matched \"{0}\"")]
    NotFound(String),

    #[error("lookup timed out")]
    Timeout,

    #[error("lookup request failed: {0}")]
    Http(String),

    #[error("unexpected lookup response: {0}")]
    Malformed(String),
}

/// Short factual summaries (Wikipedia in production).
pub trait KnowledgeSource {
    fn summary(&self, query: &str, sentences: usize) -> Result<String, LookupError>;
}

/// Fire-and-forget "open this URL" action.
pub trait Browser {
    fn open(&self, url: &str) -> anyhow::Result<()>;
}

/// Free-form reply generator. An empty string means "no idea".
pub trait ChatModel {
    fn respond(&self, text: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_lists_options() {
        let err = LookupError::Ambiguous {
            title: "Mercury".into(),
            options: vec!["Mercury (planet)".into(), "Mercury (element)".into()],
        };
        assert_eq!(
            err.to_string(),
            "\"Mercury\" may refer to: Mercury (planet), Mercury (element)"
        );
    }

    #[test]
    fn http_error_message() {
        let err = LookupError::Http("HTTP 503".into());
        assert_eq!(err.to_string(), "lookup request failed: HTTP 503");
    }
}
