//! Small in-process chat model.
//!
//! Trained at startup on a handful of prompt/response pairs. Text is
//! encoded with a word-index tokenizer and the reply is the response whose
//! prompt has the most similar bag of words. Inputs sharing no word with
//! any prompt get an empty reply, which the router turns into a fallback.

use std::collections::HashMap;

use tracing::info;

use super::ChatModel;

/// Built-in training conversation.
pub const TRAINING_PAIRS: [(&str, &str); 10] = [
    ("hi", "Hello! How can I help you today?"),
    ("hello", "Hi there! What can I do for you?"),
    ("how are you", "I'm doing well, thank you!"),
    ("what is your name", "I'm Ganga, your assistant."),
    (
        "tell me a joke",
        "Why don't scientists trust atoms? Because they make up everything!",
    ),
    (
        "what is the weather",
        "I can't provide real-time weather information, but I can search online for you.",
    ),
    (
        "who is Albert Einstein",
        "Albert Einstein was a theoretical physicist who developed the theory of relativity.",
    ),
    ("what is the capital of France", "The capital of France is Paris."),
    ("exit", "Goodbye! Have a great day."),
    ("quit", "See you later!"),
];

/// Characters stripped before splitting into words.
const FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Word-level tokenizer. Index 0 is reserved for padding; the most frequent
/// word gets index 1, ties keep first-seen order.
#[derive(Debug, Default)]
pub struct Tokenizer {
    word_index: HashMap<String, usize>,
}

impl Tokenizer {
    pub fn words(text: &str) -> Vec<String> {
        text.to_lowercase()
            .chars()
            .map(|c| if FILTERS.contains(c) { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn fit<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for text in texts {
            for word in Self::words(text) {
                match counts.iter_mut().find(|(w, _)| *w == word) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((word, 1)),
                }
            }
        }
        // Stable sort keeps first-seen order among equal counts.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let word_index = counts
            .into_iter()
            .enumerate()
            .map(|(i, (word, _))| (word, i + 1))
            .collect();
        Self { word_index }
    }

    /// Indices of known words; unknown words are skipped.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        Self::words(text)
            .iter()
            .filter_map(|w| self.word_index.get(w).copied())
            .collect()
    }

    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.word_index.get(word).copied()
    }

    /// Vocabulary size including the padding index.
    pub fn vocab_size(&self) -> usize {
        self.word_index.len() + 1
    }
}

pub struct PhraseModel {
    tokenizer: Tokenizer,
    prompts: Vec<Vec<f32>>,
    responses: Vec<String>,
}

impl PhraseModel {
    pub fn train(pairs: &[(&str, &str)]) -> Self {
        let tokenizer = Tokenizer::fit(pairs.iter().flat_map(|(q, a)| [*q, *a]));
        let vocab = tokenizer.vocab_size();
        let prompts = pairs
            .iter()
            .map(|(prompt, _)| unit_bag(&tokenizer.encode(prompt), vocab))
            .collect();
        let responses = pairs.iter().map(|(_, reply)| reply.to_string()).collect();

        info!(pairs = pairs.len(), vocab_size = vocab, "Chat model trained");
        Self {
            tokenizer,
            prompts,
            responses,
        }
    }

    /// Model trained on [`TRAINING_PAIRS`].
    pub fn builtin() -> Self {
        Self::train(&TRAINING_PAIRS)
    }
}

/// L2-normalized bag-of-words vector.
fn unit_bag(ids: &[usize], vocab: usize) -> Vec<f32> {
    let mut bag = vec![0.0f32; vocab];
    for &id in ids {
        bag[id] += 1.0;
    }
    let norm = bag.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        bag.iter_mut().for_each(|x| *x /= norm);
    }
    bag
}

impl ChatModel for PhraseModel {
    fn respond(&self, text: &str) -> String {
        let input = unit_bag(&self.tokenizer.encode(text), self.tokenizer.vocab_size());

        let mut best: Option<(usize, f32)> = None;
        for (i, prompt) in self.prompts.iter().enumerate() {
            let score: f32 = prompt.iter().zip(&input).map(|(a, b)| a * b).sum();
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((i, score));
            }
        }

        best.map(|(i, _)| self.responses[i].clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_strip_punctuation() {
        assert_eq!(
            Tokenizer::words("Hello! How can I help you today?"),
            vec!["hello", "how", "can", "i", "help", "you", "today"]
        );
    }

    #[test]
    fn most_frequent_word_gets_first_index() {
        let tok = Tokenizer::fit(["b a", "a c", "a b"]);
        assert_eq!(tok.index_of("a"), Some(1));
        assert_eq!(tok.index_of("b"), Some(2));
        assert_eq!(tok.index_of("c"), Some(3));
        assert_eq!(tok.vocab_size(), 4);
    }

    #[test]
    fn unknown_words_are_skipped() {
        let tok = Tokenizer::fit(["hello world"]);
        assert_eq!(tok.encode("hello there world"), vec![1, 2]);
    }

    #[test]
    fn exact_prompts_get_their_response() {
        let model = PhraseModel::builtin();
        assert_eq!(model.respond("hi"), "Hello! How can I help you today?");
        assert_eq!(model.respond("What is your name?"), "I'm Ganga, your assistant.");
    }

    #[test]
    fn near_prompts_get_closest_response() {
        let model = PhraseModel::builtin();
        assert_eq!(model.respond("how are you doing"), "I'm doing well, thank you!");
        assert_eq!(
            model.respond("tell me a funny joke"),
            "Why don't scientists trust atoms? Because they make up everything!"
        );
    }

    #[test]
    fn unrelated_input_gets_empty_reply() {
        let model = PhraseModel::builtin();
        assert_eq!(model.respond("blorp zzyzx"), "");
        assert_eq!(model.respond(""), "");
    }
}
