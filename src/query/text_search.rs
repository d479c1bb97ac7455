//! Text analysis for the lexeme index
//!
//! Documents and queries go through the same analyzer so that both sides
//! agree on what a term is. A query matches a document when any of its
//! lexemes occurs in the document (OR semantics), so multi-word questions
//! like "who is the fox?" match on their content words.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::OnceLock;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("static token pattern"))
}

/// English stop words removed by `TextSearchConfig::English`
const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now",
];

/// Text search configuration, named after the dictionaries it applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSearchConfig {
    /// Lowercase, drop English stop words, strip common suffixes
    #[default]
    English,
    /// Lowercase only
    Simple,
}

impl TextSearchConfig {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextSearchConfig::English => "english",
            TextSearchConfig::Simple => "simple",
        }
    }
}

impl FromStr for TextSearchConfig {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "english" => Ok(TextSearchConfig::English),
            "simple" => Ok(TextSearchConfig::Simple),
            _ => Err(crate::Error::InvalidTextSearchConfig(s.to_string())),
        }
    }
}

impl std::fmt::Display for TextSearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Turns text into lexemes
#[derive(Debug, Clone)]
pub struct TextAnalyzer {
    config: TextSearchConfig,
    stop_words: HashSet<&'static str>,
}

impl TextAnalyzer {
    pub fn new(config: TextSearchConfig) -> Self {
        let stop_words = match config {
            TextSearchConfig::English => ENGLISH_STOP_WORDS.iter().copied().collect(),
            TextSearchConfig::Simple => HashSet::new(),
        };
        Self { config, stop_words }
    }

    pub fn config(&self) -> TextSearchConfig {
        self.config
    }

    /// All lexemes of `text`, in order, repeats kept
    pub fn lexemes(&self, text: &str) -> Vec<String> {
        token_re()
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .filter(|token| !self.stop_words.contains(token.as_str()))
            .map(|token| match self.config {
                TextSearchConfig::English => stem(&token),
                TextSearchConfig::Simple => token,
            })
            .collect()
    }

    /// Lexeme frequencies of a document, as stored in the lexeme index
    pub fn document_terms(&self, text: &str) -> BTreeMap<String, u32> {
        let mut terms = BTreeMap::new();
        for lexeme in self.lexemes(text) {
            *terms.entry(lexeme).or_insert(0) += 1;
        }
        terms
    }

    /// Distinct lexemes of a query, in order of first appearance
    pub fn query_terms(&self, query: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.lexemes(query)
            .into_iter()
            .filter(|lexeme| seen.insert(lexeme.clone()))
            .collect()
    }
}

/// Light suffix stripping: plurals, `-ed` and `-ing`.
///
/// Short words are left alone. Applied to documents and queries alike, so
/// the only requirement is that related forms collapse to the same stem.
fn stem(word: &str) -> String {
    let len = word.chars().count();
    if len <= 3 || !word.is_ascii() {
        return word.to_string();
    }

    if let Some(base) = word.strip_suffix("ies") {
        if len > 4 {
            return format!("{}y", base);
        }
    }
    for suffix in ["sses", "xes", "ches", "shes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && !word.ends_with("is") {
        return word[..word.len() - 1].to_string();
    }
    if len >= 6 {
        if let Some(base) = word.strip_suffix("ing") {
            return base.to_string();
        }
    }
    if len >= 5 {
        if let Some(base) = word.strip_suffix("ed") {
            return base.to_string();
        }
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_reduces_to_content_words() {
        let analyzer = TextAnalyzer::new(TextSearchConfig::English);
        assert_eq!(analyzer.query_terms("who is the fox?"), vec!["fox"]);
    }

    #[test]
    fn test_document_terms_count_repeats() {
        let analyzer = TextAnalyzer::new(TextSearchConfig::English);
        let terms = analyzer.document_terms("The fox and the hound, the fox again");
        assert_eq!(terms.get("fox"), Some(&2));
        assert_eq!(terms.get("hound"), Some(&1));
        assert!(!terms.contains_key("the"));
    }

    #[test]
    fn test_related_forms_share_a_stem() {
        let analyzer = TextAnalyzer::new(TextSearchConfig::English);
        assert_eq!(analyzer.lexemes("jumped jumps jumping"), vec!["jump", "jump", "jump"]);
        assert_eq!(analyzer.lexemes("foxes boxes"), vec!["fox", "box"]);
        assert_eq!(analyzer.lexemes("stories"), vec!["story"]);
        assert_eq!(analyzer.lexemes("glass status"), vec!["glass", "status"]);
    }

    #[test]
    fn test_simple_config_keeps_everything() {
        let analyzer = TextAnalyzer::new(TextSearchConfig::Simple);
        assert_eq!(analyzer.query_terms("Who is THE fox? the"), vec!["who", "is", "the", "fox"]);
    }

    #[test]
    fn test_punctuation_only_query_has_no_terms() {
        let analyzer = TextAnalyzer::new(TextSearchConfig::English);
        assert!(analyzer.query_terms("?! ...").is_empty());
        assert!(analyzer.query_terms("the and of").is_empty());
    }

    #[test]
    fn test_config_parse() {
        assert_eq!("Simple".parse::<TextSearchConfig>().unwrap(), TextSearchConfig::Simple);
        assert!(matches!(
            "german".parse::<TextSearchConfig>(),
            Err(crate::Error::InvalidTextSearchConfig(name)) if name == "german"
        ));
    }
}
