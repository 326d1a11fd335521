//! Keyword and tag extraction.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

use super::patterns::WORD_TOKEN;

lazy_static! {
    /// Built-in English stopword table.
    pub static ref STOPWORDS: HashSet<&'static str> = [
        "a", "about", "above", "after", "again", "against", "all", "also", "although",
        "am", "among", "an", "and", "another", "any", "are", "around", "as", "at",
        "be", "because", "been", "before", "being", "below", "between", "both", "but",
        "by", "can", "cannot", "could", "did", "does", "doing", "done", "down",
        "during", "each", "either", "else", "enough", "even", "ever", "every", "few",
        "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
        "hers", "herself", "him", "himself", "his", "how", "however", "i", "if", "in",
        "into", "is", "it", "its", "itself", "just", "least", "less", "like", "made",
        "make", "many", "may", "me", "might", "more", "most", "much", "must", "my",
        "myself", "neither", "never", "no", "nor", "not", "now", "of", "off", "often",
        "on", "once", "only", "or", "other", "others", "otherwise", "our", "ours",
        "ourselves", "out", "over", "own", "per", "perhaps", "quite", "rather",
        "really", "same", "several", "shall", "she", "should", "since", "so", "some",
        "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
        "there", "therefore", "these", "they", "this", "those", "though", "through",
        "thus", "to", "too", "under", "until", "up", "upon", "us", "very", "was", "we",
        "well", "were", "what", "whatever", "when", "where", "whether", "which",
        "while", "who", "whom", "whose", "why", "will", "with", "within", "without",
        "would", "yet", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect();
}

/// Ranks tokens by frequency and filters them into keywords and tags.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    limit: usize,
    min_length: usize,
    extra_stopwords: HashSet<String>,
    vocabulary: HashSet<String>,
}

impl KeywordExtractor {
    pub fn new(
        limit: usize,
        min_length: usize,
        extra_stopwords: &[String],
        vocabulary: &[String],
    ) -> Self {
        Self {
            limit,
            min_length,
            extra_stopwords: extra_stopwords.iter().map(|s| s.to_lowercase()).collect(),
            vocabulary: vocabulary.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    fn is_candidate(&self, token: &str) -> bool {
        token.chars().count() >= self.min_length
            && !STOPWORDS.contains(token)
            && !self.extra_stopwords.contains(token)
    }

    /// Top keywords by frequency; ties keep first-occurrence order.
    pub fn keywords(&self, text: &str) -> Vec<String> {
        // token -> (count, first position)
        let mut freq: HashMap<String, (usize, usize)> = HashMap::new();

        for (position, m) in WORD_TOKEN.find_iter(text).enumerate() {
            let token = m.as_str().to_lowercase();
            if !self.is_candidate(&token) {
                continue;
            }
            freq.entry(token)
                .and_modify(|(count, _)| *count += 1)
                .or_insert((1, position));
        }

        let mut ranked: Vec<(String, usize, usize)> = freq
            .into_iter()
            .map(|(token, (count, first))| (token, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .take(self.limit)
            .map(|(token, _, _)| token)
            .collect()
    }

    /// Keywords that belong to the tag vocabulary, in keyword order.
    pub fn tags(&self, keywords: &[String]) -> Vec<String> {
        keywords
            .iter()
            .filter(|k| self.vocabulary.contains(k.as_str()))
            .cloned()
            .collect()
    }
}
