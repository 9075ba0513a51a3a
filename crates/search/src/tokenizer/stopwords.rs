//! Stop-word filtering

use super::Tokenizer;
use std::collections::HashSet;
use std::sync::Arc;

/// Common English function words
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Common Chinese function words and particles
pub const CHINESE_STOP_WORDS: &[&str] = &[
    "的", "了", "和", "是", "就", "都", "而", "及", "与", "着", "或", "一个", "没有", "我们",
    "你们", "他们", "她们", "它们", "这", "那", "这个", "那个", "之", "在", "也", "很", "把",
    "被", "让", "给", "对", "从", "向", "于", "以", "为", "所", "其", "但", "并", "等", "啊",
    "吧", "呢", "吗", "哦", "呀", "嗯", "么", "个", "有", "我", "你", "他", "她", "它", "不",
    "上", "下", "中", "里", "又", "还", "则", "即", "如", "若", "因", "此", "由",
];

/// Removes stop words from the output of a base tokenizer.
///
/// Matching is case-insensitive; surviving tokens keep the base tokenizer's casing.
#[derive(Clone)]
pub struct StopWordsFilter {
    base: Arc<dyn Tokenizer>,
    stop_words: HashSet<String>,
}

impl StopWordsFilter {
    pub fn new<I, S>(base: Arc<dyn Tokenizer>, stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            base,
            stop_words: stop_words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn english(base: Arc<dyn Tokenizer>) -> Self {
        Self::new(base, ENGLISH_STOP_WORDS)
    }

    pub fn chinese(base: Arc<dyn Tokenizer>) -> Self {
        Self::new(base, CHINESE_STOP_WORDS)
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(&token.to_lowercase())
    }
}

impl Tokenizer for StopWordsFilter {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.base
            .tokenize(text)
            .into_iter()
            .filter(|t| !self.is_stop_word(t))
            .collect()
    }

    fn name(&self) -> &str {
        "stop_words"
    }
}
