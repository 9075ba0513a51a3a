//! Text tokenizers
//!
//! Every tokenizer is a pure function of its configuration and input:
//! - [`WhitespaceTokenizer`]: strip non-word characters, split on whitespace
//! - [`SimpleChineseTokenizer`]: one token per CJK ideograph, letter or digit
//! - [`UnicodeTokenizer`]: runs of letters, digits and CJK form one token
//! - [`NGramTokenizer`]: sliding character windows
//! - [`CustomTokenizer`]: caller-supplied function
//! - [`StopWordsFilter`]: removes stop words from any base tokenizer
//!
//! Token lengths are counted in characters, not bytes.

mod stopwords;

pub use stopwords::{StopWordsFilter, CHINESE_STOP_WORDS, ENGLISH_STOP_WORDS};

use regex_lite::Regex;
use siftrank_common::config::{StopWordList, TokenizerConfig, TokenizerKind};
use std::fmt;
use std::sync::Arc;

/// Splits text into an ordered sequence of terms
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Whitespace tokenizer over ASCII word characters
#[derive(Debug, Clone)]
pub struct WhitespaceTokenizer {
    lowercase: bool,
    min_length: usize,
    non_word: Regex,
}

impl WhitespaceTokenizer {
    pub fn new(lowercase: bool, min_length: usize) -> Self {
        Self {
            lowercase,
            min_length: min_length.max(1),
            // \w is ASCII-only in regex-lite: [0-9A-Za-z_]
            non_word: Regex::new(r"[^\w\s]").expect("static pattern"),
        }
    }
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self::new(true, 1)
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned = self.non_word.replace_all(text, "");
        cleaned
            .split_whitespace()
            .filter(|t| t.chars().count() >= self.min_length)
            .map(|t| {
                if self.lowercase {
                    t.to_lowercase()
                } else {
                    t.to_string()
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Single-character tokenizer for Chinese and mixed text.
///
/// This is not a dictionary segmenter: every ideograph is its own token.
#[derive(Debug, Clone)]
pub struct SimpleChineseTokenizer {
    lowercase: bool,
    skip_punctuation: bool,
}

impl SimpleChineseTokenizer {
    pub fn new(lowercase: bool, skip_punctuation: bool) -> Self {
        Self { lowercase, skip_punctuation }
    }
}

impl Default for SimpleChineseTokenizer {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl Tokenizer for SimpleChineseTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for c in text.chars() {
            if c.is_whitespace() {
                continue;
            }
            if is_punctuation(c) {
                if !self.skip_punctuation {
                    tokens.push(c.to_string());
                }
                continue;
            }
            if is_cjk(c) {
                tokens.push(c.to_string());
            } else if c.is_alphabetic() {
                tokens.push(fold(c, self.lowercase));
            } else if c.is_numeric() {
                tokens.push(c.to_string());
            }
        }
        tokens
    }

    fn name(&self) -> &str {
        "simple_chinese"
    }
}

/// Groups runs of letters, digits and CJK ideographs into tokens
#[derive(Debug, Clone)]
pub struct UnicodeTokenizer {
    lowercase: bool,
    min_length: usize,
}

impl UnicodeTokenizer {
    pub fn new(lowercase: bool, min_length: usize) -> Self {
        Self {
            lowercase,
            min_length: min_length.max(1),
        }
    }

    fn flush(&self, current: &mut String, len: &mut usize, tokens: &mut Vec<String>) {
        if *len >= self.min_length {
            tokens.push(std::mem::take(current));
        } else {
            current.clear();
        }
        *len = 0;
    }
}

impl Default for UnicodeTokenizer {
    fn default() -> Self {
        Self::new(true, 1)
    }
}

impl Tokenizer for UnicodeTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut len = 0;

        for c in text.chars() {
            if c.is_alphanumeric() || is_cjk(c) {
                if self.lowercase {
                    current.extend(c.to_lowercase());
                } else {
                    current.push(c);
                }
                len += 1;
            } else if len > 0 {
                self.flush(&mut current, &mut len, &mut tokens);
            }
        }
        if len > 0 {
            self.flush(&mut current, &mut len, &mut tokens);
        }
        tokens
    }

    fn name(&self) -> &str {
        "unicode"
    }
}

/// Character n-grams over whitespace-stripped, lowercased text
#[derive(Debug, Clone)]
pub struct NGramTokenizer {
    n: usize,
}

impl NGramTokenizer {
    /// `n == 0` falls back to bigrams
    pub fn new(n: usize) -> Self {
        Self { n: if n == 0 { 2 } else { n } }
    }

    pub fn n(&self) -> usize {
        self.n
    }
}

impl Default for NGramTokenizer {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Tokenizer for NGramTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(|c| c.to_lowercase())
            .collect();

        if chars.is_empty() {
            return Vec::new();
        }
        // Shorter than one window: the whole text is the only gram
        if chars.len() < self.n {
            return vec![chars.into_iter().collect()];
        }

        chars
            .windows(self.n)
            .map(|w| w.iter().collect())
            .collect()
    }

    fn name(&self) -> &str {
        "ngram"
    }
}

type TokenizeFn = dyn Fn(&str) -> Vec<String> + Send + Sync;

/// Wraps a caller-supplied tokenize function without further processing
#[derive(Clone)]
pub struct CustomTokenizer {
    name: String,
    func: Arc<TokenizeFn>,
}

impl CustomTokenizer {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for CustomTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTokenizer").field("name", &self.name).finish()
    }
}

impl Tokenizer for CustomTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        (self.func)(text)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build the tokenizer described by configuration
pub fn from_config(config: &TokenizerConfig) -> Arc<dyn Tokenizer> {
    let base: Arc<dyn Tokenizer> = match config.kind {
        TokenizerKind::Whitespace => {
            Arc::new(WhitespaceTokenizer::new(config.lowercase, config.min_length))
        }
        TokenizerKind::SimpleChinese => Arc::new(SimpleChineseTokenizer::new(
            config.lowercase,
            config.skip_punctuation,
        )),
        TokenizerKind::Unicode => {
            Arc::new(UnicodeTokenizer::new(config.lowercase, config.min_length))
        }
        TokenizerKind::Ngram => Arc::new(NGramTokenizer::new(config.ngram_size)),
    };

    match config.stop_words {
        StopWordList::None => base,
        StopWordList::English => Arc::new(StopWordsFilter::english(base)),
        StopWordList::Chinese => Arc::new(StopWordsFilter::chinese(base)),
    }
}

fn fold(c: char, lowercase: bool) -> String {
    if lowercase {
        c.to_lowercase().collect()
    } else {
        c.to_string()
    }
}

/// Han ideographs, including extensions and compatibility blocks
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2EBEF
        | 0x2F800..=0x2FA1F
        | 0x30000..=0x3134F
        | 0x3005 | 0x3007
    )
}

/// ASCII punctuation, general punctuation, and CJK/full-width punctuation
pub fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(c as u32,
            0x00A1 | 0x00A7 | 0x00AB | 0x00B6 | 0x00B7 | 0x00BB | 0x00BF
            | 0x2010..=0x2027
            | 0x2030..=0x205E
            | 0x3001..=0x3003
            | 0x3008..=0x3011
            | 0x3014..=0x301F
            | 0x30FB
            | 0xFE10..=0xFE19
            | 0xFE30..=0xFE4F
            | 0xFE50..=0xFE6B
            | 0xFF01..=0xFF03
            | 0xFF05..=0xFF0A
            | 0xFF0C..=0xFF0F
            | 0xFF1A | 0xFF1B | 0xFF1F | 0xFF20
            | 0xFF3B..=0xFF3D | 0xFF3F
            | 0xFF5B | 0xFF5D
            | 0xFF5F..=0xFF65
        )
}
