//! Document model shared by every retrieval path
//!
//! Documents are plain content plus free-form metadata. They carry no
//! guaranteed identity, so merging across ranked lists uses a derived
//! [`DocumentKey`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Metadata field consulted first when deriving a document key
pub const ID_FIELD: &str = "id";

/// Number of content characters used when no metadata id is present
pub const KEY_PREFIX_CHARS: usize = 100;

/// A retrievable unit of text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text content indexed and searched
    pub content: String,

    /// Arbitrary metadata carried alongside the content
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Document {
    /// Create a document without metadata
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach a stable identifier under the `id` metadata field
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_metadata(ID_FIELD, Value::String(id.into()))
    }

    /// The metadata id, if present and non-empty.
    ///
    /// Strings are used verbatim; numbers and booleans are rendered.
    /// Null, arrays and objects are ignored.
    pub fn id(&self) -> Option<String> {
        match self.metadata.get(ID_FIELD)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Merge key using the default strategy
    pub fn key(&self) -> DocumentKey {
        KeyStrategy::default().key_for(self)
    }

    /// Hex-encoded SHA-256 of the content
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Identity used to merge the same document across ranked lists
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a [`DocumentKey`] is derived when a document has no metadata id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Metadata id, else the first 100 characters of content.
    ///
    /// Long documents sharing a prefix collide under this strategy.
    #[default]
    MetadataOrPrefix,

    /// Metadata id, else a SHA-256 hash of the full content
    MetadataOrContentHash,
}

impl KeyStrategy {
    pub fn key_for(&self, doc: &Document) -> DocumentKey {
        if let Some(id) = doc.id() {
            return DocumentKey(format!("id:{}", id));
        }

        match self {
            KeyStrategy::MetadataOrPrefix => {
                let prefix: String = doc.content.chars().take(KEY_PREFIX_CHARS).collect();
                DocumentKey(format!("content:{}", prefix))
            }
            KeyStrategy::MetadataOrContentHash => {
                DocumentKey(format!("sha256:{}", doc.content_hash()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefers_metadata_id() {
        let a = Document::new("alpha").with_id("doc-1");
        let b = Document::new("something else entirely").with_id("doc-1");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_empty_id_falls_back_to_content() {
        let doc = Document::new("hello world").with_metadata("id", "");
        assert_eq!(doc.id(), None);
        assert_eq!(doc.key(), Document::new("hello world").key());
    }

    #[test]
    fn test_numeric_id() {
        let doc = Document::new("x").with_metadata("id", 42);
        assert_eq!(doc.id().as_deref(), Some("42"));
    }

    #[test]
    fn test_prefix_truncates_on_characters() {
        // 150 multi-byte characters; slicing bytes at 100 would split one
        let long: String = "数据".repeat(75);
        let key = Document::new(long.clone()).key();
        let prefix: String = long.chars().take(KEY_PREFIX_CHARS).collect();
        assert_eq!(key.as_str(), format!("content:{}", prefix));
    }

    #[test]
    fn test_shared_prefix_collides_unless_hashed() {
        let base = "a".repeat(KEY_PREFIX_CHARS);
        let a = Document::new(format!("{}tail one", base));
        let b = Document::new(format!("{}tail two", base));

        assert_eq!(a.key(), b.key());

        let hashed = KeyStrategy::MetadataOrContentHash;
        assert_ne!(hashed.key_for(&a), hashed.key_for(&b));
    }

    #[test]
    fn test_metadata_and_content_keys_do_not_mix() {
        let by_id = Document::new("irrelevant").with_id("shared");
        let by_content = Document::new("shared");
        assert_ne!(by_id.key(), by_content.key());
    }

    #[test]
    fn test_serde_roundtrip_defaults_metadata() {
        let doc: Document = serde_json::from_str(r#"{"content":"text"}"#).unwrap();
        assert!(doc.metadata.is_empty());
    }
}
