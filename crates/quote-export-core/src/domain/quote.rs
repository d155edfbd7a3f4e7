//! Quote model: source rows and the blobs derived from them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One row of the `Quotes` table. Read-only from the exporter's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub id: i64,
    pub quote: String,
    pub author: String,
}

impl QuoteRecord {
    pub fn new(id: i64, quote: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id,
            quote: quote.into(),
            author: author.into(),
        }
    }
}

/// Object key for an exported quote.
///
/// The `quote-{id}.txt` scheme is read by external consumers of the bucket,
/// so it must not change. Same id, same key: re-running an export overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey(String);

impl BlobKey {
    pub fn for_quote(id: i64) -> Self {
        Self(format!("quote-{id}.txt"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-memory body of one blob: `quote`, a single space, `author`.
///
/// No escaping and no trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportUnit {
    pub key: BlobKey,
    pub body: String,
}

impl ExportUnit {
    pub fn from_record(record: &QuoteRecord) -> Self {
        Self {
            key: BlobKey::for_quote(record.id),
            body: format!("{} {}", record.quote, record.author),
        }
    }

    pub fn into_parts(self) -> (BlobKey, Bytes) {
        (self.key, Bytes::from(self.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn key_follows_naming_scheme() {
        assert_eq!(BlobKey::for_quote(1).as_str(), "quote-1.txt");
        assert_eq!(BlobKey::for_quote(10).to_string(), "quote-10.txt");
    }

    #[test]
    fn distinct_ids_never_share_a_key() {
        // 1 と 11、10 と 1 など桁の境目でも衝突しないこと
        let keys: HashSet<BlobKey> = (0..=1_000).map(BlobKey::for_quote).collect();
        assert_eq!(keys.len(), 1_001);
    }

    #[test]
    fn negative_id_keeps_its_sign() {
        assert_eq!(BlobKey::for_quote(-3).as_str(), "quote--3.txt");
        assert_ne!(BlobKey::for_quote(-3), BlobKey::for_quote(3));
    }

    #[test]
    fn body_is_quote_space_author() {
        let unit = ExportUnit::from_record(&QuoteRecord::new(7, "Hi", "Bob"));
        assert_eq!(unit.key.as_str(), "quote-7.txt");
        assert_eq!(unit.body, "Hi Bob");

        let (_, bytes) = unit.into_parts();
        assert_eq!(&bytes[..], b"Hi Bob");
    }

    #[test]
    fn body_keeps_text_verbatim() {
        let unit = ExportUnit::from_record(&QuoteRecord::new(2, "Say \"no\"\n", "Анна"));
        assert_eq!(unit.body, "Say \"no\"\n Анна");
    }
}
