//! In-memory document collections.
//!
//! # Responsibilities
//! - Assign object ids and creation/update timestamps
//! - Store documents behind a concurrent map
//! - Return listings newest first
//!
//! # Design Decisions
//! - Documents are cloned out; callers never hold a map guard across an await
//! - Ordering uses an insertion sequence so equal timestamps stay stable

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::error::ConceptError;

/// A 24-hex-digit document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// A fresh id: 4 bytes of seconds since the epoch, 8 random bytes.
    pub fn new() -> Self {
        let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let random = uuid::Uuid::new_v4();
        let tail: String = random.as_bytes()[..8]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Self(format!("{secs:08x}{tail}"))
    }

    pub fn parse(s: &str) -> Result<Self, ConceptError> {
        s.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(s: &str) -> bool {
        s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = ConceptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(ConceptError::BadValues(format!("{s} is not a valid id!")))
        }
    }
}

impl TryFrom<String> for ObjectId {
    type Error = ConceptError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document: base fields plus the concept's own.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Doc<T> {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    #[serde(skip)]
    seq: u64,
    #[serde(flatten)]
    pub data: T,
}

/// A named, thread-safe collection of documents.
#[derive(Clone)]
pub struct DocCollection<T> {
    name: &'static str,
    docs: Arc<DashMap<ObjectId, Doc<T>>>,
    seq: Arc<AtomicU64>,
}

impl<T: Clone> DocCollection<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            docs: Arc::new(DashMap::new()),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Insert a document and return it with its base fields filled in.
    pub fn create_one(&self, data: T) -> Doc<T> {
        let now = Utc::now();
        let doc = Doc {
            id: ObjectId::new(),
            date_created: now,
            date_updated: now,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            data,
        };
        self.docs.insert(doc.id.clone(), doc.clone());
        tracing::trace!(collection = self.name, id = %doc.id, "Document created");
        doc
    }

    pub fn read_one(&self, id: &ObjectId) -> Option<Doc<T>> {
        self.docs.get(id).map(|r| r.value().clone())
    }

    /// First document matching the predicate, oldest first.
    pub fn find_one(&self, filter: impl Fn(&T) -> bool) -> Option<Doc<T>> {
        self.docs
            .iter()
            .filter(|r| filter(&r.value().data))
            .min_by_key(|r| r.value().seq)
            .map(|r| r.value().clone())
    }

    /// All documents matching the predicate, newest first.
    pub fn read_many(&self, filter: impl Fn(&T) -> bool) -> Vec<Doc<T>> {
        let mut docs: Vec<Doc<T>> = self
            .docs
            .iter()
            .filter(|r| filter(&r.value().data))
            .map(|r| r.value().clone())
            .collect();
        docs.sort_by(|a, b| {
            b.date_created
                .cmp(&a.date_created)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        docs
    }

    /// Apply an in-place update. Returns the updated document, or `None` if absent.
    pub fn update_one<R>(&self, id: &ObjectId, update: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut entry = self.docs.get_mut(id)?;
        let doc = entry.value_mut();
        let out = update(&mut doc.data);
        doc.date_updated = Utc::now();
        Some(out)
    }

    pub fn delete_one(&self, id: &ObjectId) -> Option<Doc<T>> {
        self.docs.remove(id).map(|(_, doc)| doc)
    }

    /// Delete every matching document; returns how many went.
    pub fn delete_many(&self, filter: impl Fn(&T) -> bool) -> usize {
        let before = self.docs.len();
        self.docs.retain(|_, doc| !filter(&doc.data));
        before - self.docs.len()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, PartialEq)]
    struct Note {
        text: String,
    }

    fn note(text: &str) -> Note {
        Note { text: text.into() }
    }

    #[test]
    fn test_object_id_format() {
        let id = ObjectId::new();
        assert!(ObjectId::is_valid(id.as_str()));
        assert_ne!(id, ObjectId::new());

        assert!(ObjectId::parse("65a1b2c3d4e5f60718293a4b").is_ok());
        assert!(ObjectId::parse("not-an-id").is_err());
        assert!(ObjectId::parse("65a1b2c3d4e5f60718293a4").is_err());
    }

    #[test]
    fn test_create_read_update_delete() {
        let notes = DocCollection::new("notes");
        let doc = notes.create_one(note("a"));
        assert_eq!(notes.read_one(&doc.id).unwrap().data, note("a"));

        notes.update_one(&doc.id, |n| n.text = "b".into()).unwrap();
        let updated = notes.read_one(&doc.id).unwrap();
        assert_eq!(updated.data.text, "b");
        assert!(updated.date_updated >= updated.date_created);

        assert!(notes.delete_one(&doc.id).is_some());
        assert!(notes.read_one(&doc.id).is_none());
        assert!(notes.update_one(&doc.id, |_| ()).is_none());
    }

    #[test]
    fn test_read_many_newest_first() {
        let notes = DocCollection::new("notes");
        notes.create_one(note("first"));
        notes.create_one(note("second"));
        notes.create_one(note("third"));

        let texts: Vec<_> = notes
            .read_many(|_| true)
            .into_iter()
            .map(|d| d.data.text)
            .collect();
        assert_eq!(texts, vec!["third", "second", "first"]);

        assert_eq!(notes.find_one(|_| true).unwrap().data.text, "first");
        assert_eq!(notes.delete_many(|n| n.text != "second"), 2);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_doc_serialization() {
        let notes = DocCollection::new("notes");
        let doc = notes.create_one(note("x"));
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_id"], doc.id.as_str());
        assert_eq!(value["text"], "x");
        assert!(value.get("dateCreated").is_some());
        assert!(value.get("seq").is_none());
    }
}
