//! In-memory [`DocumentStore`].
//!
//! Intended for tests/dev. Mirrors the Firestore behaviors the repositories
//! depend on: create conflicts, `updateTime` preconditions and idempotent
//! deletes. Listing returns documents in insertion order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::RwLock;

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::DocumentStore;
use crate::types::{Document, Value};

#[derive(Debug, Clone)]
struct StoredDocument {
    seq: u64,
    fields: HashMap<String, Value>,
    create_time: String,
    update_time: String,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, HashMap<String, StoredDocument>>,
    next_seq: u64,
    last_write_nanos: i64,
}

impl State {
    /// Write timestamps are strictly increasing, even within one clock tick.
    fn next_write_time(&mut self) -> String {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        let nanos = now.max(self.last_write_nanos + 1);
        self.last_write_nanos = nanos;
        DateTime::from_timestamp_nanos(nanos).to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}

/// Document store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .map_or(0, HashMap::len)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }

    fn to_document(collection: &str, doc_id: &str, stored: &StoredDocument) -> Document {
        Document {
            name: Some(format!("{}/{}", collection, doc_id)),
            fields: Some(stored.fields.clone()),
            create_time: Some(stored.create_time.clone()),
            update_time: Some(stored.update_time.clone()),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .map(|stored| Self::to_document(collection, doc_id, stored)))
    }

    async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let mut state = self.state.write().await;
        let exists = state
            .collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(doc_id));
        if exists {
            return Err(FirestoreError::AlreadyExists(format!(
                "{}/{}",
                collection, doc_id
            )));
        }

        let now = state.next_write_time();
        let seq = state.next_seq;
        state.next_seq += 1;

        let stored = StoredDocument {
            seq,
            fields,
            create_time: now.clone(),
            update_time: now,
        };
        let doc = Self::to_document(collection, doc_id, &stored);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc_id.to_string(), stored);
        Ok(doc)
    }

    async fn replace_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_time: Option<&str>,
    ) -> FirestoreResult<Document> {
        let mut state = self.state.write().await;
        let now = state.next_write_time();

        let stored = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(doc_id))
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", collection, doc_id)))?;

        if let Some(expected) = update_time {
            if stored.update_time != expected {
                return Err(FirestoreError::PreconditionFailed(format!(
                    "{}/{}: last written at {}, not {}",
                    collection, doc_id, stored.update_time, expected
                )));
            }
        }

        stored.fields = fields;
        stored.update_time = now;
        Ok(Self::to_document(collection, doc_id, stored))
    }

    async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(docs) = state.collections.get_mut(collection) {
            docs.remove(doc_id);
        }
        Ok(())
    }

    async fn list_documents_all(&self, collection: &str) -> FirestoreResult<Vec<Document>> {
        let state = self.state.read().await;
        let Some(docs) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<_> = docs.iter().collect();
        entries.sort_by_key(|(_, stored)| stored.seq);
        Ok(entries
            .into_iter()
            .map(|(id, stored)| Self::to_document(collection, id, stored))
            .collect())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        limit: Option<u32>,
    ) -> FirestoreResult<Vec<Document>> {
        let state = self.state.read().await;
        let Some(docs) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<_> = docs
            .iter()
            .filter(|(_, stored)| stored.fields.get(field) == Some(&value))
            .collect();
        matches.sort_by(|(a, _), (b, _)| a.cmp(b));

        let limit = limit.map_or(usize::MAX, |l| l as usize);
        Ok(matches
            .into_iter()
            .take(limit)
            .map(|(id, stored)| Self::to_document(collection, id, stored))
            .collect())
    }
}
