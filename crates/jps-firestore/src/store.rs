//! Document-store abstraction used by the repositories.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{Document, StructuredQuery, Value};

/// Single-document operations plus the two collection reads the
/// repositories need.
///
/// Returned documents carry their resource `name` (ending in the document id)
/// and an opaque `update_time` usable as a write precondition.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document; `None` if it does not exist.
    async fn get_document(&self, collection: &str, doc_id: &str)
        -> FirestoreResult<Option<Document>>;

    /// Create a document, failing with `AlreadyExists` if the id is taken.
    async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document>;

    /// Replace all fields of an existing document.
    ///
    /// `update_time` must match the stored document's last write, else
    /// `PreconditionFailed`. A missing document is `NotFound`.
    async fn replace_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_time: Option<&str>,
    ) -> FirestoreResult<Document>;

    /// Delete a document; a missing document is not an error.
    async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()>;

    /// Every document in `collection`.
    async fn list_documents_all(&self, collection: &str) -> FirestoreResult<Vec<Document>>;

    /// Documents whose `field` equals `value`, ascending by document id.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        limit: Option<u32>,
    ) -> FirestoreResult<Vec<Document>>;
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        self.with_retry("get_document", move || {
            FirestoreClient::get_document(self, collection, doc_id)
        })
        .await
    }

    async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        FirestoreClient::create_document(self, collection, doc_id, fields).await
    }

    async fn replace_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_time: Option<&str>,
    ) -> FirestoreResult<Document> {
        FirestoreClient::replace_document(self, collection, doc_id, fields, update_time).await
    }

    async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        self.with_retry("delete_document", move || {
            FirestoreClient::delete_document(self, collection, doc_id)
        })
        .await
    }

    async fn list_documents_all(&self, collection: &str) -> FirestoreResult<Vec<Document>> {
        self.list_all_documents(collection).await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        limit: Option<u32>,
    ) -> FirestoreResult<Vec<Document>> {
        let query = StructuredQuery::field_equals(collection, field, value, limit);
        self.with_retry("run_query", move || self.run_query(query.clone()))
            .await
    }
}
