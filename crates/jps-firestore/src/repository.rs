//! Collection-level persistence shared by the typed repositories.
//!
//! Writes are guarded twice: the entity's `version` must match the stored
//! one, and the replace carries the stored `updateTime` as a precondition so
//! a write that lands between our read and our write is detected too.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use jps_models::{entity, ObjectId};
use tracing::{debug, info, warn};

use crate::error::{FirestoreError, FirestoreResult};
use crate::mapping::{DocumentMapping, FIELD_VERSION};
use crate::metrics::record_conflict;
use crate::store::DocumentStore;
use crate::types::{Document, Value};

/// Attempts for a read-modify-write before giving up.
pub const MAX_MODIFY_ATTEMPTS: u32 = 5;

/// Base backoff between read-modify-write attempts.
const MODIFY_BACKOFF_MS: u64 = 20;

/// Typed view of one collection.
pub struct Collection<E> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Collection<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E: DocumentMapping + Send> Collection<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    fn path(id: &ObjectId) -> String {
        format!("{}/{}", E::COLLECTION, id)
    }

    /// Point lookup by id.
    pub async fn find_by_id(&self, id: &ObjectId) -> FirestoreResult<Option<E>> {
        Ok(self.load(id).await?.map(|(entity, _)| entity))
    }

    /// Entity plus the `updateTime` of the document it was read from.
    async fn load(&self, id: &ObjectId) -> FirestoreResult<Option<(E, Option<String>)>> {
        match self.store.get_document(E::COLLECTION, &id.to_hex()).await? {
            Some(doc) => {
                let entity = E::from_document(&doc)?;
                Ok(Some((entity, doc.update_time)))
            }
            None => Ok(None),
        }
    }

    pub async fn exists(&self, id: &ObjectId) -> FirestoreResult<bool> {
        Ok(self
            .store
            .get_document(E::COLLECTION, &id.to_hex())
            .await?
            .is_some())
    }

    /// Every record, in the store's listing order.
    pub async fn find_all(&self) -> FirestoreResult<Vec<E>> {
        self.store
            .list_documents_all(E::COLLECTION)
            .await?
            .iter()
            .map(E::from_document)
            .collect()
    }

    /// Records whose `field` equals `value`, ascending by id.
    pub async fn find_by_field(
        &self,
        field: &str,
        value: Value,
        limit: Option<u32>,
    ) -> FirestoreResult<Vec<E>> {
        self.store
            .find_by_field(E::COLLECTION, field, value, limit)
            .await?
            .iter()
            .map(E::from_document)
            .collect()
    }

    /// Remove a record. Missing records are not an error; nothing cascades.
    pub async fn delete_by_id(&self, id: &ObjectId) -> FirestoreResult<()> {
        self.store.delete_document(E::COLLECTION, &id.to_hex()).await?;
        info!(collection = E::COLLECTION, id = %id, "Deleted document");
        Ok(())
    }

    /// Insert or fully replace a record.
    ///
    /// - no id: a new id is assigned and the record created at version 1
    /// - id at version 0 with nothing stored: created under that id
    /// - stored record: versions must match, then replaced at version + 1
    /// - id at version > 0 with nothing stored: `NotFound`
    pub async fn save(&self, mut entity: E) -> FirestoreResult<E> {
        let id = match entity.id() {
            Some(id) => id,
            None => {
                let id = ObjectId::new();
                entity.assign_identity(id, 0)?;
                return self.create(entity, id).await;
            }
        };

        match self.store.get_document(E::COLLECTION, &id.to_hex()).await? {
            Some(doc) => {
                let found = stored_version(&doc, &Self::path(&id))?;
                if found != entity.version() {
                    return Err(self.conflict(&id, entity.version(), found));
                }
                self.replace(entity, id, doc.update_time.as_deref()).await
            }
            None if entity.version() == 0 => self.create(entity, id).await,
            None => Err(FirestoreError::not_found(Self::path(&id))),
        }
    }

    /// Read-modify-write of one record, retried when another writer wins.
    ///
    /// `mutate` reports whether it changed anything; unchanged records are not
    /// written. Returns `None` if the record does not exist.
    pub async fn modify<F>(&self, id: &ObjectId, mut mutate: F) -> FirestoreResult<Option<(E, bool)>>
    where
        F: FnMut(&mut E) -> bool + Send,
    {
        let mut last_error = None;

        for attempt in 0..MAX_MODIFY_ATTEMPTS {
            let Some((mut entity, update_time)) = self.load(id).await? else {
                return Ok(None);
            };

            if !mutate(&mut entity) {
                return Ok(Some((entity, false)));
            }

            match self.replace(entity, *id, update_time.as_deref()).await {
                Ok(saved) => return Ok(Some((saved, true))),
                Err(e) if e.is_conflict() => {
                    debug!(
                        collection = E::COLLECTION,
                        id = %id,
                        attempt = attempt + 1,
                        "Concurrent write detected, retrying"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(
                        MODIFY_BACKOFF_MS * (attempt as u64 + 1),
                    ))
                    .await;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            collection = E::COLLECTION,
            id = %id,
            "Giving up after {} conflicting attempts: {:?}",
            MAX_MODIFY_ATTEMPTS,
            last_error
        );
        Err(last_error.unwrap_or_else(|| {
            FirestoreError::request_failed(format!("{} kept conflicting", Self::path(id)))
        }))
    }

    async fn create(&self, mut entity: E, id: ObjectId) -> FirestoreResult<E> {
        entity.mark_saved(1, entity::now());

        match self
            .store
            .create_document(E::COLLECTION, &id.to_hex(), entity.to_fields())
            .await
        {
            Ok(_) => {
                info!(collection = E::COLLECTION, id = %id, "Created document");
                Ok(entity)
            }
            // Someone else created the id between our read and our write.
            Err(FirestoreError::AlreadyExists(_)) => {
                let found = self.current_version(&id).await.unwrap_or(1);
                Err(self.conflict(&id, 0, found))
            }
            Err(e) => Err(e),
        }
    }

    /// Write `entity` over the stored record it was read at.
    async fn replace(
        &self,
        mut entity: E,
        id: ObjectId,
        update_time: Option<&str>,
    ) -> FirestoreResult<E> {
        let expected = entity.version();
        entity.mark_saved(expected + 1, entity::now());

        match self
            .store
            .replace_document(E::COLLECTION, &id.to_hex(), entity.to_fields(), update_time)
            .await
        {
            Ok(_) => {
                debug!(
                    collection = E::COLLECTION,
                    id = %id,
                    version = entity.version(),
                    "Replaced document"
                );
                Ok(entity)
            }
            Err(e) if e.is_precondition_failed() => {
                let found = self.current_version(&id).await.unwrap_or(expected);
                Err(self.conflict(&id, expected, found))
            }
            Err(e) => Err(e),
        }
    }

    async fn current_version(&self, id: &ObjectId) -> Option<u64> {
        let doc = self
            .store
            .get_document(E::COLLECTION, &id.to_hex())
            .await
            .ok()??;
        doc.get(FIELD_VERSION)
    }

    fn conflict(&self, id: &ObjectId, expected: u64, found: u64) -> FirestoreError {
        record_conflict(E::COLLECTION);
        warn!(
            collection = E::COLLECTION,
            id = %id,
            expected,
            found,
            "Version conflict"
        );
        FirestoreError::VersionConflict {
            path: Self::path(id),
            expected,
            found,
        }
    }
}

fn stored_version(doc: &Document, path: &str) -> FirestoreResult<u64> {
    doc.get(FIELD_VERSION)
        .ok_or_else(|| FirestoreError::invalid_document(path, "missing field `version`"))
}
