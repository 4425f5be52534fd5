//! Identity shared by all persisted records.

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{ModelError, ModelResult};
use crate::object_id::ObjectId;

/// A persisted domain record.
///
/// `id` is unset until the first save and never changes afterwards. `version`
/// starts at 0 and is bumped by the storage layer on every successful write;
/// it is the optimistic-concurrency token checked on replace.
pub trait Entity {
    /// Collection the records live in.
    const COLLECTION: &'static str;

    fn id(&self) -> Option<ObjectId>;

    fn version(&self) -> u64;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Storage hook: bind an identifier and version to a record.
    ///
    /// Fails if the record already carries a different identifier.
    fn assign_identity(&mut self, id: ObjectId, version: u64) -> ModelResult<()>;

    /// Storage hook: record a successful write.
    fn mark_saved(&mut self, version: u64, at: DateTime<Utc>);

    fn is_new(&self) -> bool {
        self.version() == 0
    }
}

/// Current time at the microsecond precision the document store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Set `slot` to `id` unless it already holds a different id.
pub(crate) fn assign_once(slot: &mut Option<ObjectId>, id: ObjectId) -> ModelResult<()> {
    match *slot {
        Some(existing) if existing != id => Err(ModelError::IdentityAlreadyAssigned(format!(
            "{} cannot become {}",
            existing, id
        ))),
        _ => {
            *slot = Some(id);
            Ok(())
        }
    }
}

/// Implements [`Entity`] for a struct with private `id`, `version`,
/// `created_at` and `updated_at` fields.
macro_rules! impl_entity {
    ($ty:ty, $collection:expr) => {
        impl $crate::entity::Entity for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> Option<$crate::object_id::ObjectId> {
                self.id
            }

            fn version(&self) -> u64 {
                self.version
            }

            fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> chrono::DateTime<chrono::Utc> {
                self.updated_at
            }

            fn assign_identity(
                &mut self,
                id: $crate::object_id::ObjectId,
                version: u64,
            ) -> $crate::error::ModelResult<()> {
                $crate::entity::assign_once(&mut self.id, id)?;
                self.version = version;
                Ok(())
            }

            fn mark_saved(&mut self, version: u64, at: chrono::DateTime<chrono::Utc>) {
                self.version = version;
                self.updated_at = at;
            }
        }
    };
}

pub(crate) use impl_entity;
