use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use carbonledger_core::{DomainError, EntityId};
use carbonledger_org::{Entity, Facility, Group, NewEntity, NewFacility, NewGroup};

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Validation, missing parent record or duplicate name.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("directory storage error: {0}")]
    Backend(String),
}

/// Entity lifecycle owner. Records are created and listed; never renamed or removed.
#[async_trait]
pub trait OrgDirectory: Send + Sync {
    /// Fails with `Conflict` if the name is taken.
    async fn create_group(&self, group: NewGroup) -> Result<Group, DirectoryError>;

    async fn list_groups(&self) -> Result<Vec<Group>, DirectoryError>;

    /// Fails with `NotFound` if the group does not exist, `Conflict` if the name is taken.
    async fn create_entity(&self, entity: NewEntity) -> Result<Entity, DirectoryError>;

    async fn list_entities(&self) -> Result<Vec<Entity>, DirectoryError>;

    /// Fails with `NotFound` if the entity does not exist.
    async fn create_facility(&self, facility: NewFacility) -> Result<Facility, DirectoryError>;

    async fn list_facilities(&self) -> Result<Vec<Facility>, DirectoryError>;

    async fn entity_exists(&self, entity_id: EntityId) -> Result<bool, DirectoryError>;
}

#[async_trait]
impl<D> OrgDirectory for Arc<D>
where
    D: OrgDirectory + ?Sized,
{
    async fn create_group(&self, group: NewGroup) -> Result<Group, DirectoryError> {
        (**self).create_group(group).await
    }

    async fn list_groups(&self) -> Result<Vec<Group>, DirectoryError> {
        (**self).list_groups().await
    }

    async fn create_entity(&self, entity: NewEntity) -> Result<Entity, DirectoryError> {
        (**self).create_entity(entity).await
    }

    async fn list_entities(&self) -> Result<Vec<Entity>, DirectoryError> {
        (**self).list_entities().await
    }

    async fn create_facility(&self, facility: NewFacility) -> Result<Facility, DirectoryError> {
        (**self).create_facility(facility).await
    }

    async fn list_facilities(&self) -> Result<Vec<Facility>, DirectoryError> {
        (**self).list_facilities().await
    }

    async fn entity_exists(&self, entity_id: EntityId) -> Result<bool, DirectoryError> {
        (**self).entity_exists(entity_id).await
    }
}
