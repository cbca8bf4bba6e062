use std::sync::RwLock;

use async_trait::async_trait;

use carbonledger_core::{DomainError, EntityId, FacilityId, GroupId};
use carbonledger_org::{Entity, Facility, Group, NewEntity, NewFacility, NewGroup};

use super::r#trait::{DirectoryError, OrgDirectory};

#[derive(Debug, Default)]
struct OrgTables {
    groups: Vec<Group>,
    entities: Vec<Entity>,
    facilities: Vec<Facility>,
}

/// In-memory organization directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrgDirectory {
    tables: RwLock<OrgTables>,
}

impl InMemoryOrgDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> DirectoryError {
    DirectoryError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl OrgDirectory for InMemoryOrgDirectory {
    async fn create_group(&self, group: NewGroup) -> Result<Group, DirectoryError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if tables.groups.iter().any(|g| g.name == group.name) {
            return Err(DomainError::conflict(format!("group '{}' already exists", group.name)).into());
        }
        let stored = group.into_group(GroupId::new(tables.groups.len() as i64 + 1));
        tables.groups.push(stored.clone());
        Ok(stored)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, DirectoryError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.groups.clone())
    }

    async fn create_entity(&self, entity: NewEntity) -> Result<Entity, DirectoryError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if !tables.groups.iter().any(|g| g.id == entity.group_id) {
            return Err(DomainError::not_found(format!("group {}", entity.group_id)).into());
        }
        if tables.entities.iter().any(|e| e.name == entity.name) {
            return Err(DomainError::conflict(format!("entity '{}' already exists", entity.name)).into());
        }
        let stored = entity.into_entity(EntityId::new(tables.entities.len() as i64 + 1));
        tables.entities.push(stored.clone());
        Ok(stored)
    }

    async fn list_entities(&self) -> Result<Vec<Entity>, DirectoryError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.entities.clone())
    }

    async fn create_facility(&self, facility: NewFacility) -> Result<Facility, DirectoryError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if !tables.entities.iter().any(|e| e.id == facility.entity_id) {
            return Err(DomainError::not_found(format!("entity {}", facility.entity_id)).into());
        }
        let stored = facility.into_facility(FacilityId::new(tables.facilities.len() as i64 + 1));
        tables.facilities.push(stored.clone());
        Ok(stored)
    }

    async fn list_facilities(&self) -> Result<Vec<Facility>, DirectoryError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.facilities.clone())
    }

    async fn entity_exists(&self, entity_id: EntityId) -> Result<bool, DirectoryError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.entities.iter().any(|e| e.id == entity_id))
    }
}
