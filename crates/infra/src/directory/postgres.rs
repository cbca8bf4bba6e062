//! Postgres-backed organization directory.
//!
//! Referential and uniqueness rules are enforced by the schema; violations are
//! mapped back to domain errors (`23503` → `NotFound`, `23505` → `Conflict`,
//! `23514` → `Validation`).

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use carbonledger_core::{DomainError, EntityId, FacilityId, GroupId};
use carbonledger_org::{Entity, Facility, Group, NewEntity, NewFacility, NewGroup};

use super::r#trait::{DirectoryError, OrgDirectory};
use crate::db::{SqlFailure, classify, describe};

#[derive(Debug, Clone)]
pub struct PostgresOrgDirectory {
    pool: PgPool,
}

impl PostgresOrgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrgDirectory for PostgresOrgDirectory {
    #[instrument(skip(self), err)]
    async fn create_group(&self, group: NewGroup) -> Result<Group, DirectoryError> {
        let id: i64 = sqlx::query_scalar("INSERT INTO groups (name) VALUES ($1) RETURNING id")
            .bind(&group.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_group", &format!("group '{}'", group.name), e))?;
        Ok(group.into_group(GroupId::new(id)))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, DirectoryError> {
        let rows = sqlx::query("SELECT id, name FROM groups ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_groups", "groups", e))?;

        rows.iter()
            .map(|row| -> Result<Group, DirectoryError> {
                Ok(Group {
                    id: GroupId::new(row.try_get("id").map_err(backend)?),
                    name: row.try_get("name").map_err(backend)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn create_entity(&self, entity: NewEntity) -> Result<Entity, DirectoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO entities (group_id, name, yearly_budget_tco2e) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(entity.group_id.get())
        .bind(&entity.name)
        .bind(entity.yearly_budget_tco2e)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let subject = match classify(&e) {
                SqlFailure::ForeignKeyViolation => format!("group {}", entity.group_id),
                _ => format!("entity '{}'", entity.name),
            };
            map_sqlx_error("create_entity", &subject, e)
        })?;
        Ok(entity.into_entity(EntityId::new(id)))
    }

    async fn list_entities(&self) -> Result<Vec<Entity>, DirectoryError> {
        let rows = sqlx::query(
            "SELECT id, group_id, name, yearly_budget_tco2e FROM entities ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_entities", "entities", e))?;

        rows.iter()
            .map(|row| -> Result<Entity, DirectoryError> {
                Ok(Entity {
                    id: EntityId::new(row.try_get("id").map_err(backend)?),
                    group_id: GroupId::new(row.try_get("group_id").map_err(backend)?),
                    name: row.try_get("name").map_err(backend)?,
                    yearly_budget_tco2e: row.try_get("yearly_budget_tco2e").map_err(backend)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn create_facility(&self, facility: NewFacility) -> Result<Facility, DirectoryError> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO facilities (entity_id, name) VALUES ($1, $2) RETURNING id")
                .bind(facility.entity_id.get())
                .bind(&facility.name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    map_sqlx_error("create_facility", &format!("entity {}", facility.entity_id), e)
                })?;
        Ok(facility.into_facility(FacilityId::new(id)))
    }

    async fn list_facilities(&self) -> Result<Vec<Facility>, DirectoryError> {
        let rows = sqlx::query("SELECT id, entity_id, name FROM facilities ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_facilities", "facilities", e))?;

        rows.iter()
            .map(|row| -> Result<Facility, DirectoryError> {
                Ok(Facility {
                    id: FacilityId::new(row.try_get("id").map_err(backend)?),
                    entity_id: EntityId::new(row.try_get("entity_id").map_err(backend)?),
                    name: row.try_get("name").map_err(backend)?,
                })
            })
            .collect()
    }

    async fn entity_exists(&self, entity_id: EntityId) -> Result<bool, DirectoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM entities WHERE id = $1)")
            .bind(entity_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("entity_exists", "entities", e))
    }
}

/// `subject` names the record the violated rule is about.
fn map_sqlx_error(operation: &str, subject: &str, err: sqlx::Error) -> DirectoryError {
    match classify(&err) {
        SqlFailure::ForeignKeyViolation => DomainError::not_found(subject).into(),
        SqlFailure::UniqueViolation => {
            DomainError::conflict(format!("{subject} already exists")).into()
        }
        SqlFailure::CheckViolation => DomainError::validation(describe(operation, &err)).into(),
        _ => DirectoryError::Backend(describe(operation, &err)),
    }
}

fn backend(err: sqlx::Error) -> DirectoryError {
    DirectoryError::Backend(describe("decode_row", &err))
}
