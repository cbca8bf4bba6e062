//! Postgres-backed factor catalog (`emission_factors`, `gas_gwp`).
//!
//! Unique codes and gases are enforced by the schema; `23505` maps to
//! `Conflict` and `23514` to `Validation`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use carbonledger_core::{DomainError, FactorId, GasId};
use carbonledger_factors::{EmissionFactor, GasGwp, NewEmissionFactor, NewGasGwp, Scope};

use super::r#trait::{CatalogError, FactorCatalog};
use crate::db::{SqlFailure, classify, describe};

#[derive(Debug, Clone)]
pub struct PostgresFactorCatalog {
    pool: PgPool,
}

impl PostgresFactorCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FACTOR_COLUMNS: &str = "id, code, name, unit, factor_kgco2_per_unit, scope_hint";

#[async_trait]
impl FactorCatalog for PostgresFactorCatalog {
    #[instrument(skip(self), err)]
    async fn add_factor(&self, factor: NewEmissionFactor) -> Result<EmissionFactor, CatalogError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO emission_factors (code, name, unit, factor_kgco2_per_unit, scope_hint)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&factor.code)
        .bind(&factor.name)
        .bind(&factor.unit)
        .bind(factor.factor_kgco2_per_unit)
        .bind(factor.scope_hint.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_factor", &format!("factor '{}'", factor.code), e))?;
        Ok(factor.into_factor(FactorId::new(id)))
    }

    async fn list_factors(&self) -> Result<Vec<EmissionFactor>, CatalogError> {
        let rows = sqlx::query(&format!(
            "SELECT {FACTOR_COLUMNS} FROM emission_factors ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_factors", "emission factors", e))?;

        rows.iter().map(factor_from_row).collect()
    }

    async fn factor_by_code(&self, code: &str) -> Result<Option<EmissionFactor>, CatalogError> {
        let row = sqlx::query(&format!(
            "SELECT {FACTOR_COLUMNS} FROM emission_factors WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("factor_by_code", "emission factors", e))?;

        row.as_ref().map(factor_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn add_gwp(&self, gwp: NewGasGwp) -> Result<GasGwp, CatalogError> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO gas_gwp (gas, gwp100) VALUES ($1, $2) RETURNING id")
                .bind(&gwp.gas)
                .bind(gwp.gwp100)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("add_gwp", &format!("gas '{}'", gwp.gas), e))?;
        Ok(gwp.into_gwp(GasId::new(id)))
    }

    async fn list_gwp(&self) -> Result<Vec<GasGwp>, CatalogError> {
        let rows = sqlx::query("SELECT id, gas, gwp100 FROM gas_gwp ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_gwp", "gas gwp", e))?;

        rows.iter()
            .map(|row| -> Result<GasGwp, CatalogError> {
                Ok(GasGwp {
                    id: GasId::new(row.try_get("id").map_err(backend)?),
                    gas: row.try_get("gas").map_err(backend)?,
                    gwp100: row.try_get("gwp100").map_err(backend)?,
                })
            })
            .collect()
    }
}

fn factor_from_row(row: &PgRow) -> Result<EmissionFactor, CatalogError> {
    let scope: String = row.try_get("scope_hint").map_err(backend)?;
    Ok(EmissionFactor {
        id: FactorId::new(row.try_get("id").map_err(backend)?),
        code: row.try_get("code").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        unit: row.try_get("unit").map_err(backend)?,
        factor_kgco2_per_unit: row.try_get("factor_kgco2_per_unit").map_err(backend)?,
        scope_hint: scope
            .parse::<Scope>()
            .map_err(|e| CatalogError::Backend(format!("decode_row: {e}")))?,
    })
}

fn map_sqlx_error(operation: &str, subject: &str, err: sqlx::Error) -> CatalogError {
    match classify(&err) {
        SqlFailure::UniqueViolation => {
            DomainError::conflict(format!("{subject} already exists")).into()
        }
        SqlFailure::CheckViolation => DomainError::validation(describe(operation, &err)).into(),
        _ => CatalogError::Backend(describe(operation, &err)),
    }
}

fn backend(err: sqlx::Error) -> CatalogError {
    CatalogError::Backend(describe("decode_row", &err))
}
