use serde::{Deserialize, Serialize};

use carbonledger_core::{EntityId, GroupId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub entity_id: EntityId,
    pub delta_allowances: f64,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_entity_id: EntityId,
    pub to_entity_id: EntityId,
    pub allowances: f64,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntityQuery {
    pub entity_id: EntityId,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub group_id: GroupId,
    pub name: String,
    pub yearly_budget_tco2e: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFacilityRequest {
    pub entity_id: EntityId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ImpactQuery {
    pub total_co2e_tons: Option<f64>,
}

// -------------------------
// Response DTOs
// -------------------------

/// `{ "items": [...] }` wrapper for list endpoints.
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for Items<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub price_eur_per_tco2: f64,
}

#[derive(Debug, Serialize)]
pub struct ImpactResponse {
    pub total_co2e_tons: f64,
    pub price_eur_per_tco2: f64,
    pub financial_impact_eur: f64,
}
