use serde::{Deserialize, Serialize};

use carbonledger_core::{DomainError, DomainResult, EntityId, FacilityId, GroupId};

/// A corporate group; entities belong to exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// A legal entity. Entities are the unit that owns EU-ETS allowances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub group_id: GroupId,
    pub name: String,
    pub yearly_budget_tco2e: f64,
}

/// A physical site operated by an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub entity_id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
}

impl NewGroup {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        Ok(Self {
            name: normalize_name("group", name.into())?,
        })
    }

    pub fn into_group(self, id: GroupId) -> Group {
        Group { id, name: self.name }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub group_id: GroupId,
    pub name: String,
    pub yearly_budget_tco2e: f64,
}

impl NewEntity {
    /// A missing budget defaults to zero.
    pub fn new(
        group_id: GroupId,
        name: impl Into<String>,
        yearly_budget_tco2e: Option<f64>,
    ) -> DomainResult<Self> {
        let budget = yearly_budget_tco2e.unwrap_or(0.0);
        if !budget.is_finite() || budget < 0.0 {
            return Err(DomainError::validation(
                "yearly_budget_tco2e must be a non-negative number",
            ));
        }
        Ok(Self {
            group_id,
            name: normalize_name("entity", name.into())?,
            yearly_budget_tco2e: budget,
        })
    }

    pub fn into_entity(self, id: EntityId) -> Entity {
        Entity {
            id,
            group_id: self.group_id,
            name: self.name,
            yearly_budget_tco2e: self.yearly_budget_tco2e,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFacility {
    pub entity_id: EntityId,
    pub name: String,
}

impl NewFacility {
    pub fn new(entity_id: EntityId, name: impl Into<String>) -> DomainResult<Self> {
        Ok(Self {
            entity_id,
            name: normalize_name("facility", name.into())?,
        })
    }

    pub fn into_facility(self, id: FacilityId) -> Facility {
        Facility {
            id,
            entity_id: self.entity_id,
            name: self.name,
        }
    }
}

fn normalize_name(kind: &str, name: String) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{kind} name must not be empty")));
    }
    Ok(trimmed.to_string())
}
