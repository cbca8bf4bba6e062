use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use carbonledger_core::{DomainError, DomainResult, FactorId, GasId};

/// GHG Protocol scope an activity factor usually reports under.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Scope1,
    Scope2,
    Scope3,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Scope1 => "Scope1",
            Scope::Scope2 => "Scope2",
            Scope::Scope3 => "Scope3",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scope1" => Ok(Scope::Scope1),
            "Scope2" => Ok(Scope::Scope2),
            "Scope3" => Ok(Scope::Scope3),
            other => Err(DomainError::validation(format!("unknown scope '{other}'"))),
        }
    }
}

/// Conversion factor from an activity quantity to kg CO2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactor {
    pub id: FactorId,
    /// Stable lookup key, e.g. `diesel` or `electricity_TR`.
    pub code: String,
    pub name: String,
    /// Activity unit the factor applies to (`kWh`, `L`, `km`, ...).
    pub unit: String,
    pub factor_kgco2_per_unit: f64,
    pub scope_hint: Scope,
}

/// 100-year global warming potential of a greenhouse gas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasGwp {
    pub id: GasId,
    pub gas: String,
    pub gwp100: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEmissionFactor {
    pub code: String,
    pub name: String,
    pub unit: String,
    pub factor_kgco2_per_unit: f64,
    pub scope_hint: Scope,
}

impl NewEmissionFactor {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        factor_kgco2_per_unit: f64,
        scope_hint: Scope,
    ) -> DomainResult<Self> {
        let code = required("code", code.into())?;
        if code.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("factor code must not contain whitespace"));
        }
        Ok(Self {
            code,
            name: required("name", name.into())?,
            unit: required("unit", unit.into())?,
            factor_kgco2_per_unit: non_negative("factor_kgco2_per_unit", factor_kgco2_per_unit)?,
            scope_hint,
        })
    }

    pub fn into_factor(self, id: FactorId) -> EmissionFactor {
        EmissionFactor {
            id,
            code: self.code,
            name: self.name,
            unit: self.unit,
            factor_kgco2_per_unit: self.factor_kgco2_per_unit,
            scope_hint: self.scope_hint,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGasGwp {
    pub gas: String,
    pub gwp100: f64,
}

impl NewGasGwp {
    pub fn new(gas: impl Into<String>, gwp100: f64) -> DomainResult<Self> {
        Ok(Self {
            gas: required("gas", gas.into())?,
            gwp100: non_negative("gwp100", gwp100)?,
        })
    }

    pub fn into_gwp(self, id: GasId) -> GasGwp {
        GasGwp {
            id,
            gas: self.gas,
            gwp100: self.gwp100,
        }
    }
}

fn required(field: &str, value: String) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn non_negative(field: &str, value: f64) -> DomainResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_fields_are_trimmed() {
        let f = NewEmissionFactor::new(" diesel ", "Diesel ", " L", 2.68, Scope::Scope1).unwrap();
        assert_eq!(f.code, "diesel");
        assert_eq!(f.name, "Diesel");
        assert_eq!(f.unit, "L");
    }

    #[test]
    fn codes_with_spaces_are_rejected() {
        let err = NewEmissionFactor::new("natural gas", "Natural Gas", "m3", 1.9, Scope::Scope1)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("factor code must not contain whitespace")
        );
    }

    #[test]
    fn negative_or_non_finite_values_are_rejected() {
        assert!(NewEmissionFactor::new("x", "X", "kg", -0.1, Scope::Scope3).is_err());
        assert!(NewEmissionFactor::new("x", "X", "kg", f64::NAN, Scope::Scope3).is_err());
        assert!(NewGasGwp::new("CH4", f64::INFINITY).is_err());
        assert!(NewGasGwp::new("  ", 28.0).is_err());
    }

    #[test]
    fn scope_uses_its_label_on_the_wire() {
        assert_eq!(serde_json::to_string(&Scope::Scope2).unwrap(), "\"Scope2\"");
        assert_eq!("Scope3".parse::<Scope>().unwrap(), Scope::Scope3);
        assert!("scope1".parse::<Scope>().is_err());
    }

    #[test]
    fn into_factor_keeps_fields() {
        let f = NewEmissionFactor::new("road_km", "Road Freight", "km", 0.12, Scope::Scope3)
            .unwrap()
            .into_factor(FactorId::new(5));
        assert_eq!(f.id, FactorId::new(5));
        assert_eq!(f.scope_hint, Scope::Scope3);
        assert_eq!(f.factor_kgco2_per_unit, 0.12);
    }
}
