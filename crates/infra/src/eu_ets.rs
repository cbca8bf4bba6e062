//! EU-ETS carbon price feed.
//!
//! The price is a configured constant (EUR per tCO2e); there is no market
//! connection.

use carbonledger_core::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EuEtsPriceFeed {
    price_eur_per_tco2: f64,
}

impl EuEtsPriceFeed {
    pub fn new(price_eur_per_tco2: f64) -> Self {
        Self { price_eur_per_tco2 }
    }

    pub fn price(&self) -> f64 {
        self.price_eur_per_tco2
    }

    /// Cost in EUR of covering `total_co2e_tons` at the current price.
    pub fn financial_impact(&self, total_co2e_tons: f64) -> DomainResult<f64> {
        if !total_co2e_tons.is_finite() || total_co2e_tons < 0.0 {
            return Err(DomainError::validation(format!(
                "total_co2e_tons must be a non-negative number (got {total_co2e_tons})"
            )));
        }
        Ok(self.price_eur_per_tco2 * total_co2e_tons)
    }
}
