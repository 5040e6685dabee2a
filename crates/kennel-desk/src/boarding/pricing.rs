use serde::Serialize;

use super::domain::{PricingId, PricingUnit, ServicePricing, ServiceType, TrainingType};

/// Nightly boarding rate used when the price list has no boarding row.
pub const FALLBACK_BOARDING_NIGHTLY: i64 = 4000;
/// Per-session training rate used when no training row matches, for both
/// group and one-to-one sessions.
pub const FALLBACK_TRAINING_SESSION: i64 = 4500;
pub const FALLBACK_WALKING_SESSION: i64 = 2000;

const ONE_ON_ONE_MARKER: &str = "1-on-1";

/// Quantity being priced: nights, hours, or sessions, plus the dog count.
/// Only boarding multiplies by dogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity {
    pub units: u32,
    pub dogs: u32,
}

impl Quantity {
    pub fn units(units: u32) -> Self {
        Self { units, dogs: 1 }
    }

    pub fn nights_for_dogs(nights: u32, dogs: u32) -> Self {
        Self { units: nights, dogs }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "pricingId", rename_all = "snake_case")]
pub enum PriceSource {
    PriceList(PricingId),
    Fallback,
    /// Unit price carried over from an earlier estimate.
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub service_type: ServiceType,
    pub unit_price: i64,
    pub units: u32,
    pub dogs: u32,
    pub total: i64,
    pub source: PriceSource,
}

/// Resolves prices against a snapshot of the active price list.
#[derive(Debug, Clone)]
pub struct PricingResolver {
    rows: Vec<ServicePricing>,
}

impl PricingResolver {
    pub fn new(rows: Vec<ServicePricing>) -> Self {
        let mut rows: Vec<ServicePricing> =
            rows.into_iter().filter(|row| row.is_active).collect();
        rows.sort_by_key(|row| row.id);
        Self { rows }
    }

    /// Unit price in minor units and where it came from.
    pub fn unit_price(
        &self,
        service: ServiceType,
        training_type: Option<TrainingType>,
    ) -> (i64, PriceSource) {
        let (row, fallback) = match service {
            ServiceType::Boarding => (
                self.rows
                    .iter()
                    .find(|row| row.service_type == ServiceType::Boarding),
                FALLBACK_BOARDING_NIGHTLY,
            ),
            ServiceType::Training => (self.training_row(training_type), FALLBACK_TRAINING_SESSION),
            ServiceType::Walking => (self.named("walking").next(), FALLBACK_WALKING_SESSION),
        };

        match row {
            Some(row) => (row.unit_price_minor(), PriceSource::PriceList(row.id)),
            None => (fallback, PriceSource::Fallback),
        }
    }

    pub fn resolve(
        &self,
        service: ServiceType,
        training_type: Option<TrainingType>,
        quantity: Quantity,
    ) -> PriceQuote {
        let (unit_price, source) = self.unit_price(service, training_type);
        let dogs = match service {
            ServiceType::Boarding => quantity.dogs,
            ServiceType::Training | ServiceType::Walking => 1,
        };
        let total = unit_price
            .saturating_mul(i64::from(quantity.units))
            .saturating_mul(i64::from(dogs));

        PriceQuote {
            service_type: service,
            unit_price,
            units: quantity.units,
            dogs,
            total,
            source,
        }
    }

    fn named<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a ServicePricing> + 'a {
        self.rows
            .iter()
            .filter(move |row| row.service_name.to_ascii_lowercase().contains(needle))
    }

    fn training_row(&self, training_type: Option<TrainingType>) -> Option<&ServicePricing> {
        let is_one_on_one = |row: &&ServicePricing| {
            row.service_name
                .to_ascii_lowercase()
                .contains(ONE_ON_ONE_MARKER)
        };

        let preferred = match training_type {
            Some(TrainingType::Group) => self.named("training").find(|row| !is_one_on_one(row)),
            Some(TrainingType::OneOnOne) | None => self.named("training").find(is_one_on_one),
        };

        preferred.or_else(|| self.named("training").next())
    }
}

/// Price list seeded when no CSV is configured.
pub fn default_price_list() -> Vec<ServicePricing> {
    let row = |id: u64,
               service_type: ServiceType,
               name: &str,
               price: u32,
               unit: PricingUnit| ServicePricing {
        id: PricingId(id),
        service_type,
        service_name: name.to_string(),
        price_per_unit: price,
        unit,
        is_active: true,
    };

    vec![
        row(1, ServiceType::Boarding, "Overnight Boarding", 40, PricingUnit::PerNight),
        row(2, ServiceType::Training, "1-on-1 Training Session", 45, PricingUnit::PerHour),
        row(3, ServiceType::Training, "Group Training Class", 40, PricingUnit::PerSession),
        row(4, ServiceType::Walking, "Dog Walking (30 min)", 20, PricingUnit::PerWalk),
    ]
}

/// Major-unit figure for API payloads (e.g. 16000 -> 160.0).
pub fn to_major_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Human-readable amount, e.g. `£40.00`.
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}£{}.{:02}", abs / 100, abs % 100)
}
