//! Country-level statistics for the Orechain store.
//!
//! Every function here is a pure scan over an [`AppState`] snapshot. Nothing
//! is cached or maintained incrementally, so a result describes the store as
//! it was at call time; callers that want live figures call again after
//! each flush.
//!
//! # Units
//!
//! Totals add amounts as reported, whatever their unit (`kt`, `Mt`, `t`,
//! `Moz`). No conversion is done. Each result also carries a per-unit
//! breakdown, and [`CountryStats::has_mixed_units`] /
//! [`GenericCountryStats::has_mixed_units`] tell the caller when a headline
//! total mixes units.
//!
//! ```ignore
//! let stats = generic_country_stats(store.state(), "CL");
//! for (facility_type, count) in &stats.facility_counts { ... }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use orechain_core::id::{CountryCode, FacilityTypeId};
use orechain_core::legacy::{Mine, Smelter};
use orechain_core::model::{Facility, Production, ProductionUnit};
use orechain_core::store::AppState;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Rollup of the legacy mine/smelter collections for one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryStats {
    pub code: CountryCode,
    pub mine_count: usize,
    pub smelter_count: usize,
    /// Sum of mine production amounts; missing production counts as 0.
    pub total_production: f64,
    /// Sum of smelter capacity amounts; missing capacity counts as 0.
    pub total_capacity: f64,
    pub production_by_unit: BTreeMap<ProductionUnit, f64>,
    pub capacity_by_unit: BTreeMap<ProductionUnit, f64>,
    pub mines: Vec<Mine>,
    pub smelters: Vec<Smelter>,
}

impl CountryStats {
    /// Whether either total adds amounts of more than one unit.
    pub fn has_mixed_units(&self) -> bool {
        self.production_by_unit.len() > 1 || self.capacity_by_unit.len() > 1
    }
}

/// Rollup of the generic facility collection for one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericCountryStats {
    pub code: CountryCode,
    /// Facility type -> number of facilities of that type.
    pub facility_counts: BTreeMap<FacilityTypeId, usize>,
    /// Sum of capacity amounts across all types; missing capacity counts as 0.
    pub total_capacity: f64,
    pub capacity_by_unit: BTreeMap<ProductionUnit, f64>,
    pub facilities: Vec<Facility>,
}

impl GenericCountryStats {
    /// Facilities of every type in this country.
    pub fn facility_count(&self) -> usize {
        self.facility_counts.values().sum()
    }

    /// Whether `total_capacity` adds amounts of more than one unit.
    pub fn has_mixed_units(&self) -> bool {
        self.capacity_by_unit.len() > 1
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Mine and smelter counts and sums for `code`.
pub fn country_stats(state: &AppState, code: &str) -> CountryStats {
    let mines: Vec<Mine> = state
        .mines
        .iter()
        .filter(|m| m.country == code)
        .cloned()
        .collect();
    let smelters: Vec<Smelter> = state
        .smelters
        .iter()
        .filter(|s| s.country == code)
        .cloned()
        .collect();

    let production_by_unit = by_unit(mines.iter().map(|m| m.production));
    let capacity_by_unit = by_unit(smelters.iter().map(|s| s.capacity));

    let stats = CountryStats {
        code: CountryCode::from(code),
        mine_count: mines.len(),
        smelter_count: smelters.len(),
        total_production: mines.iter().map(Mine::production_amount).sum(),
        total_capacity: smelters.iter().map(Smelter::capacity_amount).sum(),
        production_by_unit,
        capacity_by_unit,
        mines,
        smelters,
    };
    if stats.has_mixed_units() {
        debug!(country = code, "country totals mix production units");
    }
    stats
}

/// Facility counts per type and total capacity for `code`.
pub fn generic_country_stats(state: &AppState, code: &str) -> GenericCountryStats {
    let facilities: Vec<Facility> = state
        .facilities
        .iter()
        .filter(|f| f.country == code)
        .cloned()
        .collect();

    let mut facility_counts: BTreeMap<FacilityTypeId, usize> = BTreeMap::new();
    for facility in &facilities {
        *facility_counts
            .entry(facility.facility_type.clone())
            .or_insert(0) += 1;
    }

    let stats = GenericCountryStats {
        code: CountryCode::from(code),
        facility_counts,
        total_capacity: facilities.iter().map(Facility::capacity_amount).sum(),
        capacity_by_unit: by_unit(facilities.iter().map(|f| f.capacity)),
        facilities,
    };
    if stats.has_mixed_units() {
        debug!(country = code, "facility capacity total mixes units");
    }
    stats
}

/// Distinct country codes across mines and smelters, sorted.
pub fn countries_with_entities(state: &AppState) -> Vec<CountryCode> {
    let countries: BTreeSet<&CountryCode> = state
        .mines
        .iter()
        .map(|m| &m.country)
        .chain(state.smelters.iter().map(|s| &s.country))
        .collect();
    countries.into_iter().cloned().collect()
}

/// Distinct country codes across facilities, sorted.
pub fn countries_with_facilities(state: &AppState) -> Vec<CountryCode> {
    let countries: BTreeSet<&CountryCode> =
        state.facilities.iter().map(|f| &f.country).collect();
    countries.into_iter().cloned().collect()
}

fn by_unit(amounts: impl Iterator<Item = Option<Production>>) -> BTreeMap<ProductionUnit, f64> {
    let mut totals = BTreeMap::new();
    for production in amounts.flatten() {
        *totals.entry(production.unit).or_insert(0.0) += production.amount;
    }
    totals
}

// ===========================================================================
// Tests
// ===========================================================================
