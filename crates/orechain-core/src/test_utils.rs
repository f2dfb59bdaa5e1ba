//! Shared fixture builders for unit tests, integration tests and other
//! crates' tests (via the `test-utils` feature).

use crate::id::*;
use crate::legacy::{Mine, Smelter};
use crate::model::*;

pub fn location(name: &str) -> Location {
    Location {
        name: name.to_string(),
        coordinates: Coordinates { lat: 0.0, lng: 0.0 },
    }
}

pub fn kt(amount: f64) -> Production {
    Production {
        amount,
        unit: ProductionUnit::Kilotonnes,
        year: 2023,
    }
}

pub fn mt(amount: f64) -> Production {
    Production {
        amount,
        unit: ProductionUnit::Megatonnes,
        year: 2023,
    }
}

pub fn stake(company: &str, percentage: f64) -> OwnershipStake {
    OwnershipStake {
        company_id: CompanyId::from(company),
        percentage,
    }
}

pub fn flow_to(target: &str, target_type: &str) -> MaterialFlow {
    MaterialFlow {
        target_id: FacilityId::from(target),
        target_type: FacilityTypeId::from(target_type),
        percentage: None,
        source: None,
    }
}

/// A legacy mine with production in kt (or none).
pub fn mine_in(id: &str, country: &str, production_kt: Option<f64>) -> Mine {
    Mine {
        id: FacilityId::from(id),
        name: id.to_string(),
        location: location(id),
        country: CountryCode::from(country),
        production: production_kt.map(kt),
        owned_by: Vec::new(),
        feeds_to: Vec::new(),
        mining_method: None,
        source: None,
    }
}

/// A legacy smelter with capacity in kt (or none).
pub fn smelter_in(id: &str, country: &str, capacity_kt: Option<f64>) -> Smelter {
    Smelter {
        id: FacilityId::from(id),
        name: id.to_string(),
        location: location(id),
        country: CountryCode::from(country),
        capacity: capacity_kt.map(kt),
        feeds_from: Vec::new(),
        owner: None,
        source: None,
        byproducts: None,
    }
}

/// A generic facility with capacity in kt (or none).
pub fn facility_in(
    id: &str,
    facility_type: &str,
    country: &str,
    capacity_kt: Option<f64>,
) -> Facility {
    Facility {
        id: FacilityId::from(id),
        facility_type: FacilityTypeId::from(facility_type),
        name: id.to_string(),
        location: location(id),
        country: CountryCode::from(country),
        capacity: capacity_kt.map(kt),
        owned_by: Vec::new(),
        feeds_to: Vec::new(),
        feeds_from: Vec::new(),
        mining_method: None,
        process_type: None,
        byproducts: None,
        source: None,
        status: None,
        notes: None,
    }
}

pub fn company_in(id: &str, country: &str) -> Company {
    Company {
        id: CompanyId::from(id),
        name: id.to_string(),
        hq_location: location(id),
        country: CountryCode::from(country),
        website: None,
        source: None,
    }
}
