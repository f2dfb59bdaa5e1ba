//! Generic supply-chain entities shared by every material.
//!
//! A [`Facility`] is any node in a material's supply chain (mine, smelter,
//! pellet plant, refinery, ...). Its `facility_type` is a key into the
//! material registry rather than a closed enum, so new facility types can be
//! added to the data without touching this crate. A [`Company`] owns
//! facilities through [`OwnershipStake`]s.
//!
//! All records use camelCase field names on the wire.

use serde::{Deserialize, Serialize};

use crate::id::{CompanyId, CountryCode, FacilityId, FacilityTypeId};

// ---------------------------------------------------------------------------
// Common value types
// ---------------------------------------------------------------------------

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A named point on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub coordinates: Coordinates,
}

/// Unit a [`Production`] amount is reported in. Descriptive only: amounts
/// are never converted between units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProductionUnit {
    #[serde(rename = "kt")]
    Kilotonnes,
    #[serde(rename = "Mt")]
    Megatonnes,
    #[serde(rename = "t")]
    Tonnes,
    #[serde(rename = "Moz")]
    MillionOunces,
}

impl ProductionUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductionUnit::Kilotonnes => "kt",
            ProductionUnit::Megatonnes => "Mt",
            ProductionUnit::Tonnes => "t",
            ProductionUnit::MillionOunces => "Moz",
        }
    }
}

/// A yearly quantity with its unit and reporting year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub amount: f64,
    pub unit: ProductionUnit,
    pub year: u16,
}

// ---------------------------------------------------------------------------
// Company
// ---------------------------------------------------------------------------

/// A company holding stakes in facilities. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub hq_location: Location,
    pub country: CountryCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Facility
// ---------------------------------------------------------------------------

/// A percentage interest a company holds in a facility.
///
/// `percentage` is in `[0, 100]`. The stakes on one facility need not sum to
/// 100; partial or unknown ownership is valid. Legacy mine records spell the
/// company reference `minerId`, which is accepted as an alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipStake {
    #[serde(alias = "minerId")]
    pub company_id: CompanyId,
    pub percentage: f64,
}

/// A directed supply edge to another facility.
///
/// `target_type` is expected to be one of the types the source facility's
/// type may feed according to the material registry. That rule is upheld by
/// data curation; see [`check_flows`](crate::material::MaterialRegistry::check_flows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialFlow {
    pub target_id: FacilityId,
    pub target_type: FacilityTypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MiningMethod {
    OpenPit,
    Underground,
    Mixed,
    Placer,
    MineralSands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityStatus {
    Operating,
    Construction,
    Suspended,
    Closed,
}

/// Chemical symbol of a metal recovered as a byproduct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByproductMetal {
    Ag,
    Au,
    Mo,
    Se,
    Te,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByproductUnit {
    Oz,
    T,
    Kg,
}

/// Byproduct output of a processing facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByproductProduction {
    pub metal: ByproductMetal,
    pub amount: f64,
    pub unit: ByproductUnit,
    pub year: u16,
    /// `true` if calculated rather than reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Any node in a material supply chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: FacilityId,
    #[serde(rename = "type")]
    pub facility_type: FacilityTypeId,
    pub name: String,
    pub location: Location,
    pub country: CountryCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Production>,
    #[serde(default)]
    pub owned_by: Vec<OwnershipStake>,
    #[serde(default)]
    pub feeds_to: Vec<MaterialFlow>,
    #[serde(default)]
    pub feeds_from: Vec<MaterialFlow>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mining_method: Option<MiningMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byproducts: Option<Vec<ByproductProduction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FacilityStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Facility {
    /// Capacity amount, or zero when no capacity is reported.
    pub fn capacity_amount(&self) -> f64 {
        self.capacity.map(|c| c.amount).unwrap_or(0.0)
    }

    /// Whether `company` holds any stake in this facility.
    pub fn is_owned_by(&self, company: &str) -> bool {
        self.owned_by.iter().any(|s| s.company_id == company)
    }
}
