//! Copper-era records and their adapter onto the generic model.
//!
//! The first datasets only knew copper mines, smelters and the miners that
//! own them. Those files are still accepted as-is: a [`Mine`] or [`Smelter`]
//! keeps its original field names on the wire and converts into a
//! [`Facility`] with `From`. A miner is simply a [`Company`].

use serde::{Deserialize, Serialize};

use crate::id::{CountryCode, FacilityId, FacilityTypeId};
use crate::model::{
    ByproductProduction, Company, Facility, Location, MaterialFlow, MiningMethod, OwnershipStake,
    Production,
};

/// Facility type a legacy mine maps onto.
pub const MINE_TYPE: &str = "mine";
/// Facility type a legacy smelter maps onto.
pub const SMELTER_TYPE: &str = "smelter";

/// A miner is the legacy name for a company.
pub type Miner = Company;

/// Legacy mine-to-smelter edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmelterFeed {
    pub smelter_id: FacilityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Legacy smelter-from-mine edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineFeed {
    pub mine_id: FacilityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mine {
    pub id: FacilityId,
    pub name: String,
    pub location: Location,
    pub country: CountryCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<Production>,
    #[serde(default)]
    pub owned_by: Vec<OwnershipStake>,
    #[serde(default)]
    pub feeds_to: Vec<SmelterFeed>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mining_method: Option<MiningMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Mine {
    pub fn production_amount(&self) -> f64 {
        self.production.map(|p| p.amount).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Smelter {
    pub id: FacilityId,
    pub name: String,
    pub location: Location,
    pub country: CountryCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Production>,
    #[serde(default)]
    pub feeds_from: Vec<MineFeed>,
    /// Free-text owner name; not a company reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byproducts: Option<Vec<ByproductProduction>>,
}

impl Smelter {
    pub fn capacity_amount(&self) -> f64 {
        self.capacity.map(|c| c.amount).unwrap_or(0.0)
    }
}

impl From<Mine> for Facility {
    fn from(mine: Mine) -> Self {
        let feeds_to = mine
            .feeds_to
            .into_iter()
            .map(|feed| MaterialFlow {
                target_id: feed.smelter_id,
                target_type: FacilityTypeId::from(SMELTER_TYPE),
                percentage: feed.percentage,
                source: feed.source,
            })
            .collect();

        Facility {
            id: mine.id,
            facility_type: FacilityTypeId::from(MINE_TYPE),
            name: mine.name,
            location: mine.location,
            country: mine.country,
            capacity: mine.production,
            owned_by: mine.owned_by,
            feeds_to,
            feeds_from: Vec::new(),
            mining_method: mine.mining_method,
            process_type: None,
            byproducts: None,
            source: mine.source,
            status: None,
            notes: None,
        }
    }
}

impl From<Smelter> for Facility {
    fn from(smelter: Smelter) -> Self {
        let feeds_from = smelter
            .feeds_from
            .into_iter()
            .map(|feed| MaterialFlow {
                target_id: feed.mine_id,
                target_type: FacilityTypeId::from(MINE_TYPE),
                percentage: feed.percentage,
                source: feed.source,
            })
            .collect();

        Facility {
            id: smelter.id,
            facility_type: FacilityTypeId::from(SMELTER_TYPE),
            name: smelter.name,
            location: smelter.location,
            country: smelter.country,
            capacity: smelter.capacity,
            owned_by: Vec::new(),
            feeds_to: Vec::new(),
            feeds_from,
            mining_method: None,
            process_type: None,
            byproducts: smelter.byproducts,
            source: smelter.source,
            status: None,
            notes: smelter.owner.map(|owner| format!("owner: {owner}")),
        }
    }
}

/// Convert whole legacy collections into generic facilities, mines first,
/// each group in input order.
pub fn facilities_from_legacy(mines: &[Mine], smelters: &[Smelter]) -> Vec<Facility> {
    mines
        .iter()
        .cloned()
        .map(Facility::from)
        .chain(smelters.iter().cloned().map(Facility::from))
        .collect()
}
