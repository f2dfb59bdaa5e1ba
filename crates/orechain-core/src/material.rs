//! Material registry: per-material facility-type taxonomies.
//!
//! Each [`MaterialConfig`] lists the facility types of one material's supply
//! chain together with their marker styling and the `can_feed_to` rule that
//! defines which types may supply which. The rules form a directed acyclic
//! graph per material, e.g. for iron:
//!
//! ```text
//! mine -> {pellet_plant, sinter_plant, blast_furnace}
//! pellet_plant -> {blast_furnace, dri_plant}
//! {sinter_plant -> blast_furnace}, {blast_furnace, dri_plant} -> steel_mill
//! ```
//!
//! A [`MaterialRegistry`] is built once through [`MaterialRegistryBuilder`],
//! which validates the taxonomy, and is read-only afterwards. The built-in
//! tables for copper, iron, titanium and gold are available from
//! [`MaterialRegistry::builtin`] and the free functions
//! [`get_material_config`] / [`get_facility_type_config`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::id::{FacilityId, FacilityTypeId};
use crate::model::Facility;

/// Number of materials in [`MaterialId`].
pub const MATERIAL_COUNT: usize = 4;

// ---------------------------------------------------------------------------
// Material ids
// ---------------------------------------------------------------------------

/// A tracked commodity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialId {
    Copper,
    Iron,
    Titanium,
    Gold,
}

impl MaterialId {
    pub const ALL: [MaterialId; MATERIAL_COUNT] = [
        MaterialId::Copper,
        MaterialId::Iron,
        MaterialId::Titanium,
        MaterialId::Gold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MaterialId::Copper => "copper",
            MaterialId::Iron => "iron",
            MaterialId::Titanium => "titanium",
            MaterialId::Gold => "gold",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialId {
    type Err = MaterialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaterialId::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| MaterialError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterialError {
    #[error("unknown material: {0}")]
    Unknown(String),
}

// ---------------------------------------------------------------------------
// Configuration records
// ---------------------------------------------------------------------------

/// Map marker shape for a facility type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerShape {
    Circle,
    Diamond,
    Square,
    Triangle,
    Pentagon,
}

/// One stage of a material's supply chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityTypeConfig {
    pub id: FacilityTypeId,
    pub name: String,
    pub name_plural: String,
    pub icon: String,
    /// Hex marker colour.
    pub color: String,
    pub shape: MarkerShape,
    /// e.g. `kt/year`, `Mt/year`.
    pub capacity_unit: String,
    /// `Production` for extraction stages, `Capacity` otherwise.
    pub capacity_label: String,
    /// Facility types this type may supply.
    #[serde(default)]
    pub can_feed_to: Vec<FacilityTypeId>,
}

impl FacilityTypeConfig {
    pub fn can_feed(&self, target: &str) -> bool {
        self.can_feed_to.iter().any(|t| t == target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialConfig {
    pub id: MaterialId,
    pub name: String,
    /// Chemical symbol, e.g. `Cu`.
    pub symbol: String,
    pub color: String,
    pub description: String,
    pub facility_types: Vec<FacilityTypeConfig>,
}

impl MaterialConfig {
    /// Linear lookup of a facility type by id.
    pub fn facility_type(&self, id: &str) -> Option<&FacilityTypeConfig> {
        self.facility_types.iter().find(|ft| ft.id == id)
    }

    /// Facility types in supply-chain order (Kahn's algorithm over
    /// `can_feed_to`; ties keep declaration order).
    ///
    /// Returns `CycleDetected` if the feed rules are not acyclic and
    /// `UnknownFeedTarget` if a rule names a type this material lacks.
    pub fn stage_order(&self) -> Result<Vec<&FacilityTypeConfig>, RegistryError> {
        let index: HashMap<&str, usize> = self
            .facility_types
            .iter()
            .enumerate()
            .map(|(i, ft)| (ft.id.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; self.facility_types.len()];
        for ft in &self.facility_types {
            for target in &ft.can_feed_to {
                let Some(&t) = index.get(target.as_str()) else {
                    return Err(RegistryError::UnknownFeedTarget {
                        material: self.id,
                        from: ft.id.clone(),
                        to: target.clone(),
                    });
                };
                in_degree[t] += 1;
            }
        }

        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.facility_types.len());

        while let Some(i) = queue.pop_front() {
            let ft = &self.facility_types[i];
            order.push(ft);
            for target in &ft.can_feed_to {
                if let Some(&t) = index.get(target.as_str()) {
                    in_degree[t] -= 1;
                    if in_degree[t] == 0 {
                        queue.push_back(t);
                    }
                }
            }
        }

        if order.len() < self.facility_types.len() {
            // Any type still holding in-degree sits on a cycle.
            let stuck = in_degree
                .iter()
                .position(|&deg| deg > 0)
                .map(|i| self.facility_types[i].id.clone())
                .unwrap_or_else(|| FacilityTypeId::from(""));
            return Err(RegistryError::CycleDetected {
                material: self.id,
                facility_type: stuck,
            });
        }

        Ok(order)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.facility_types.len());
        for ft in &self.facility_types {
            if seen.contains(&ft.id.as_str()) {
                return Err(RegistryError::DuplicateFacilityType {
                    material: self.id,
                    facility_type: ft.id.clone(),
                });
            }
            seen.push(ft.id.as_str());
        }
        self.stage_order().map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Flow checks
// ---------------------------------------------------------------------------

/// A `feeds_to` edge that breaks the material's feed rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowViolation {
    /// The facility's own type is not part of the material's taxonomy.
    UnknownSourceType {
        facility: FacilityId,
        facility_type: FacilityTypeId,
    },
    /// The facility's type may not feed the edge's target type.
    DisallowedTarget {
        facility: FacilityId,
        target: FacilityId,
        from: FacilityTypeId,
        to: FacilityTypeId,
    },
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable set of material configurations, one per [`MaterialId`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRegistry {
    materials: [MaterialConfig; MATERIAL_COUNT],
}

impl MaterialRegistry {
    /// The built-in tables for copper, iron, titanium and gold.
    pub fn builtin() -> &'static MaterialRegistry {
        builtin_shared()
    }

    /// A handle on the built-in registry. Every call shares one allocation.
    pub fn shared_builtin() -> Arc<MaterialRegistry> {
        Arc::clone(builtin_shared())
    }

    /// Configuration of `id`. Total: every material is present.
    pub fn get(&self, id: MaterialId) -> &MaterialConfig {
        &self.materials[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialConfig> {
        self.materials.iter()
    }

    pub fn facility_type(
        &self,
        material: MaterialId,
        facility_type: &str,
    ) -> Option<&FacilityTypeConfig> {
        self.get(material).facility_type(facility_type)
    }

    /// Whether a `from` facility may supply a `to` facility in `material`.
    /// Unknown `from` types feed nothing.
    pub fn can_feed_to(&self, material: MaterialId, from: &str, to: &str) -> bool {
        self.facility_type(material, from)
            .is_some_and(|ft| ft.can_feed(to))
    }

    /// Facility types that may supply `to`, in declaration order.
    pub fn upstream_types(&self, material: MaterialId, to: &str) -> Vec<&FacilityTypeConfig> {
        self.get(material)
            .facility_types
            .iter()
            .filter(|ft| ft.can_feed(to))
            .collect()
    }

    /// List every `feeds_to` edge of `facility` that the feed rules of
    /// `material` do not allow. Nothing is rejected; this is a curation aid.
    pub fn check_flows(&self, material: MaterialId, facility: &Facility) -> Vec<FlowViolation> {
        let Some(config) = self.facility_type(material, facility.facility_type.as_str()) else {
            return vec![FlowViolation::UnknownSourceType {
                facility: facility.id.clone(),
                facility_type: facility.facility_type.clone(),
            }];
        };

        facility
            .feeds_to
            .iter()
            .filter(|flow| !config.can_feed(flow.target_type.as_str()))
            .map(|flow| FlowViolation::DisallowedTarget {
                facility: facility.id.clone(),
                target: flow.target_id.clone(),
                from: facility.facility_type.clone(),
                to: flow.target_type.clone(),
            })
            .collect()
    }

    /// Re-run the checks [`MaterialRegistryBuilder::build`] performs.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for (i, config) in self.materials.iter().enumerate() {
            if config.id.index() != i {
                return Err(RegistryError::MisplacedMaterial(config.id));
            }
            config.validate()?;
        }
        Ok(())
    }
}

fn builtin_shared() -> &'static Arc<MaterialRegistry> {
    static BUILTIN: OnceLock<Arc<MaterialRegistry>> = OnceLock::new();
    BUILTIN.get_or_init(|| {
        Arc::new(MaterialRegistry {
            materials: [copper(), iron(), titanium(), gold()],
        })
    })
}

/// Configuration of `material` from the built-in registry.
pub fn get_material_config(material: MaterialId) -> &'static MaterialConfig {
    MaterialRegistry::builtin().get(material)
}

/// Facility type `facility_type` of `material` from the built-in registry,
/// or `None` when the material has no such type.
pub fn get_facility_type_config(
    material: MaterialId,
    facility_type: &str,
) -> Option<&'static FacilityTypeConfig> {
    MaterialRegistry::builtin()
        .facility_type(material, facility_type)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`MaterialRegistry`].
/// Two-phase lifecycle: registration/mutation, then validated `build()`.
#[derive(Debug, Default)]
pub struct MaterialRegistryBuilder {
    materials: [Option<MaterialConfig>; MATERIAL_COUNT],
}

impl MaterialRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing registry, e.g. to override one material.
    pub fn from_registry(registry: &MaterialRegistry) -> Self {
        Self {
            materials: registry.materials.clone().map(Some),
        }
    }

    /// Register (or replace) the configuration of `config.id`. Returns the
    /// configuration it replaced, if any.
    pub fn register(&mut self, config: MaterialConfig) -> Option<MaterialConfig> {
        let slot = &mut self.materials[config.id.index()];
        slot.replace(config)
    }

    /// Mutate one facility type of a registered material.
    pub fn mutate_facility_type<F>(
        &mut self,
        material: MaterialId,
        facility_type: &str,
        f: F,
    ) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut FacilityTypeConfig),
    {
        let config = self.materials[material.index()]
            .as_mut()
            .ok_or(RegistryError::MissingMaterial(material))?;
        let ft = config
            .facility_types
            .iter_mut()
            .find(|ft| ft.id == facility_type)
            .ok_or_else(|| RegistryError::NotFound {
                material,
                facility_type: FacilityTypeId::from(facility_type),
            })?;
        f(ft);
        Ok(())
    }

    /// Validate and freeze. Every material must be registered, facility type
    /// ids must be unique per material, and each material's feed rules must
    /// reference its own types and be acyclic.
    pub fn build(self) -> Result<MaterialRegistry, RegistryError> {
        let [copper, iron, titanium, gold] = self.materials;
        let registry = MaterialRegistry {
            materials: [
                copper.ok_or(RegistryError::MissingMaterial(MaterialId::Copper))?,
                iron.ok_or(RegistryError::MissingMaterial(MaterialId::Iron))?,
                titanium.ok_or(RegistryError::MissingMaterial(MaterialId::Titanium))?,
                gold.ok_or(RegistryError::MissingMaterial(MaterialId::Gold))?,
            ],
        };
        registry.validate()?;
        Ok(registry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("material not registered: {0}")]
    MissingMaterial(MaterialId),
    #[error("material {0} stored under another material's slot")]
    MisplacedMaterial(MaterialId),
    #[error("facility type {facility_type} not found in {material}")]
    NotFound {
        material: MaterialId,
        facility_type: FacilityTypeId,
    },
    #[error("duplicate facility type {facility_type} in {material}")]
    DuplicateFacilityType {
        material: MaterialId,
        facility_type: FacilityTypeId,
    },
    #[error("{material}: {from} feeds unknown facility type {to}")]
    UnknownFeedTarget {
        material: MaterialId,
        from: FacilityTypeId,
        to: FacilityTypeId,
    },
    #[error("{material}: feed rules form a cycle through {facility_type}")]
    CycleDetected {
        material: MaterialId,
        facility_type: FacilityTypeId,
    },
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// A facility type with its names set; styling and rules are added with the
/// chained setters below.
fn stage(id: &str, name: &str, name_plural: &str) -> FacilityTypeConfig {
    FacilityTypeConfig {
        id: FacilityTypeId::from(id),
        name: name.to_string(),
        name_plural: name_plural.to_string(),
        icon: String::new(),
        color: String::new(),
        shape: MarkerShape::Circle,
        capacity_unit: String::new(),
        capacity_label: String::new(),
        can_feed_to: Vec::new(),
    }
}

impl FacilityTypeConfig {
    fn marker(mut self, icon: &str, color: &str, shape: MarkerShape) -> Self {
        self.icon = icon.to_string();
        self.color = color.to_string();
        self.shape = shape;
        self
    }

    fn capacity(mut self, unit: &str, label: &str) -> Self {
        self.capacity_unit = unit.to_string();
        self.capacity_label = label.to_string();
        self
    }

    fn feeds(mut self, targets: &[&str]) -> Self {
        self.can_feed_to = targets.iter().copied().map(FacilityTypeId::from).collect();
        self
    }
}

fn copper() -> MaterialConfig {
    use MarkerShape::*;
    MaterialConfig {
        id: MaterialId::Copper,
        name: "Copper".into(),
        symbol: "Cu".into(),
        color: "#B87333".into(),
        description: "Global copper extraction, smelting, and refining".into(),
        facility_types: vec![
            stage("mine", "Mine", "Mines")
                .marker("●", "#22c55e", Circle)
                .capacity("kt/year", "Production")
                .feeds(&["smelter"]),
            stage("smelter", "Smelter", "Smelters")
                .marker("◆", "#3b82f6", Diamond)
                .capacity("kt/year", "Capacity"),
        ],
    }
}

fn iron() -> MaterialConfig {
    use MarkerShape::*;
    MaterialConfig {
        id: MaterialId::Iron,
        name: "Iron".into(),
        symbol: "Fe".into(),
        color: "#71717a".into(),
        description: "Iron ore mining, processing, and steelmaking".into(),
        facility_types: vec![
            stage("mine", "Mine", "Mines")
                .marker("●", "#78716c", Circle)
                .capacity("Mt/year", "Production")
                .feeds(&["pellet_plant", "sinter_plant", "blast_furnace"]),
            stage("pellet_plant", "Pellet Plant", "Pellet Plants")
                .marker("○", "#a8a29e", Circle)
                .capacity("Mt/year", "Capacity")
                .feeds(&["blast_furnace", "dri_plant"]),
            stage("sinter_plant", "Sinter Plant", "Sinter Plants")
                .marker("◇", "#d6d3d1", Diamond)
                .capacity("Mt/year", "Capacity")
                .feeds(&["blast_furnace"]),
            stage("blast_furnace", "Blast Furnace", "Blast Furnaces")
                .marker("■", "#ef4444", Square)
                .capacity("Mt/year", "Capacity")
                .feeds(&["steel_mill"]),
            stage("dri_plant", "DRI Plant", "DRI Plants")
                .marker("▲", "#f97316", Triangle)
                .capacity("Mt/year", "Capacity")
                .feeds(&["steel_mill"]),
            stage("steel_mill", "Steel Mill", "Steel Mills")
                .marker("★", "#1e3a8a", Pentagon)
                .capacity("Mt/year", "Capacity"),
        ],
    }
}

fn titanium() -> MaterialConfig {
    use MarkerShape::*;
    MaterialConfig {
        id: MaterialId::Titanium,
        name: "Titanium".into(),
        symbol: "Ti".into(),
        color: "#818cf8".into(),
        description: "Titanium ore mining, pigment production, and metal sponge".into(),
        facility_types: vec![
            stage("mine", "Mine", "Mines")
                .marker("●", "#a78bfa", Circle)
                .capacity("kt/year", "Production")
                .feeds(&["upgrading_plant"]),
            stage("upgrading_plant", "Upgrading Plant", "Upgrading Plants")
                .marker("◇", "#c4b5fd", Diamond)
                .capacity("kt/year", "Capacity")
                .feeds(&["pigment_plant", "sponge_plant"]),
            stage("pigment_plant", "Pigment Plant", "Pigment Plants")
                .marker("■", "#f0f0f0", Square)
                .capacity("kt/year", "Capacity"),
            stage("sponge_plant", "Sponge Plant", "Sponge Plants")
                .marker("▲", "#6366f1", Triangle)
                .capacity("kt/year", "Capacity")
                .feeds(&["melting_facility"]),
            stage("melting_facility", "Melting Facility", "Melting Facilities")
                .marker("★", "#4338ca", Pentagon)
                .capacity("kt/year", "Capacity"),
        ],
    }
}

fn gold() -> MaterialConfig {
    use MarkerShape::*;
    MaterialConfig {
        id: MaterialId::Gold,
        name: "Gold".into(),
        symbol: "Au".into(),
        color: "#fbbf24".into(),
        description: "Gold mining, doré production, and refining".into(),
        facility_types: vec![
            stage("mine", "Mine", "Mines")
                .marker("●", "#fbbf24", Circle)
                .capacity("Moz/year", "Production")
                .feeds(&["refinery"]),
            stage("refinery", "Refinery", "Refineries")
                .marker("◆", "#f59e0b", Diamond)
                .capacity("t/year", "Capacity"),
        ],
    }
}
