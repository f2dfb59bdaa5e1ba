//! Orechain Core -- the data layer behind the supply-chain facility map.
//!
//! This crate holds the typed entity model, the per-material facility-type
//! registry and the observable application store that views read from.
//!
//! # Key Types
//!
//! - [`model::Facility`] / [`model::Company`] -- generic supply-chain
//!   entities shared by every material.
//! - [`legacy::Mine`] / [`legacy::Smelter`] -- copper-era records, convertible
//!   into facilities.
//! - [`material::MaterialRegistry`] -- immutable facility-type taxonomy and
//!   feed rules per material, validated when built.
//! - [`store::Store`] -- owned application state with a fixed mutator set.
//! - [`event::EventBus`] -- buffered change notifications delivered on
//!   [`store::Store::flush`].
//!
//! Country-level rollups live in the `orechain-stats` crate; file loading in
//! `orechain-data`.

pub mod config;
pub mod event;
pub mod id;
pub mod legacy;
pub mod material;
pub mod model;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::StoreConfig;
pub use material::{MaterialId, get_facility_type_config, get_material_config};
pub use store::{AppState, EntityRef, EntityType, Store};
