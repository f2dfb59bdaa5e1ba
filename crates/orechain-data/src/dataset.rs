//! Loading a material's entity collections, material tables and store
//! settings into the core types.
//!
//! A dataset directory holds up to five list files, each optional:
//!
//! | base name    | record type |
//! |--------------|-------------|
//! | `facilities` | [`Facility`] |
//! | `companies`  | [`Company`] |
//! | `mines`      | [`Mine`] (legacy) |
//! | `smelters`   | [`Smelter`] (legacy) |
//! | `miners`     | [`Miner`] (legacy) |
//!
//! Records are taken as shaped: references between them are not resolved
//! and duplicate ids are reported in the log but kept.

use std::collections::HashSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use orechain_core::config::StoreConfig;
use orechain_core::legacy::{Mine, Miner, Smelter, facilities_from_legacy};
use orechain_core::material::{MaterialConfig, MaterialRegistry, MaterialRegistryBuilder};
use orechain_core::model::{Company, Facility};
use orechain_core::store::Store;

use crate::loader::{DataLoadError, deserialize_file, deserialize_list, find_data_file};

/// Everything one dataset directory provides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub facilities: Vec<Facility>,
    pub companies: Vec<Company>,
    pub mines: Vec<Mine>,
    pub smelters: Vec<Smelter>,
    pub miners: Vec<Miner>,
}

impl Dataset {
    /// Fill the generic collections from the legacy ones when a dataset only
    /// has legacy files: facilities from mines and smelters, companies from
    /// miners. Collections that already hold records are left alone.
    pub fn with_legacy_promoted(mut self) -> Self {
        if self.facilities.is_empty() {
            self.facilities = facilities_from_legacy(&self.mines, &self.smelters);
        }
        if self.companies.is_empty() {
            self.companies = self.miners.clone();
        }
        self
    }

    /// Replace every collection of `store` with this dataset's.
    pub fn apply(self, store: &mut Store) {
        store.set_facilities(self.facilities);
        store.set_companies(self.companies);
        store.set_mines(self.mines);
        store.set_smelters(self.smelters);
        store.set_miners(self.miners);
    }
}

fn load_optional_list<T, F>(
    dir: &Path,
    base_name: &str,
    id_of: F,
) -> Result<Vec<T>, DataLoadError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> &str,
{
    let Some(path) = find_data_file(dir, base_name)? else {
        return Ok(Vec::new());
    };
    let records: Vec<T> = deserialize_list(&path, base_name)?;

    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        let id = id_of(record);
        if !seen.insert(id) {
            warn!(file = %path.display(), id, "duplicate id in data file");
        }
    }
    Ok(records)
}

/// Load every list file present in `dir`. Missing files yield empty
/// collections.
pub fn load_dataset(dir: &Path) -> Result<Dataset, DataLoadError> {
    let dataset = Dataset {
        facilities: load_optional_list(dir, "facilities", |f: &Facility| f.id.as_str())?,
        companies: load_optional_list(dir, "companies", |c: &Company| c.id.as_str())?,
        mines: load_optional_list(dir, "mines", |m: &Mine| m.id.as_str())?,
        smelters: load_optional_list(dir, "smelters", |s: &Smelter| s.id.as_str())?,
        miners: load_optional_list(dir, "miners", |m: &Miner| m.id.as_str())?,
    };
    info!(
        dir = %dir.display(),
        facilities = dataset.facilities.len(),
        companies = dataset.companies.len(),
        mines = dataset.mines.len(),
        smelters = dataset.smelters.len(),
        miners = dataset.miners.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// Load a material table file and build a validated registry from it.
///
/// Materials the file omits keep their built-in configuration. TOML files
/// list materials under `materials`.
pub fn load_registry(path: &Path) -> Result<MaterialRegistry, DataLoadError> {
    let configs: Vec<MaterialConfig> = deserialize_list(path, "materials")?;
    let mut builder = MaterialRegistryBuilder::from_registry(MaterialRegistry::builtin());
    for config in configs {
        info!(material = %config.id, file = %path.display(), "overriding material table");
        builder.register(config);
    }
    builder.build().map_err(|source| DataLoadError::Registry {
        file: path.to_path_buf(),
        source,
    })
}

/// Read a `StoreConfig` from a RON, JSON or TOML file. Missing fields take
/// their defaults.
pub fn load_store_config(path: &Path) -> Result<StoreConfig, DataLoadError> {
    deserialize_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{cleanup, make_test_dir};
    use orechain_core::material::{MaterialId, RegistryError};
    use orechain_core::model::{
        ByproductMetal, ByproductProduction, ByproductUnit, FacilityStatus, MiningMethod,
    };
    use orechain_core::test_utils::*;
    use serde::Serialize;
    use std::fs;

    const FACILITIES_TOML: &str = r#"
[[facilities]]
id = "kiruna"
type = "mine"
name = "Kiruna"
country = "SE"
location = { name = "Kiruna", coordinates = { lat = 67.85, lng = 20.22 } }
capacity = { amount = 27.0, unit = "Mt", year = 2023 }
ownedBy = [{ companyId = "lkab", percentage = 100.0 }]
feedsTo = [{ targetId = "svappavaara", targetType = "pellet_plant" }]

[[facilities]]
id = "svappavaara"
type = "pellet_plant"
name = "Svappavaara"
country = "SE"
location = { name = "Svappavaara", coordinates = { lat = 67.64, lng = 21.06 } }
status = "operating"
"#;

    const MINES_JSON: &str = r#"[
        { "id": "escondida", "name": "Escondida", "country": "CL",
          "location": { "name": "Antofagasta", "coordinates": { "lat": -24.27, "lng": -69.07 } },
          "production": { "amount": 1100, "unit": "kt", "year": 2023 },
          "ownedBy": [{ "minerId": "bhp", "percentage": 57.5 }],
          "feedsTo": [{ "smelterId": "altonorte" }] },
        { "id": "escondida", "name": "Escondida (dup)", "country": "CL",
          "location": { "name": "Antofagasta", "coordinates": { "lat": -24.27, "lng": -69.07 } } }
    ]"#;

    #[test]
    fn empty_directory_loads_empty_dataset() {
        let dir = make_test_dir("dataset_empty");
        assert_eq!(load_dataset(&dir).unwrap(), Dataset::default());
        cleanup(&dir);
    }

    #[test]
    fn loads_toml_facilities() {
        let dir = make_test_dir("dataset_toml");
        fs::write(dir.join("facilities.toml"), FACILITIES_TOML).unwrap();

        let dataset = load_dataset(&dir).unwrap();
        assert_eq!(dataset.facilities.len(), 2);
        let flow = &dataset.facilities[0].feeds_to[0];
        assert_eq!(flow.target_type, "pellet_plant");
        assert!(dataset.mines.is_empty());

        cleanup(&dir);
    }

    fn boliden_facilities() -> Vec<Facility> {
        let mut garpenberg = facility_in("garpenberg", "mine", "SE", None);
        garpenberg.capacity = Some(mt(40.0));
        garpenberg.mining_method = Some(MiningMethod::Underground);
        garpenberg.status = Some(FacilityStatus::Operating);
        garpenberg.owned_by = vec![stake("boliden", 100.0)];
        garpenberg.feeds_to = vec![flow_to("ronnskar", "smelter")];

        let mut ronnskar = facility_in("ronnskar", "smelter", "SE", Some(230.5));
        ronnskar.status = Some(FacilityStatus::Construction);
        ronnskar.byproducts = Some(vec![ByproductProduction {
            metal: ByproductMetal::Au,
            amount: 12.5,
            unit: ByproductUnit::T,
            year: 2023,
            estimated: Some(true),
            source: None,
        }]);
        ronnskar.notes = Some("owner: Boliden".into());

        vec![garpenberg, ronnskar]
    }

    #[derive(Serialize)]
    struct FacilitiesTable<'a> {
        facilities: &'a [Facility],
    }

    #[test]
    fn facilities_survive_every_format() {
        let facilities = boliden_facilities();
        let files = [
            ("facilities.ron", ron::to_string(&facilities).unwrap()),
            ("facilities.json", serde_json::to_string(&facilities).unwrap()),
            (
                "facilities.toml",
                toml::to_string(&FacilitiesTable {
                    facilities: &facilities,
                })
                .unwrap(),
            ),
        ];

        for (name, content) in files {
            let dir = make_test_dir(&format!("round_trip_{name}"));
            fs::write(dir.join(name), content).unwrap();

            let dataset = load_dataset(&dir).unwrap();
            assert_eq!(dataset.facilities, facilities, "{name}");
            assert!(dataset.companies.is_empty());

            cleanup(&dir);
        }
    }

    #[test]
    fn duplicate_ids_are_kept() {
        let dir = make_test_dir("dataset_dup");
        fs::write(dir.join("mines.json"), MINES_JSON).unwrap();

        let dataset = load_dataset(&dir).unwrap();
        assert_eq!(dataset.mines.len(), 2);
        assert_eq!(dataset.mines[0].owned_by[0].company_id, "bhp");

        cleanup(&dir);
    }

    #[test]
    fn legacy_records_are_promoted() {
        let dataset = Dataset {
            mines: vec![mine_in("m1", "CL", Some(10.0))],
            smelters: vec![smelter_in("s1", "CL", Some(5.0))],
            miners: vec![company_in("c1", "CL")],
            ..Dataset::default()
        }
        .with_legacy_promoted();
        assert_eq!(dataset.facilities.len(), 2);
        assert_eq!(dataset.facilities[1].facility_type, "smelter");
        assert_eq!(dataset.companies, dataset.miners);
    }

    #[test]
    fn promotion_keeps_existing_generic_records() {
        let dataset = Dataset {
            facilities: vec![facility_in("f1", "refinery", "CH", None)],
            mines: vec![mine_in("m1", "CL", None)],
            ..Dataset::default()
        }
        .with_legacy_promoted();
        assert_eq!(dataset.facilities.len(), 1);
        assert_eq!(dataset.facilities[0].id, "f1");
    }

    #[test]
    fn apply_replaces_store_collections() {
        let mut store = Store::default();
        store.set_facilities(vec![facility_in("old", "mine", "US", None)]);
        Dataset {
            facilities: vec![facility_in("new", "mine", "US", None)],
            companies: vec![company_in("c1", "US")],
            ..Dataset::default()
        }
        .apply(&mut store);

        let state = store.state();
        assert!(state.facility_by_id("old").is_none());
        assert!(state.facility_by_id("new").is_some());
        assert!(state.company_by_id("c1").is_some());
        assert_eq!(store.events().buffered_count(), 6);
    }

    #[test]
    fn store_config_from_toml() {
        let dir = make_test_dir("store_config");
        let path = dir.join("store.toml");
        fs::write(
            &path,
            "initial_material = \"gold\"\ninitial_icon_scale = 1.25\n",
        )
        .unwrap();

        let config = load_store_config(&path).unwrap();
        assert_eq!(config.initial_material, MaterialId::Gold);
        assert_eq!(config.initial_icon_scale, 1.25);
        assert_eq!(config.event_capacity, StoreConfig::default().event_capacity);

        cleanup(&dir);
    }

    #[test]
    fn registry_override_replaces_one_material() {
        let dir = make_test_dir("registry_override");
        let mut gold = MaterialRegistry::builtin().get(MaterialId::Gold).clone();
        gold.description = "Gold, mine to vault".into();
        let path = dir.join("materials.json");
        fs::write(&path, serde_json::to_string(&vec![gold]).unwrap()).unwrap();

        let registry = load_registry(&path).unwrap();
        assert_eq!(
            registry.get(MaterialId::Gold).description,
            "Gold, mine to vault"
        );
        assert_eq!(
            registry.get(MaterialId::Iron),
            MaterialRegistry::builtin().get(MaterialId::Iron)
        );

        cleanup(&dir);
    }

    #[test]
    fn registry_with_cycle_is_rejected() {
        let dir = make_test_dir("registry_cycle");
        let mut copper = MaterialRegistry::builtin().get(MaterialId::Copper).clone();
        copper.facility_types[1].can_feed_to.push("mine".into());
        let path = dir.join("materials.json");
        fs::write(&path, serde_json::to_string(&vec![copper]).unwrap()).unwrap();

        match load_registry(&path) {
            Err(DataLoadError::Registry { source, .. }) => assert!(matches!(
                source,
                RegistryError::CycleDetected {
                    material: MaterialId::Copper,
                    ..
                }
            )),
            other => panic!("expected Registry error, got: {other:?}"),
        }

        cleanup(&dir);
    }
}
