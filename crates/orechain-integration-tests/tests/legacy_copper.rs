//! Integration test: copper data in the legacy mine/smelter shape.
//!
//! The same files drive both rollups: the legacy one over mines and
//! smelters, and the generic one over the facilities promoted from them.

use std::fs;

use orechain_core::id::CountryCode;
use orechain_core::legacy::SMELTER_TYPE;
use orechain_core::material::MaterialId;
use orechain_core::store::{EntityType, Store};
use orechain_data::load_dataset;
use orechain_stats::{countries_with_entities, country_stats, generic_country_stats};

const MINES_JSON: &str = r#"[
    { "id": "escondida", "name": "Escondida", "country": "CL",
      "location": { "name": "Antofagasta", "coordinates": { "lat": -24.27, "lng": -69.07 } },
      "production": { "amount": 1100, "unit": "kt", "year": 2023 },
      "ownedBy": [{ "minerId": "bhp", "percentage": 57.5 }],
      "feedsTo": [{ "smelterId": "altonorte", "percentage": 30 }],
      "type": "open-pit" },
    { "id": "el-teniente", "name": "El Teniente", "country": "CL",
      "location": { "name": "Rancagua", "coordinates": { "lat": -34.09, "lng": -70.35 } },
      "ownedBy": [{ "minerId": "codelco", "percentage": 100 }],
      "type": "underground" }
]"#;

const SMELTERS_JSON: &str = r#"[
    { "id": "altonorte", "name": "Altonorte", "country": "CL",
      "location": { "name": "Antofagasta", "coordinates": { "lat": -23.78, "lng": -70.32 } },
      "capacity": { "amount": 290, "unit": "kt", "year": 2023 },
      "feedsFrom": [{ "mineId": "escondida" }],
      "owner": "Glencore",
      "byproducts": [{ "metal": "Au", "amount": 1.2, "unit": "t", "year": 2023 }] },
    { "id": "guixi", "name": "Guixi", "country": "CN",
      "location": { "name": "Jiangxi", "coordinates": { "lat": 28.29, "lng": 117.21 } },
      "capacity": { "amount": 1.0, "unit": "Mt", "year": 2023 } }
]"#;

const MINERS_JSON: &str = r#"[
    { "id": "bhp", "name": "BHP", "country": "AU",
      "hqLocation": { "name": "Melbourne", "coordinates": { "lat": -37.81, "lng": 144.96 } } },
    { "id": "codelco", "name": "Codelco", "country": "CL",
      "hqLocation": { "name": "Santiago", "coordinates": { "lat": -33.45, "lng": -70.66 } } }
]"#;

#[test]
fn legacy_copper_rollups() {
    let dir = std::env::temp_dir().join(format!("orechain_legacy_copper_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("mines.json"), MINES_JSON).unwrap();
    fs::write(dir.join("smelters.json"), SMELTERS_JSON).unwrap();
    fs::write(dir.join("miners.json"), MINERS_JSON).unwrap();

    let dataset = load_dataset(&dir).unwrap().with_legacy_promoted();
    assert_eq!(dataset.facilities.len(), 4);
    assert_eq!(dataset.companies.len(), 2);

    let mut store = Store::default();
    dataset.apply(&mut store);
    let state = store.state();

    let chile = country_stats(state, "CL");
    assert_eq!(chile.mine_count, 2);
    assert_eq!(chile.smelter_count, 1);
    assert_eq!(chile.total_production, 1100.0);
    assert_eq!(chile.total_capacity, 290.0);

    // Guixi reports in Mt; amounts are taken as reported.
    let china = country_stats(state, "CN");
    assert_eq!(china.total_capacity, 1.0);
    assert!(!china.has_mixed_units());

    let generic_chile = generic_country_stats(state, "CL");
    assert_eq!(generic_chile.facility_count(), 3);
    assert_eq!(generic_chile.total_capacity, 1390.0);

    assert_eq!(
        countries_with_entities(state),
        vec![CountryCode::from("CL"), CountryCode::from("CN")]
    );

    // Promoted facilities keep the edges and carry the smelter owner as a note.
    let altonorte = state.facility_by_id("altonorte").unwrap();
    assert_eq!(altonorte.facility_type, SMELTER_TYPE);
    assert_eq!(altonorte.feeds_from[0].target_id, "escondida");
    assert!(altonorte.owned_by.is_empty());
    assert_eq!(altonorte.notes.as_deref(), Some("owner: Glencore"));
    let escondida = state.facility_by_id("escondida").unwrap();
    assert!(
        store
            .registry()
            .check_flows(MaterialId::Copper, escondida)
            .is_empty()
    );

    store.select_entity(EntityType::Miner, "codelco");
    assert_eq!(store.state().selected_miner().unwrap().name, "Codelco");
    store.select_entity(EntityType::Smelter, "guixi");
    assert_eq!(store.state().selected_smelter().unwrap().country, "CN");

    let _ = fs::remove_dir_all(&dir);
}
