//! The application store: loaded collections plus view and selection state.
//!
//! A [`Store`] is constructed explicitly and handed to whatever needs it.
//! State is only changed through the store's mutators; each mutation is
//! visible to the next read at once and is also published as a
//! [`StoreEvent`] for subscribers, which are notified on [`Store::flush`].
//!
//! Read queries live on [`AppState`] so that subscribers, which receive
//! `&AppState`, can use them too. Lookups are linear scans returning `None`
//! on a miss; nothing here fails.
//!
//! ```rust,ignore
//! let mut store = Store::default();
//! store.subscribe(EventKind::SelectionChanged, Box::new(|_, state| redraw(state)));
//! store.set_facilities(facilities);
//! store.select_entity(EntityType::Facility, "kiruna");
//! store.flush();
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StoreConfig;
use crate::event::{
    EventBus, EventFilter, EventKind, PassiveListener, ReactiveHandler, StoreCommand, StoreEvent,
    SubscriberPriority, SubscriptionId,
};
use crate::legacy::{Mine, Miner, Smelter};
use crate::material::{FacilityTypeConfig, MaterialConfig, MaterialId, MaterialRegistry};
use crate::model::{Company, Facility};

pub const ICON_SCALE_MIN: f64 = 0.25;
pub const ICON_SCALE_MAX: f64 = 2.0;

/// Clamp into `[ICON_SCALE_MIN, ICON_SCALE_MAX]`. NaN maps to the minimum.
pub fn clamp_icon_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        return ICON_SCALE_MIN;
    }
    scale.clamp(ICON_SCALE_MIN, ICON_SCALE_MAX)
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Mine,
    Smelter,
    Miner,
    Country,
    Facility,
    Company,
}

/// What the user has selected. `id` is a country code for
/// [`EntityType::Country`] and an entity id otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self {
            entity_type,
            id: id.into(),
        }
    }
}

/// The replaceable entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Mines,
    Smelters,
    Miners,
    Facilities,
    Companies,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Snapshot of everything the views read.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub current_material: MaterialId,
    pub mines: Vec<Mine>,
    pub smelters: Vec<Smelter>,
    pub miners: Vec<Miner>,
    pub facilities: Vec<Facility>,
    pub companies: Vec<Company>,
    pub selected_entity: Option<EntityRef>,
    /// Always within `[ICON_SCALE_MIN, ICON_SCALE_MAX]`.
    pub icon_scale: f64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

impl AppState {
    fn from_config(config: &StoreConfig) -> Self {
        Self {
            current_material: config.initial_material,
            mines: Vec::new(),
            smelters: Vec::new(),
            miners: Vec::new(),
            facilities: Vec::new(),
            companies: Vec::new(),
            selected_entity: None,
            icon_scale: clamp_icon_scale(config.initial_icon_scale),
        }
    }

    /// First legacy mine with this id.
    pub fn mine_by_id(&self, id: &str) -> Option<&Mine> {
        self.mines.iter().find(|m| m.id == id)
    }

    /// First legacy smelter with this id.
    pub fn smelter_by_id(&self, id: &str) -> Option<&Smelter> {
        self.smelters.iter().find(|s| s.id == id)
    }

    /// First legacy miner with this id.
    pub fn miner_by_id(&self, id: &str) -> Option<&Miner> {
        self.miners.iter().find(|m| m.id == id)
    }

    /// First facility with this id.
    pub fn facility_by_id(&self, id: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id == id)
    }

    /// First company with this id.
    pub fn company_by_id(&self, id: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == id)
    }

    /// Id of the current selection if it has type `entity_type`.
    fn selected_id(&self, entity_type: EntityType) -> Option<&str> {
        self.selected_entity
            .as_ref()
            .filter(|sel| sel.entity_type == entity_type)
            .map(|sel| sel.id.as_str())
    }

    pub fn selected_mine(&self) -> Option<&Mine> {
        self.selected_id(EntityType::Mine)
            .and_then(|id| self.mine_by_id(id))
    }

    pub fn selected_smelter(&self) -> Option<&Smelter> {
        self.selected_id(EntityType::Smelter)
            .and_then(|id| self.smelter_by_id(id))
    }

    pub fn selected_miner(&self) -> Option<&Miner> {
        self.selected_id(EntityType::Miner)
            .and_then(|id| self.miner_by_id(id))
    }

    pub fn selected_facility(&self) -> Option<&Facility> {
        self.selected_id(EntityType::Facility)
            .and_then(|id| self.facility_by_id(id))
    }

    pub fn selected_company(&self) -> Option<&Company> {
        self.selected_id(EntityType::Company)
            .and_then(|id| self.company_by_id(id))
    }

    /// Country code of a country selection. Not checked against the data.
    pub fn selected_country(&self) -> Option<&str> {
        self.selected_id(EntityType::Country)
    }

    /// Facilities of one type, in collection order.
    pub fn facilities_by_type(&self, facility_type: &str) -> Vec<&Facility> {
        self.facilities
            .iter()
            .filter(|f| f.facility_type == facility_type)
            .collect()
    }

    /// Facilities in which `company` holds a stake, in collection order.
    pub fn facilities_owned_by(&self, company: &str) -> Vec<&Facility> {
        self.facilities
            .iter()
            .filter(|f| f.is_owned_by(company))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Store {
    state: AppState,
    registry: Arc<MaterialRegistry>,
    events: EventBus,
    config: StoreConfig,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl Store {
    /// A store over the built-in material registry.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_registry(config, MaterialRegistry::shared_builtin())
    }

    pub fn with_registry(config: StoreConfig, registry: Arc<MaterialRegistry>) -> Self {
        Self {
            state: AppState::from_config(&config),
            registry,
            events: EventBus::new(config.event_capacity),
            config,
        }
    }

    /// Current snapshot. Reflects every write, flushed or not.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Material registry this store resolves configs against.
    pub fn registry(&self) -> &MaterialRegistry {
        &self.registry
    }

    /// The bus holding undelivered events.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Configuration of the current material.
    pub fn material_config(&self) -> &MaterialConfig {
        self.registry.get(self.state.current_material)
    }

    /// A facility type of the current material.
    pub fn facility_type_config(&self, facility_type: &str) -> Option<&FacilityTypeConfig> {
        self.registry
            .facility_type(self.state.current_material, facility_type)
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    /// Switch material. Always clears the selection, even when `material`
    /// is already current.
    pub fn set_material(&mut self, material: MaterialId) {
        let previous = self.state.current_material;
        self.state.current_material = material;
        debug!(%previous, current = %material, "material changed");
        self.events.emit(StoreEvent::MaterialChanged {
            previous,
            current: material,
        });
        if let Some(selection) = self.state.selected_entity.take() {
            self.events.emit(StoreEvent::SelectionChanged {
                previous: Some(selection),
                current: None,
            });
        }
    }

    /// Set the marker scale, clamped to `[ICON_SCALE_MIN, ICON_SCALE_MAX]`.
    /// NaN is stored as the lower bound.
    pub fn set_icon_scale(&mut self, scale: f64) {
        let applied = clamp_icon_scale(scale);
        self.state.icon_scale = applied;
        debug!(requested = scale, applied, "icon scale changed");
        self.events.emit(StoreEvent::IconScaleChanged {
            requested: scale,
            applied,
        });
    }

    /// Replace the legacy mine collection.
    pub fn set_mines(&mut self, data: Vec<Mine>) {
        self.state.mines = data;
        self.replaced(Collection::Mines, self.state.mines.len());
    }

    /// Replace the legacy smelter collection.
    pub fn set_smelters(&mut self, data: Vec<Smelter>) {
        self.state.smelters = data;
        self.replaced(Collection::Smelters, self.state.smelters.len());
    }

    /// Replace the legacy miner collection.
    pub fn set_miners(&mut self, data: Vec<Miner>) {
        self.state.miners = data;
        self.replaced(Collection::Miners, self.state.miners.len());
    }

    /// Replace the facility collection. The selection is left alone.
    pub fn set_facilities(&mut self, data: Vec<Facility>) {
        self.state.facilities = data;
        self.replaced(Collection::Facilities, self.state.facilities.len());
    }

    /// Replace the company collection.
    pub fn set_companies(&mut self, data: Vec<Company>) {
        self.state.companies = data;
        self.replaced(Collection::Companies, self.state.companies.len());
    }

    fn replaced(&mut self, collection: Collection, len: usize) {
        debug!(?collection, len, "collection replaced");
        self.events
            .emit(StoreEvent::CollectionReplaced { collection, len });
    }

    /// Select an entity. The id is not checked against any collection.
    pub fn select_entity(&mut self, entity_type: EntityType, id: impl Into<String>) {
        let current = EntityRef::new(entity_type, id);
        debug!(?entity_type, id = %current.id, "entity selected");
        let previous = self.state.selected_entity.replace(current.clone());
        self.events.emit(StoreEvent::SelectionChanged {
            previous,
            current: Some(current),
        });
    }

    /// Emits `SelectionChanged` even when nothing was selected.
    pub fn clear_selection(&mut self) {
        let previous = self.state.selected_entity.take();
        debug!(had_selection = previous.is_some(), "selection cleared");
        self.events.emit(StoreEvent::SelectionChanged {
            previous,
            current: None,
        });
    }

    /// Apply a command through the matching mutator.
    pub fn dispatch(&mut self, command: StoreCommand) {
        match command {
            StoreCommand::SetMaterial(material) => self.set_material(material),
            StoreCommand::SetIconScale(scale) => self.set_icon_scale(scale),
            StoreCommand::Select(EntityRef { entity_type, id }) => {
                self.select_entity(entity_type, id)
            }
            StoreCommand::ClearSelection => self.clear_selection(),
        }
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Register a passive listener at normal priority.
    pub fn subscribe(&mut self, kind: EventKind, listener: PassiveListener) -> SubscriptionId {
        self.events.on_passive(kind, listener)
    }

    /// Like [`subscribe`](Self::subscribe), with a priority and an optional filter.
    pub fn subscribe_with(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) -> SubscriptionId {
        self.events
            .on_passive_filtered(kind, priority, filter, listener)
    }

    /// Register a handler whose returned commands run after delivery.
    pub fn subscribe_reactive(
        &mut self,
        kind: EventKind,
        handler: ReactiveHandler,
    ) -> SubscriptionId {
        self.events.on_reactive(kind, handler)
    }

    /// Returns `false` if `id` was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Stop buffering events of `kind`.
    pub fn suppress(&mut self, kind: EventKind) {
        self.events.suppress(kind);
    }

    /// Notify subscribers of every write since the last flush, then apply
    /// the commands reactive handlers returned. Events raised by those
    /// commands are delivered on the next flush.
    ///
    /// Returns the number of events delivered.
    pub fn flush(&mut self) -> usize {
        let delivered = self.events.deliver(&self.state);
        for command in self.events.drain_commands() {
            self.dispatch(command);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn initial_state() {
        let store = Store::default();
        let state = store.state();
        assert_eq!(state.current_material, MaterialId::Copper);
        assert_eq!(state.icon_scale, 0.5);
        assert!(state.selected_entity.is_none());
        assert!(state.facilities.is_empty());
        assert_eq!(store.material_config().symbol, "Cu");
    }

    #[test]
    fn stores_share_the_builtin_registry() {
        let a = Store::default();
        let b = Store::new(StoreConfig {
            initial_material: MaterialId::Gold,
            ..StoreConfig::default()
        });
        assert!(std::ptr::eq(a.registry(), b.registry()));
        assert!(std::ptr::eq(a.registry(), MaterialRegistry::builtin()));
    }

    #[test]
    fn config_initial_scale_is_clamped() {
        let store = Store::new(StoreConfig {
            initial_icon_scale: 9.0,
            initial_material: MaterialId::Gold,
            ..StoreConfig::default()
        });
        assert_eq!(store.state().icon_scale, ICON_SCALE_MAX);
        assert_eq!(store.state().current_material, MaterialId::Gold);
    }

    #[test]
    fn icon_scale_is_clamped() {
        let mut store = Store::default();
        for (input, expected) in [
            (0.0, 0.25),
            (-3.0, 0.25),
            (0.25, 0.25),
            (1.3, 1.3),
            (2.0, 2.0),
            (5.0, 2.0),
            (f64::INFINITY, 2.0),
            (f64::NAN, 0.25),
        ] {
            store.set_icon_scale(input);
            assert_eq!(store.state().icon_scale, expected, "input {input}");
        }
    }

    #[test]
    fn set_material_clears_selection() {
        let mut store = Store::default();
        store.select_entity(EntityType::Mine, "escondida");
        store.set_material(MaterialId::Iron);
        assert!(store.state().selected_entity.is_none());
        assert_eq!(store.state().current_material, MaterialId::Iron);
        assert_eq!(store.material_config().symbol, "Fe");
        assert!(store.facility_type_config("steel_mill").is_some());
        assert!(store.facility_type_config("smelter").is_none());
    }

    #[test]
    fn same_material_still_clears_selection() {
        let mut store = Store::default();
        store.select_entity(EntityType::Country, "CL");
        store.set_material(MaterialId::Copper);
        assert!(store.state().selected_entity.is_none());
    }

    #[test]
    fn lookups_miss_without_panicking() {
        let mut store = Store::default();
        store.set_mines(vec![mine_in("m1", "CL", Some(10.0))]);
        let state = store.state();
        assert!(state.mine_by_id("m1").is_some());
        assert!(state.mine_by_id("nope").is_none());
        assert!(state.smelter_by_id("m1").is_none());
        assert!(state.miner_by_id("").is_none());
        assert!(state.facility_by_id("m1").is_none());
        assert!(state.company_by_id("m1").is_none());
    }

    #[test]
    fn selection_type_guard() {
        let mut store = Store::default();
        store.set_mines(vec![mine_in("x", "CL", None)]);
        store.set_smelters(vec![smelter_in("x", "CL", None)]);
        store.select_entity(EntityType::Mine, "x");
        assert!(store.state().selected_mine().is_some());
        assert!(store.state().selected_smelter().is_none());
        assert!(store.state().selected_miner().is_none());
        assert!(store.state().selected_country().is_none());
    }

    #[test]
    fn selection_of_missing_entity_resolves_to_none() {
        let mut store = Store::default();
        store.select_entity(EntityType::Facility, "ghost");
        assert_eq!(
            store.state().selected_entity,
            Some(EntityRef::new(EntityType::Facility, "ghost"))
        );
        assert!(store.state().selected_facility().is_none());
        store.clear_selection();
        assert!(store.state().selected_entity.is_none());
    }

    #[test]
    fn selected_generic_entities() {
        let mut store = Store::default();
        store.set_facilities(vec![facility_in("f1", "mine", "US", Some(10.0))]);
        store.set_companies(vec![company_in("c1", "US")]);
        store.select_entity(EntityType::Company, "c1");
        assert_eq!(store.state().selected_company().unwrap().id, "c1");
        store.select_entity(EntityType::Facility, "f1");
        assert_eq!(store.state().selected_facility().unwrap().id, "f1");
        store.select_entity(EntityType::Country, "US");
        assert_eq!(store.state().selected_country(), Some("US"));
    }

    #[test]
    fn facilities_by_type_preserves_order() {
        let mut store = Store::default();
        store.set_facilities(vec![
            facility_in("a", "mine", "AU", None),
            facility_in("b", "smelter", "CN", None),
            facility_in("c", "mine", "CL", None),
        ]);
        let ids: Vec<&str> = store
            .state()
            .facilities_by_type("mine")
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "c"]);
        assert!(store.state().facilities_by_type("refinery").is_empty());
    }

    #[test]
    fn facilities_owned_by_company() {
        let mut store = Store::default();
        let mut owned = facility_in("a", "mine", "AU", None);
        owned.owned_by.push(stake("bhp", 60.0));
        store.set_facilities(vec![owned, facility_in("b", "mine", "AU", None)]);
        let ids: Vec<&str> = store
            .state()
            .facilities_owned_by("bhp")
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, ["a"]);
    }

    #[test]
    fn collections_are_replaced_not_merged() {
        let mut store = Store::default();
        store.set_facilities(vec![facility_in("a", "mine", "AU", None)]);
        store.set_facilities(vec![facility_in("b", "mine", "AU", None)]);
        assert_eq!(store.state().facilities.len(), 1);
        assert!(store.state().facility_by_id("a").is_none());
    }

    #[test]
    fn writes_are_visible_before_flush() {
        let mut store = Store::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        store.subscribe(
            EventKind::IconScaleChanged,
            Box::new(move |_, state| s.borrow_mut().push(state.icon_scale)),
        );
        store.set_icon_scale(1.5);
        assert_eq!(store.state().icon_scale, 1.5);
        assert!(seen.borrow().is_empty());
        assert_eq!(store.flush(), 1);
        assert_eq!(*seen.borrow(), vec![1.5]);
    }

    #[test]
    fn material_change_publishes_selection_cleared() {
        let mut store = Store::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::MaterialChanged, EventKind::SelectionChanged] {
            let log = Rc::clone(&log);
            store.subscribe(
                kind,
                Box::new(move |event, _| log.borrow_mut().push(event.clone())),
            );
        }
        store.select_entity(EntityType::Mine, "m1");
        store.set_material(MaterialId::Gold);
        store.flush();

        let log = log.borrow();
        assert_eq!(log.len(), 3);
        assert_eq!(
            log[1],
            StoreEvent::MaterialChanged {
                previous: MaterialId::Copper,
                current: MaterialId::Gold,
            }
        );
        assert_eq!(
            log[2],
            StoreEvent::SelectionChanged {
                previous: Some(EntityRef::new(EntityType::Mine, "m1")),
                current: None,
            }
        );
    }

    #[test]
    fn reactive_commands_apply_after_delivery() {
        let mut store = Store::default();
        store.subscribe_reactive(
            EventKind::MaterialChanged,
            Box::new(|event, _| match event {
                StoreEvent::MaterialChanged {
                    current: MaterialId::Gold,
                    ..
                } => vec![StoreCommand::SetIconScale(1.0)],
                _ => Vec::new(),
            }),
        );
        store.set_material(MaterialId::Gold);
        assert_eq!(store.state().icon_scale, 0.5);
        store.flush();
        assert_eq!(store.state().icon_scale, 1.0);
        // The command's own event waits for the next flush.
        assert_eq!(store.events().buffered_count(), 1);
        assert_eq!(store.flush(), 1);
    }

    #[test]
    fn dispatch_routes_commands() {
        let mut store = Store::default();
        let peru = EntityRef::new(EntityType::Country, "PE");
        store.dispatch(StoreCommand::Select(peru));
        assert_eq!(store.state().selected_country(), Some("PE"));
        store.dispatch(StoreCommand::ClearSelection);
        assert!(store.state().selected_entity.is_none());
        store.dispatch(StoreCommand::SetMaterial(MaterialId::Titanium));
        assert_eq!(store.state().current_material, MaterialId::Titanium);
    }

    #[test]
    fn suppressed_events_are_not_delivered() {
        let mut store = Store::default();
        let hits = Rc::new(RefCell::new(0));
        let h = Rc::clone(&hits);
        store.subscribe(
            EventKind::CollectionReplaced,
            Box::new(move |_, _| *h.borrow_mut() += 1),
        );
        store.suppress(EventKind::CollectionReplaced);
        store.set_facilities(Vec::new());
        assert_eq!(store.flush(), 0);
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn entity_ref_serializes_type_field() {
        let sel = EntityRef::new(EntityType::Smelter, "altonorte");
        let json = serde_json::to_string(&sel).unwrap();
        assert_eq!(json, r#"{"type":"smelter","id":"altonorte"}"#);
    }
}
