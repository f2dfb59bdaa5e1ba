use serde::{Deserialize, Serialize};

use crate::material::MaterialId;

/// Start-up settings for a [`Store`](crate::store::Store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Material shown when the session starts.
    pub initial_material: MaterialId,
    /// Clamped into the icon scale range like any other write.
    pub initial_icon_scale: f64,
    /// Capacity of the undelivered-event ring buffer.
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_material: MaterialId::Copper,
            initial_icon_scale: 0.5,
            event_capacity: 256,
        }
    }
}
