pub mod dataset;
pub mod loader;

pub use dataset::{Dataset, load_dataset, load_registry, load_store_config};
pub use loader::DataLoadError;
