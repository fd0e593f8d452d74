pub mod defaults;
pub mod model;

pub use model::{CaptureSettings, Settings, StorageSettings, CURRENT_SCHEMA_VERSION};
