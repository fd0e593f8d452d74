pub mod db;
pub mod fs;
pub mod settings;
pub mod snapshot;
pub mod store;
