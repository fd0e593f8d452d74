pub mod app_dirs;
pub mod clipboard;
pub mod error;
pub mod ports;
pub mod settings;

pub use app_dirs::AppDirs;
pub use error::StoreError;
