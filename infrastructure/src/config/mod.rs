//! Configuration file loading.

mod file_config;
mod loader;

pub use file_config::FileConfig;
pub use loader::ConfigLoader;
