pub mod config_service;
pub mod history;
pub mod paths;

pub use crate::config_service::ConfigService;
pub use crate::history::HistoryStore;
pub use crate::paths::FabshPaths;
