//! Core domain logic for the mandala chart editor.
//! This crate is the single source of truth for chart invariants.

pub mod config;
pub mod export;
pub mod history;
pub mod logging;
pub mod model;
pub mod nav;
pub mod repo;
pub mod service;

pub use config::{load_settings, save_settings, AppSettings, SettingsError, SETTINGS_FILE_NAME};
pub use export::{render, ExportError, ExportFormat};
pub use history::{History, HISTORY_CAPACITY};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::chart::{
    Cell, CellId, Chart, ChartId, ModelValidationError, Unit, UnitId, CELL_COUNT, CENTER,
};
pub use model::sync::{is_synchronized, sync_center_text};
pub use model::tree::{
    ensure_child_unit, find_cell, find_unit_by_id, find_unit_path, set_cell_image, swap_cells,
    update_cell_text,
};
pub use nav::breadcrumbs::{build_breadcrumbs, Breadcrumb};
pub use nav::state::{NavState, ViewMode};
pub use repo::assets::{AssetError, ImageLocation};
pub use repo::chart_store::{ChartStore, FileChartStore, SaveOutcome, StoreError, StoreResult};
pub use service::session::{ChartSession, SessionError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
