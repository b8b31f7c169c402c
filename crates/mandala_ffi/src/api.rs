//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose editor actions over one process-wide chart session to Dart
//!   via FRB.
//! - Flatten core results into plain envelopes the UI can render.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failed I/O never changes the live document; the envelope carries
//!   the reason instead.
//! - Paths arrive already chosen by the host; no dialogs live here.

use log::{info, warn};
use mandala_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, load_settings,
    ping as ping_inner, save_settings, AppSettings, ChartSession, ExportFormat, FileChartStore,
    ImageLocation, ViewMode,
};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

type Session = ChartSession<FileChartStore>;

static SESSION: OnceLock<Mutex<Session>> = OnceLock::new();
static SETTINGS_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether the action completed without an I/O failure.
    pub ok: bool,
    /// Whether the document or navigation actually changed.
    pub changed: bool,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn changed(changed: bool) -> Self {
        Self {
            ok: true,
            changed,
            message: String::new(),
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            changed: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            changed: false,
            message: message.into(),
        }
    }
}

/// One grid cell as shown by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellView {
    pub cell_id: String,
    pub position: u32,
    pub text: String,
    /// Loadable image location (file path or `data:` URI), if any.
    pub image: Option<String>,
    pub has_children: bool,
}

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbView {
    pub unit_id: String,
    pub label: String,
}

/// Snapshot of everything the editor screen renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    pub chart_title: String,
    pub unit_id: String,
    pub cells: Vec<CellView>,
    pub breadcrumbs: Vec<BreadcrumbView>,
    pub depth: u32,
    /// `unit` or `overview`.
    pub view_mode: String,
    pub focused_position: Option<u32>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub can_drill_forward: bool,
    pub dirty: bool,
    pub save_path: Option<String>,
}

/// Restores the previous launch: loads settings, enables autosave and
/// reopens the last chart if it still loads.
///
/// `settings_path` is remembered and updated after later open/save-as
/// calls. The first path given in a process is kept; a different path
/// passed later is logged and ignored.
#[flutter_rust_bridge::frb(sync)]
pub fn session_restore(settings_path: String) -> ActionResponse {
    let settings_path = adopt_settings_path(&SETTINGS_PATH, PathBuf::from(settings_path.trim()));
    let settings = match load_settings(settings_path) {
        Ok(settings) => settings,
        Err(err) => {
            warn!("event=session_restore module=ffi status=error error={err}");
            AppSettings::default()
        }
    };

    with_session(|session| {
        if let Some(delay) = settings.autosave_delay() {
            if let Err(err) = session.enable_autosave(delay) {
                warn!("event=autosave_enable module=ffi status=error error={err}");
            }
        }
        let Some(last) = settings.last_save_path.as_deref() else {
            return ActionResponse::changed(false);
        };
        match session.open(last) {
            Ok(()) => {
                info!("event=session_restore module=ffi status=ok");
                ActionResponse::success("Chart restored.")
            }
            Err(err) => ActionResponse::failure(format!("session_restore failed: {err}")),
        }
    })
}

/// Replaces the live document with a fresh chart.
#[flutter_rust_bridge::frb(sync)]
pub fn chart_new() -> ActionResponse {
    with_session(|session| {
        session.new_chart();
        ActionResponse::success("New chart.")
    })
}

/// Opens the chart at `path`; on failure the current chart stays loaded.
#[flutter_rust_bridge::frb(sync)]
pub fn chart_open(path: String) -> ActionResponse {
    let path = PathBuf::from(path.trim());
    let response = with_session(|session| match session.open(&path) {
        Ok(()) => ActionResponse::success("Chart opened."),
        Err(err) => ActionResponse::failure(format!("chart_open failed: {err}")),
    });
    if response.ok {
        remember_last_path(&path);
    }
    response
}

/// Saves to the current save path.
#[flutter_rust_bridge::frb(sync)]
pub fn chart_save() -> ActionResponse {
    with_session(|session| match session.save() {
        Ok(outcome) => ActionResponse::success(saved_message(outcome.removed_assets.len())),
        Err(err) => ActionResponse::failure(format!("chart_save failed: {err}")),
    })
}

/// Saves to `path`, which becomes the save path on success.
#[flutter_rust_bridge::frb(sync)]
pub fn chart_save_as(path: String) -> ActionResponse {
    let path = PathBuf::from(path.trim());
    let response = with_session(|session| match session.save_as(&path) {
        Ok(outcome) => ActionResponse::success(saved_message(outcome.removed_assets.len())),
        Err(err) => ActionResponse::failure(format!("chart_save_as failed: {err}")),
    });
    if response.ok {
        remember_last_path(&path);
    }
    response
}

/// Exports the live chart; `format` is `markdown|md|opml|json`.
#[flutter_rust_bridge::frb(sync)]
pub fn chart_export(format: String, dest: String) -> ActionResponse {
    let Some(format) = ExportFormat::parse(&format) else {
        return ActionResponse::failure(format!("chart_export failed: unknown format `{format}`"));
    };
    let dest = PathBuf::from(dest.trim());
    with_session(|session| match session.export(format, &dest) {
        Ok(()) => ActionResponse {
            ok: true,
            changed: false,
            message: format!("Exported {}.", format.label()),
        },
        Err(err) => ActionResponse::failure(format!("chart_export failed: {err}")),
    })
}

/// Sets a cell's text.
#[flutter_rust_bridge::frb(sync)]
pub fn cell_update_text(cell_id: String, text: String) -> ActionResponse {
    with_session(|session| ActionResponse::changed(session.update_cell(&cell_id, &text)))
}

/// Copies `source` into the asset directory and attaches it to a cell.
///
/// Rejected before any file access when the chart was never saved.
#[flutter_rust_bridge::frb(sync)]
pub fn cell_attach_image(cell_id: String, source: String) -> ActionResponse {
    let source = PathBuf::from(source.trim());
    with_session(|session| match session.attach_image(&cell_id, &source) {
        Ok(changed) => ActionResponse::changed(changed),
        Err(err) => ActionResponse::failure(format!("cell_attach_image failed: {err}")),
    })
}

/// Clears a cell's image.
#[flutter_rust_bridge::frb(sync)]
pub fn cell_detach_image(cell_id: String) -> ActionResponse {
    with_session(|session| ActionResponse::changed(session.detach_image(&cell_id)))
}

/// Swaps two positions of the unit being viewed.
#[flutter_rust_bridge::frb(sync)]
pub fn cells_swap(pos_a: u32, pos_b: u32) -> ActionResponse {
    with_session(|session| {
        ActionResponse::changed(session.swap_cells(pos_a as usize, pos_b as usize))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn nav_drill_down(cell_id: String) -> ActionResponse {
    with_session(|session| ActionResponse::changed(session.drill_down(&cell_id)))
}

#[flutter_rust_bridge::frb(sync)]
pub fn nav_drill_up() -> ActionResponse {
    with_session(|session| ActionResponse::changed(session.drill_up()))
}

#[flutter_rust_bridge::frb(sync)]
pub fn nav_drill_forward() -> ActionResponse {
    with_session(|session| ActionResponse::changed(session.drill_forward()))
}

#[flutter_rust_bridge::frb(sync)]
pub fn nav_breadcrumb(index: u32) -> ActionResponse {
    with_session(|session| {
        let depth = session.depth();
        session.navigate_breadcrumb(index as usize);
        ActionResponse::changed(session.depth() != depth)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn nav_toggle_view() -> ActionResponse {
    with_session(|session| {
        session.toggle_view();
        ActionResponse::changed(true)
    })
}

/// Sets (or with `None`, clears) the focused grid position.
#[flutter_rust_bridge::frb(sync)]
pub fn nav_set_focus(position: Option<u32>) -> ActionResponse {
    with_session(|session| {
        session.set_focused_position(position.map(|value| value as usize));
        ActionResponse::changed(true)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn history_undo() -> ActionResponse {
    with_session(|session| ActionResponse::changed(session.undo()))
}

#[flutter_rust_bridge::frb(sync)]
pub fn history_redo() -> ActionResponse {
    with_session(|session| ActionResponse::changed(session.redo()))
}

/// Returns what the editor screen should render right now.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_view() -> EditorView {
    with_session(|session| build_view(session))
}

fn build_view(session: &Session) -> EditorView {
    let unit = session.current_unit();
    let cells = unit
        .cells
        .iter()
        .map(|cell| CellView {
            cell_id: cell.id.clone(),
            position: cell.position as u32,
            text: cell.text.clone(),
            image: cell
                .image
                .as_deref()
                .and_then(|image| session.resolve_image(image))
                .map(location_to_string),
            has_children: cell.children.is_some(),
        })
        .collect();
    let breadcrumbs = session
        .breadcrumbs()
        .into_iter()
        .map(|crumb| BreadcrumbView {
            unit_id: crumb.unit_id,
            label: crumb.label,
        })
        .collect();
    let nav = session.nav();

    EditorView {
        chart_title: session.chart().title.clone(),
        unit_id: unit.id.clone(),
        cells,
        breadcrumbs,
        depth: session.depth() as u32,
        view_mode: match nav.view() {
            ViewMode::Unit => "unit",
            ViewMode::Overview => "overview",
        }
        .to_string(),
        focused_position: nav.focused_position().map(|value| value as u32),
        can_undo: session.history().can_undo(),
        can_redo: session.history().can_redo(),
        can_drill_forward: !nav.forward_stack().is_empty(),
        dirty: session.is_dirty(),
        save_path: session
            .save_path()
            .map(|path| path.to_string_lossy().into_owned()),
    }
}

fn location_to_string(location: ImageLocation) -> String {
    match location {
        ImageLocation::Embedded(uri) => uri,
        ImageLocation::File(path) => path.to_string_lossy().into_owned(),
    }
}

fn saved_message(removed_assets: usize) -> String {
    if removed_assets == 0 {
        "Saved.".to_string()
    } else {
        format!("Saved; removed {removed_assets} unused image(s).")
    }
}

fn with_session<T>(f: impl FnOnce(&mut Session) -> T) -> T {
    let mut guard = lock_session();
    f(&mut guard)
}

fn lock_session() -> MutexGuard<'static, Session> {
    SESSION
        .get_or_init(|| Mutex::new(ChartSession::new(FileChartStore::new())))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn adopt_settings_path(slot: &OnceLock<PathBuf>, requested: PathBuf) -> &Path {
    let mut requested = Some(requested);
    let kept = slot.get_or_init(|| requested.take().unwrap_or_default());
    if let Some(ignored) = requested.filter(|path| path != kept) {
        warn!(
            "event=settings_path module=ffi status=ignored requested={} kept={}",
            ignored.display(),
            kept.display()
        );
    }
    kept
}

fn remember_last_path(path: &Path) {
    let Some(settings_path) = SETTINGS_PATH.get() else {
        return;
    };
    let mut settings = match load_settings(settings_path) {
        Ok(settings) => settings,
        Err(err) => {
            warn!("event=settings_load module=ffi status=error error={err}");
            AppSettings::default()
        }
    };
    settings.last_save_path = Some(path.to_path_buf());
    if let Err(err) = save_settings(settings_path, &settings) {
        warn!("event=settings_save module=ffi status=error error={err}");
    }
}

#[cfg(test)]
mod tests {
    use super::{
        adopt_settings_path, cell_attach_image, cell_update_text, cells_swap, chart_export,
        chart_new, chart_open, chart_save, chart_save_as, core_version, editor_view,
        history_undo, init_logging, nav_drill_down, nav_drill_forward, nav_drill_up, ping,
    };
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

    static FLOW_LOCK: Mutex<()> = Mutex::new(());

    // The session is process-wide; tests that touch it run one at a time.
    fn serial() -> MutexGuard<'static, ()> {
        let guard = FLOW_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        chart_new();
        guard
    }

    #[test]
    fn first_settings_path_is_kept() {
        let slot = OnceLock::new();
        let first = adopt_settings_path(&slot, PathBuf::from("/profile/a/settings.json"));
        assert_eq!(first, Path::new("/profile/a/settings.json"));
        let again = adopt_settings_path(&slot, PathBuf::from("/profile/b/settings.json"));
        assert_eq!(again, Path::new("/profile/a/settings.json"));
        let same = adopt_settings_path(&slot, PathBuf::from("/profile/a/settings.json"));
        assert_eq!(same, Path::new("/profile/a/settings.json"));
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn edit_and_undo_round_trip_through_view() {
        let _guard = serial();
        let view = editor_view();
        assert_eq!(view.cells.len(), 9);
        assert_eq!(view.depth, 0);
        let first = view.cells[0].cell_id.clone();

        let response = cell_update_text(first.clone(), "plan".to_string());
        assert!(response.ok && response.changed);
        assert!(editor_view().can_undo);

        assert!(history_undo().changed);
        assert_eq!(editor_view().cells[0].text, "");
    }

    #[test]
    fn drill_round_trip_reports_forward_availability() {
        let _guard = serial();
        let first = editor_view().cells[0].cell_id.clone();

        assert!(nav_drill_down(first).changed);
        let child = editor_view();
        assert_eq!(child.depth, 1);
        assert_eq!(child.breadcrumbs.len(), 2);

        assert!(nav_drill_up().changed);
        assert!(editor_view().can_drill_forward);
        assert!(nav_drill_forward().changed);
        assert_eq!(editor_view().unit_id, child.unit_id);
    }

    #[test]
    fn center_swap_is_a_noop() {
        let _guard = serial();
        let response = cells_swap(4, 0);
        assert!(response.ok);
        assert!(!response.changed);
    }

    #[test]
    fn io_failures_are_reported_in_envelope() {
        let _guard = serial();
        let first = editor_view().cells[0].cell_id.clone();

        assert!(!chart_save().ok);
        assert!(!chart_open("/definitely/missing.mandala".to_string()).ok);
        assert!(!chart_export("pdf".to_string(), "/tmp/out.pdf".to_string()).ok);
        let attach = cell_attach_image(first, "/tmp/photo.png".to_string());
        assert!(!attach.ok);
        assert!(attach.message.contains("save the chart"));
    }

    #[test]
    fn save_as_then_export_writes_files() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let chart_path = dir.path().join("ffi.mandala");
        let export_path = dir.path().join("ffi.md");

        let saved = chart_save_as(chart_path.to_string_lossy().into_owned());
        assert!(saved.ok, "{}", saved.message);
        assert!(!editor_view().dirty);
        let exported = chart_export(
            "markdown".to_string(),
            export_path.to_string_lossy().into_owned(),
        );
        assert!(exported.ok, "{}", exported.message);
        assert!(export_path.exists());
    }
}
