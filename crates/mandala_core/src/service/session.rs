//! Chart editing session.
//!
//! # Responsibility
//! - Own the live chart, its undo log, navigation state and save path.
//! - Run every content action as mutate -> sync -> record.
//! - Route load/save/export/image I/O through the store and report
//!   failures without touching in-memory state.
//!
//! # Invariants
//! - Exactly one history entry per action that changes the tree; an
//!   operator returning the same root (by `Arc` identity) records nothing.
//! - After undo/redo the navigation path is re-validated.
//! - Loading or creating a chart clears history and navigation.

use crate::export::{export_to_file, ExportError, ExportFormat};
use crate::history::History;
use crate::model::chart::{Chart, Unit};
use crate::model::sync::sync_center_text;
use crate::model::tree::{
    find_cell, find_unit_by_id, set_cell_image, swap_cells, update_cell_text,
};
use crate::nav::breadcrumbs::{build_breadcrumbs, Breadcrumb};
use crate::nav::state::{NavState, ViewMode};
use crate::repo::assets::{images_dir_name, resolve_image, AssetError, ImageLocation};
use crate::repo::chart_store::{ChartStore, SaveOutcome, StoreError};
use crate::service::autosave::{AutoSaver, SaveJob};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Errors surfaced by session I/O actions.
#[derive(Debug)]
pub enum SessionError {
    /// `save` was called before any save path was chosen.
    NoSavePath,
    Store(StoreError),
    Asset(AssetError),
    Export(ExportError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSavePath => write!(f, "no save path chosen yet"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Asset(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoSavePath => None,
            Self::Store(err) => Some(err),
            Self::Asset(err) => Some(err),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<AssetError> for SessionError {
    fn from(value: AssetError) -> Self {
        Self::Asset(value)
    }
}

impl From<ExportError> for SessionError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

/// Editing session over one chart document.
pub struct ChartSession<S: ChartStore> {
    store: S,
    chart: Chart,
    history: History<Chart>,
    nav: NavState,
    save_path: Option<PathBuf>,
    revision: u64,
    saved_revision: Arc<AtomicU64>,
    autosave: Option<AutoSaver>,
}

impl<S: ChartStore> ChartSession<S> {
    /// Starts a session on a fresh, unsaved chart.
    pub fn new(store: S) -> Self {
        Self::with_chart(store, Chart::new(), None)
    }

    /// Starts a session on an existing chart.
    pub fn with_chart(store: S, chart: Chart, save_path: Option<PathBuf>) -> Self {
        let nav = NavState::new(chart.root_unit.id.clone());
        Self {
            store,
            history: History::new(chart.clone()),
            chart,
            nav,
            save_path,
            revision: 0,
            saved_revision: Arc::new(AtomicU64::new(0)),
            autosave: None,
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn root(&self) -> &Arc<Unit> {
        &self.chart.root_unit
    }

    pub fn nav(&self) -> &NavState {
        &self.nav
    }

    pub fn history(&self) -> &History<Chart> {
        &self.history
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    /// Returns whether the live chart differs from the last saved one.
    pub fn is_dirty(&self) -> bool {
        self.saved_revision.load(Ordering::SeqCst) != self.revision
    }

    /// Unit being viewed; falls back to the root.
    pub fn current_unit(&self) -> &Arc<Unit> {
        find_unit_by_id(&self.chart.root_unit, self.nav.current_unit_id())
            .unwrap_or(&self.chart.root_unit)
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        build_breadcrumbs(&self.chart.root_unit, self.nav.current_unit_id())
    }

    pub fn depth(&self) -> usize {
        self.nav.depth()
    }

    pub fn is_top_level(&self) -> bool {
        self.nav.is_top_level()
    }

    /// Resolves a cell image reference against the current save path.
    pub fn resolve_image(&self, image: &str) -> Option<ImageLocation> {
        resolve_image(image, self.save_path.as_deref())
    }

    // Content actions.

    /// Sets a cell's text. Returns `true` when the document changed.
    pub fn update_cell(&mut self, cell_id: &str, text: &str) -> bool {
        self.apply(|root| update_cell_text(root, cell_id, text))
    }

    /// Sets or clears a cell's image reference.
    pub fn set_cell_image(&mut self, cell_id: &str, image: Option<&str>) -> bool {
        self.apply(|root| set_cell_image(root, cell_id, image))
    }

    /// Swaps two positions of the unit being viewed.
    pub fn swap_cells(&mut self, pos_a: usize, pos_b: usize) -> bool {
        let unit_id = self.nav.current_unit_id().to_string();
        self.swap_cells_in(&unit_id, pos_a, pos_b)
    }

    /// Swaps two positions of the unit with `unit_id`.
    pub fn swap_cells_in(&mut self, unit_id: &str, pos_a: usize, pos_b: usize) -> bool {
        self.apply(|root| swap_cells(root, unit_id, pos_a, pos_b))
    }

    /// Copies `source` into the asset directory and attaches it to a cell.
    ///
    /// Unknown cells return `Ok(false)` without copying anything. A running
    /// autosave of an older snapshot finishes (and sweeps) before the copy.
    ///
    /// # Errors
    /// - `Asset(NoSavePath)` when the chart has never been saved.
    /// - `Asset(..)` for unsupported or unreadable sources.
    pub fn attach_image(&mut self, cell_id: &str, source: &Path) -> Result<bool, SessionError> {
        let Some(save_path) = self.save_path.clone() else {
            return Err(AssetError::NoSavePath.into());
        };
        if find_cell(&self.chart.root_unit, cell_id).is_none() {
            return Ok(false);
        }
        self.cancel_autosave();
        let file_name = match self.store.import_image(source, &save_path) {
            Ok(file_name) => file_name,
            Err(err) => {
                self.resume_autosave();
                return Err(err.into());
            }
        };
        Ok(self.set_cell_image(cell_id, Some(&file_name)))
    }

    /// Clears a cell's image; the file is reclaimed by the next save.
    pub fn detach_image(&mut self, cell_id: &str) -> bool {
        self.set_cell_image(cell_id, None)
    }

    // Navigation actions.

    /// Enters (materializing if needed) the child unit of `cell_id`.
    ///
    /// Materializing a unit is a document change and is recorded.
    pub fn drill_down(&mut self, cell_id: &str) -> bool {
        let depth = self.nav.depth();
        let next = self.nav.drill_down(&self.chart.root_unit, cell_id);
        if !Arc::ptr_eq(&next, &self.chart.root_unit) {
            self.commit(next);
        }
        self.nav.depth() > depth
    }

    pub fn drill_up(&mut self) -> bool {
        self.nav.drill_up()
    }

    pub fn drill_forward(&mut self) -> bool {
        self.nav.drill_forward(&self.chart.root_unit)
    }

    pub fn navigate_breadcrumb(&mut self, index: usize) {
        self.nav.navigate_breadcrumb(index);
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.nav.set_view(view);
    }

    pub fn toggle_view(&mut self) {
        self.nav.toggle_view();
    }

    pub fn set_focused_position(&mut self, position: Option<usize>) {
        self.nav.set_focused_position(position);
    }

    /// Returns to the root if the viewed unit vanished from the tree.
    pub fn reset_nav_if_needed(&mut self) -> bool {
        self.nav.reset_if_needed(&self.chart.root_unit)
    }

    // History actions.

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.chart = snapshot.clone();
        self.after_history_move();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.chart = snapshot.clone();
        self.after_history_move();
        true
    }

    // Document lifecycle.

    /// Replaces the document with a fresh, unsaved chart.
    pub fn new_chart(&mut self) {
        self.cancel_autosave();
        self.replace_chart(Chart::new(), None);
    }

    /// Loads a chart from `path` and makes it the live document.
    ///
    /// On failure the current document stays loaded.
    pub fn open(&mut self, path: &Path) -> Result<(), SessionError> {
        let chart = self.store.load_chart(path)?;
        self.cancel_autosave();
        self.replace_chart(chart, Some(path.to_path_buf()));
        info!("event=session_open module=service status=ok");
        Ok(())
    }

    /// Adopts an already-parsed chart (e.g. handed over by the host).
    pub fn init_from_chart(&mut self, chart: Chart, save_path: Option<PathBuf>) {
        self.cancel_autosave();
        self.replace_chart(chart, save_path);
    }

    /// Saves to the current save path.
    pub fn save(&mut self) -> Result<SaveOutcome, SessionError> {
        let path = self.save_path.clone().ok_or(SessionError::NoSavePath)?;
        self.save_as(&path)
    }

    /// Saves to `path`; on success `path` becomes the save path.
    ///
    /// Waits for a running autosave first, so an older snapshot never
    /// lands on disk after this one.
    pub fn save_as(&mut self, path: &Path) -> Result<SaveOutcome, SessionError> {
        self.cancel_autosave();
        let outcome = match self.store.save_chart(&self.chart, path) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.resume_autosave();
                return Err(err.into());
            }
        };
        self.chart.updated_at = outcome.chart.updated_at;
        self.save_path = Some(path.to_path_buf());
        self.saved_revision.store(self.revision, Ordering::SeqCst);
        Ok(outcome)
    }

    /// Writes an export of the live chart to `dest`.
    pub fn export(&self, format: ExportFormat, dest: &Path) -> Result<(), SessionError> {
        let dir_name = self.save_path.as_deref().map(images_dir_name);
        export_to_file(&self.chart, format, dest, dir_name.as_deref())?;
        Ok(())
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave.is_some()
    }

    /// Drops any scheduled autosave and waits for a running one.
    pub fn cancel_autosave(&self) {
        if let Some(saver) = &self.autosave {
            saver.cancel();
        }
    }

    /// Writes any scheduled autosave now and waits for it.
    pub fn flush_autosave(&self) {
        if let Some(saver) = &self.autosave {
            saver.flush();
        }
    }

    /// Stops autosaving; a pending snapshot is discarded.
    pub fn disable_autosave(&mut self) {
        self.autosave = None;
    }

    fn apply(&mut self, edit: impl FnOnce(&Arc<Unit>) -> Arc<Unit>) -> bool {
        let edited = edit(&self.chart.root_unit);
        let next = sync_center_text(&edited);
        if Arc::ptr_eq(&next, &self.chart.root_unit) {
            return false;
        }
        self.commit(next);
        true
    }

    fn commit(&mut self, root: Arc<Unit>) {
        self.chart.root_unit = root;
        self.chart.touch();
        self.history.record(self.chart.clone());
        self.mark_changed();
    }

    fn after_history_move(&mut self) {
        self.reset_nav_if_needed();
        self.mark_changed();
    }

    fn mark_changed(&mut self) {
        self.revision += 1;
        self.schedule_autosave();
    }

    fn schedule_autosave(&self) {
        let (Some(saver), Some(path)) = (&self.autosave, &self.save_path) else {
            return;
        };
        saver.schedule(SaveJob {
            chart: self.chart.clone(),
            path: path.clone(),
            revision: self.revision,
        });
    }

    // Re-queues unsaved changes after an action cancelled the pending write.
    fn resume_autosave(&self) {
        if self.is_dirty() {
            self.schedule_autosave();
        }
    }

    fn replace_chart(&mut self, chart: Chart, save_path: Option<PathBuf>) {
        self.nav.reset(chart.root_unit.id.clone());
        self.history.clear(chart.clone());
        self.chart = chart;
        self.save_path = save_path;
        self.revision += 1;
        self.saved_revision.store(self.revision, Ordering::SeqCst);
    }
}

impl<S> ChartSession<S>
where
    S: ChartStore + Clone + Send + 'static,
{
    /// Saves automatically `delay` after the last change.
    ///
    /// Only charts with a save path are autosaved.
    pub fn enable_autosave(&mut self, delay: Duration) -> io::Result<()> {
        let store = self.store.clone();
        let saved_revision = Arc::clone(&self.saved_revision);
        let saver = AutoSaver::new(delay, move |job: SaveJob| {
            match store.save_chart(&job.chart, &job.path) {
                Ok(_) => {
                    saved_revision.fetch_max(job.revision, Ordering::SeqCst);
                }
                Err(err) => error!(
                    "event=autosave module=service status=error revision={} error={}",
                    job.revision, err
                ),
            }
        })?;
        self.autosave = Some(saver);
        Ok(())
    }
}
