use mandala_core::repo::assets::images_dir;
use mandala_core::{
    AssetError, Chart, ChartSession, ChartStore, FileChartStore, SaveOutcome, StoreResult, CENTER,
};
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

/// Store whose writes from the autosave worker report their start and then
/// stall, so foreground actions can overlap a background write.
#[derive(Clone)]
struct StallingStore {
    inner: FileChartStore,
    started: mpsc::Sender<()>,
    stall: Duration,
}

fn stalling_store() -> (StallingStore, mpsc::Receiver<()>) {
    let (started, started_rx) = mpsc::channel();
    let store = StallingStore {
        inner: FileChartStore::new(),
        started,
        stall: Duration::from_millis(300),
    };
    (store, started_rx)
}

impl ChartStore for StallingStore {
    fn load_chart(&self, path: &Path) -> StoreResult<Chart> {
        self.inner.load_chart(path)
    }

    fn save_chart(&self, chart: &Chart, path: &Path) -> StoreResult<SaveOutcome> {
        if std::thread::current().name() == Some("mandala-autosave") {
            let _ = self.started.send(());
            std::thread::sleep(self.stall);
        }
        self.inner.save_chart(chart, path)
    }

    fn import_image(&self, source: &Path, save_path: &Path) -> Result<String, AssetError> {
        self.inner.import_image(source, save_path)
    }
}

#[test]
fn autosave_writes_latest_state_after_quiet_period() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auto.mandala");
    let mut session = ChartSession::new(FileChartStore::new());
    session.save_as(&path).unwrap();
    session.enable_autosave(Duration::from_millis(50)).unwrap();

    let center = session.root().cells[CENTER].id.clone();
    session.update_cell(&center, "draft");
    session.update_cell(&center, "final");
    assert!(session.is_dirty());

    session.flush_autosave();
    let loaded = FileChartStore::new().load_chart(&path).unwrap();
    assert_eq!(loaded.topic(), "final");
    assert!(!session.is_dirty());
}

#[test]
fn unsaved_chart_is_never_autosaved() {
    let mut session = ChartSession::new(FileChartStore::new());
    session.enable_autosave(Duration::from_millis(10)).unwrap();
    let center = session.root().cells[CENTER].id.clone();
    session.update_cell(&center, "nowhere");
    session.flush_autosave();
    assert!(session.is_dirty());
    assert!(session.save_path().is_none());
}

#[test]
fn manual_save_cancels_pending_autosave() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manual.mandala");
    let mut session = ChartSession::new(FileChartStore::new());
    session.save_as(&path).unwrap();
    session.enable_autosave(Duration::from_secs(30)).unwrap();

    let center = session.root().cells[CENTER].id.clone();
    session.update_cell(&center, "typed");
    session.save().unwrap();
    assert!(!session.is_dirty());

    session.flush_autosave();
    assert!(!session.is_dirty());
}

#[test]
fn dropping_session_discards_pending_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("teardown.mandala");
    let mut session = ChartSession::new(FileChartStore::new());
    session.save_as(&path).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();
    session.enable_autosave(Duration::from_secs(30)).unwrap();

    let center = session.root().cells[CENTER].id.clone();
    session.update_cell(&center, "lost");
    drop(session);

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn undo_schedules_autosave_too() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("undo.mandala");
    let mut session = ChartSession::new(FileChartStore::new());
    session.save_as(&path).unwrap();
    session.enable_autosave(Duration::from_millis(20)).unwrap();

    let center = session.root().cells[CENTER].id.clone();
    session.update_cell(&center, "kept");
    session.flush_autosave();
    session.undo();
    session.flush_autosave();

    let loaded = FileChartStore::new().load_chart(&path).unwrap();
    assert_eq!(loaded.topic(), "");
    assert!(!session.is_dirty());
}

#[test]
fn running_background_write_never_overwrites_manual_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.mandala");
    let (store, started) = stalling_store();
    let mut session = ChartSession::new(store);
    session.save_as(&path).unwrap();
    session.enable_autosave(Duration::from_millis(10)).unwrap();

    let center = session.root().cells[CENTER].id.clone();
    session.update_cell(&center, "old");
    started.recv_timeout(Duration::from_secs(5)).unwrap();
    session.update_cell(&center, "new");
    session.save().unwrap();
    session.flush_autosave();

    let loaded = FileChartStore::new().load_chart(&path).unwrap();
    assert_eq!(loaded.topic(), "new");
    assert!(!session.is_dirty());
}

#[test]
fn image_attached_during_background_write_survives_its_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photos.mandala");
    let source = dir.path().join("pic.png");
    fs::write(&source, [0x89, b'P', b'N', b'G']).unwrap();
    let (store, started) = stalling_store();
    let mut session = ChartSession::new(store);
    session.save_as(&path).unwrap();
    session.enable_autosave(Duration::from_millis(10)).unwrap();

    let first = session.root().cells[0].id.clone();
    session.update_cell(&first, "before image");
    started.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(session.attach_image(&first, &source).unwrap());
    session.flush_autosave();

    let stored = session.root().cells[0].image.clone().unwrap();
    assert!(images_dir(&path).join(&stored).is_file());
    let loaded = FileChartStore::new().load_chart(&path).unwrap();
    assert_eq!(loaded.root_unit.cells[0].image.as_deref(), Some(stored.as_str()));
    assert!(!session.is_dirty());
}

#[test]
fn failed_attach_requeues_unsaved_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requeue.mandala");
    let mut session = ChartSession::new(FileChartStore::new());
    session.save_as(&path).unwrap();
    session.enable_autosave(Duration::from_millis(20)).unwrap();

    let center = session.root().cells[CENTER].id.clone();
    session.update_cell(&center, "kept");
    let missing = dir.path().join("missing.png");
    assert!(session.attach_image(&center, &missing).is_err());
    session.flush_autosave();

    let loaded = FileChartStore::new().load_chart(&path).unwrap();
    assert_eq!(loaded.topic(), "kept");
    assert!(!session.is_dirty());
}
