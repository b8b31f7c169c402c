//! Chart snapshot persistence.
//!
//! # Responsibility
//! - Load and save charts as pretty-printed JSON snapshots.
//! - Run asset GC as the last step of every successful save.
//!
//! # Invariants
//! - A failed save leaves the previous file intact (temp file + rename).
//! - GC never runs unless the snapshot write succeeded.
//! - Saves and image imports through one store (and its clones) never
//!   overlap, so a GC pass cannot delete a file that is being imported.
//! - Loads perform no schema migration; only structural checks. Repeated
//!   or blank ids are replaced on load instead of rejected.

use crate::model::chart::{Chart, ModelValidationError};
use crate::repo::assets::{self, ensure_images_dir, sweep_unreferenced_assets, AssetError};
use chrono::Utc;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence error for chart snapshots.
#[derive(Debug)]
pub enum StoreError {
    /// Read, write, rename or directory creation failed.
    Io { path: PathBuf, source: io::Error },
    /// Snapshot text is not a valid chart document.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Snapshot parsed but its tree is structurally broken.
    Invalid {
        path: PathBuf,
        source: ModelValidationError,
    },
    /// Chart could not be encoded.
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "failed to parse chart {}: {source}", path.display())
            }
            Self::Invalid { path, source } => {
                write!(f, "invalid chart {}: {source}", path.display())
            }
            Self::Serialize(err) => write!(f, "failed to encode chart: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
        }
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Exactly what was written, including the refreshed `updated_at`.
    pub chart: Chart,
    /// Asset filenames removed by the post-save sweep.
    pub removed_assets: Vec<String>,
}

/// Storage contract for chart documents.
pub trait ChartStore {
    fn load_chart(&self, path: &Path) -> StoreResult<Chart>;
    fn save_chart(&self, chart: &Chart, path: &Path) -> StoreResult<SaveOutcome>;

    /// Copies `source` into the asset directory of the chart saved at
    /// `save_path` and returns the stored filename.
    fn import_image(&self, source: &Path, save_path: &Path) -> Result<String, AssetError> {
        assets::import_image(source, Some(save_path))
    }
}

/// Filesystem-backed chart store.
///
/// Clones share one save lock, so a debounced background save and a
/// manual save are sequenced instead of racing on the same files.
#[derive(Debug, Clone, Default)]
pub struct FileChartStore {
    save_lock: Arc<Mutex<()>>,
}

impl FileChartStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_saves(&self) -> MutexGuard<'_, ()> {
        self.save_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChartStore for FileChartStore {
    fn load_chart(&self, path: &Path) -> StoreResult<Chart> {
        let started_at = Instant::now();
        let result = read_chart(path);
        match &result {
            Ok(_) => info!(
                "event=chart_load module=repo status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=chart_load module=repo status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn save_chart(&self, chart: &Chart, path: &Path) -> StoreResult<SaveOutcome> {
        let _guard = self.lock_saves();
        let started_at = Instant::now();

        let result = write_chart(chart, path);
        match &result {
            Ok(outcome) => info!(
                "event=chart_save module=repo status=ok removed_assets={} duration_ms={}",
                outcome.removed_assets.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=chart_save module=repo status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn import_image(&self, source: &Path, save_path: &Path) -> Result<String, AssetError> {
        let _guard = self.lock_saves();
        assets::import_image(source, Some(save_path))
    }
}

fn read_chart(path: &Path) -> StoreResult<Chart> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut chart: Chart = serde_json::from_str(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    chart
        .root_unit
        .validate()
        .map_err(|source| StoreError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
    let replaced = Arc::make_mut(&mut chart.root_unit).rekey_duplicate_ids();
    if replaced > 0 {
        warn!("event=chart_load module=repo status=rekeyed replaced_ids={replaced}");
    }
    Ok(chart)
}

fn write_chart(chart: &Chart, path: &Path) -> StoreResult<SaveOutcome> {
    ensure_images_dir(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut data = chart.clone();
    data.updated_at = Utc::now();
    write_json_atomic(&data, path)?;

    let removed_assets = sweep_unreferenced_assets(&data, path);
    Ok(SaveOutcome {
        chart: data,
        removed_assets,
    })
}

/// Writes `chart` as pretty JSON via a sibling temp file and rename.
pub fn write_json_atomic(chart: &Chart, path: &Path) -> StoreResult<()> {
    let mut text = serde_json::to_string_pretty(chart).map_err(StoreError::Serialize)?;
    text.push('\n');
    write_text_atomic(path, &text).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    let temp_path = temp_sibling(path);
    if let Err(err) = fs::write(&temp_path, text) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp_path);
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}
