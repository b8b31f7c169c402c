//! Image asset directory management.
//!
//! # Responsibility
//! - Derive the asset directory that sits next to a saved chart.
//! - Copy user-chosen images in under generated names.
//! - Sweep files no cell references any more (mark-and-sweep GC).
//! - Resolve stored image references to something a host can load.
//!
//! # Invariants
//! - Cells store bare filenames only, never absolute paths.
//! - The sweep only runs after a successful write and never touches
//!   directories.

use crate::model::chart::{Chart, Unit};
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// Suffix appended to the document stem to name its asset directory.
pub const IMAGES_DIR_SUFFIX: &str = "_images";
/// Raster formats accepted for attachment (lowercase, without dot).
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

const EMBEDDED_PREFIX: &str = "data:";
const LEGACY_DIR_PREFIX: &str = "_images";

/// Errors from asset import.
#[derive(Debug)]
pub enum AssetError {
    /// The chart has never been saved, so there is no asset directory.
    NoSavePath,
    /// Source extension is not a supported raster format.
    UnsupportedFormat(String),
    /// Source file does not exist or is not a regular file.
    SourceMissing(PathBuf),
    /// Filesystem failure.
    Io { path: PathBuf, source: io::Error },
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSavePath => write!(f, "save the chart before attaching images"),
            Self::UnsupportedFormat(ext) if ext.is_empty() => {
                write!(f, "image file has no extension")
            }
            Self::UnsupportedFormat(ext) => write!(f, "unsupported image format: {ext}"),
            Self::SourceMissing(path) => write!(f, "image not found: {}", path.display()),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A dereferenceable image location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocation {
    /// Inline `data:` URI, passed through unchanged.
    Embedded(String),
    /// File on disk.
    File(PathBuf),
}

/// Returns `{dir}/{stem}_images` for a document saved at `save_path`.
///
/// Dot-files keep their full name as the stem.
pub fn images_dir(save_path: &Path) -> PathBuf {
    let parent = save_path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(images_dir_name(save_path))
}

/// Returns the bare directory name, e.g. `goals_images` for `goals.mandala`.
pub fn images_dir_name(save_path: &Path) -> String {
    let stem = save_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}{IMAGES_DIR_SUFFIX}")
}

/// Creates the asset directory for `save_path` if it is missing.
pub fn ensure_images_dir(save_path: &Path) -> io::Result<PathBuf> {
    let dir = images_dir(save_path);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Returns whether `path` has a supported raster extension.
pub fn is_supported_image(path: &Path) -> bool {
    normalized_extension(path)
        .is_some_and(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Copies `source` into the asset directory of `save_path`.
///
/// Returns the generated bare filename to store on the cell.
///
/// # Errors
/// - `NoSavePath` before any filesystem access when `save_path` is `None`.
/// - `UnsupportedFormat` / `SourceMissing` for unusable sources.
/// - `Io` when the directory cannot be created or the copy fails.
pub fn import_image(source: &Path, save_path: Option<&Path>) -> Result<String, AssetError> {
    let save_path = save_path.ok_or(AssetError::NoSavePath)?;
    let ext = normalized_extension(source).unwrap_or_default();
    if !SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AssetError::UnsupportedFormat(ext));
    }
    if !source.is_file() {
        return Err(AssetError::SourceMissing(source.to_path_buf()));
    }

    let dir = ensure_images_dir(save_path).map_err(|source| AssetError::Io {
        path: images_dir(save_path),
        source,
    })?;
    let file_name = format!("{}.{ext}", Uuid::new_v4());
    let dest = dir.join(&file_name);
    fs::copy(source, &dest).map_err(|source| AssetError::Io { path: dest, source })?;

    info!("event=asset_import module=repo status=ok file={file_name}");
    Ok(file_name)
}

/// Collects every image filename referenced at any depth below `unit`.
///
/// Path-like references keep only their last segment.
pub fn referenced_assets(unit: &Unit) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    collect_assets(unit, &mut used);
    used
}

fn collect_assets(unit: &Unit, used: &mut BTreeSet<String>) {
    for cell in &unit.cells {
        if let Some(image) = cell.image.as_deref() {
            if !image.starts_with(EMBEDDED_PREFIX) {
                used.insert(last_segment(image).to_string());
            }
        }
        if let Some(child) = cell.children.as_deref() {
            collect_assets(child, used);
        }
    }
}

/// Deletes files in the asset directory that `chart` does not reference.
///
/// Returns the removed filenames. Individual failures are logged and
/// skipped; a missing directory is not an error.
pub fn sweep_unreferenced_assets(chart: &Chart, save_path: &Path) -> Vec<String> {
    let started_at = Instant::now();
    let dir = images_dir(save_path);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!(
                "event=asset_gc module=repo status=error error_code=read_dir_failed error={err}"
            );
            return Vec::new();
        }
    };

    let used = referenced_assets(&chart.root_unit);
    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if used.contains(&name) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed.push(name),
            Err(err) => warn!(
                "event=asset_gc module=repo status=error error_code=remove_failed file={name} error={err}"
            ),
        }
    }
    removed.sort();

    info!(
        "event=asset_gc module=repo status=ok referenced={} removed={} duration_ms={}",
        used.len(),
        removed.len(),
        started_at.elapsed().as_millis()
    );
    removed
}

/// Resolves a stored image reference against the document location.
///
/// `data:` URIs resolve without a save path; file references need one.
/// Legacy `_images/<file>` references resolve against the save directory.
pub fn resolve_image(image: &str, save_path: Option<&Path>) -> Option<ImageLocation> {
    if image.is_empty() {
        return None;
    }
    if image.starts_with(EMBEDDED_PREFIX) {
        return Some(ImageLocation::Embedded(image.to_string()));
    }
    let save_path = save_path?;

    let is_legacy = image
        .strip_prefix(LEGACY_DIR_PREFIX)
        .is_some_and(|rest| rest.starts_with(['/', '\\']));
    let base = if is_legacy {
        save_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf()
    } else {
        images_dir(save_path)
    };
    let location = image
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .fold(base, |acc, segment| acc.join(segment));
    Some(ImageLocation::File(location))
}

fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn last_segment(reference: &str) -> &str {
    reference.rsplit(['/', '\\']).next().unwrap_or(reference)
}
