//! Deterministic export serializers.
//!
//! # Responsibility
//! - Render chart snapshots as Markdown headings or OPML outlines.
//! - Write exports (including a plain JSON snapshot copy) to a
//!   destination chosen by the host, independent of the save path.
//!
//! # Invariants
//! - Renderers are pure: same snapshot in, same text out.
//! - Exports never refresh timestamps or touch the asset directory.

pub mod markdown;
pub mod opml;

use crate::model::chart::Chart;
use crate::repo::chart_store::write_text_atomic;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub use markdown::chart_to_markdown;
pub use opml::{chart_to_opml, escape_xml};

/// Supported export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Opml,
    Json,
}

impl ExportFormat {
    /// Parses a format label (`markdown|md|opml|json`, case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "opml" => Some(Self::Opml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Opml => "opml",
            Self::Json => "json",
        }
    }

    /// Default file extension for the format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Opml => "opml",
            Self::Json => "json",
        }
    }
}

/// Export failure.
#[derive(Debug)]
pub enum ExportError {
    Io { path: PathBuf, source: io::Error },
    Serialize(serde_json::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Serialize(err) => write!(f, "failed to encode chart: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
        }
    }
}

/// Renders `chart` in `format`.
///
/// `images_dir_name` only affects Markdown image references.
pub fn render(
    chart: &Chart,
    format: ExportFormat,
    images_dir_name: Option<&str>,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Markdown => Ok(chart_to_markdown(chart, images_dir_name)),
        ExportFormat::Opml => Ok(chart_to_opml(chart)),
        ExportFormat::Json => {
            let mut text = serde_json::to_string_pretty(chart).map_err(ExportError::Serialize)?;
            text.push('\n');
            Ok(text)
        }
    }
}

/// Renders `chart` and writes it to `dest`.
pub fn export_to_file(
    chart: &Chart,
    format: ExportFormat,
    dest: &Path,
    images_dir_name: Option<&str>,
) -> Result<(), ExportError> {
    let text = render(chart, format, images_dir_name)?;
    match write_text_atomic(dest, &text) {
        Ok(()) => {
            info!(
                "event=chart_export module=export status=ok format={} bytes={}",
                format.label(),
                text.len()
            );
            Ok(())
        }
        Err(source) => {
            error!(
                "event=chart_export module=export status=error format={} error={}",
                format.label(),
                source
            );
            Err(ExportError::Io {
                path: dest.to_path_buf(),
                source,
            })
        }
    }
}
