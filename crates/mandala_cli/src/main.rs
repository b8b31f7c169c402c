//! CLI entry point.
//!
//! # Responsibility
//! - Print core linkage info when started without a chart.
//! - Open a chart handed over on the command line (plain path or
//!   `file://` URL from an OS double-click) and print an export to stdout.
//!
//! Usage: `mandala [--md|--opml|--json] [CHART]`

use mandala_core::repo::assets::images_dir_name;
use mandala_core::{render, ChartStore, ExportFormat, FileChartStore};
use std::path::PathBuf;
use std::process::ExitCode;

const CHART_EXTENSIONS: [&str; 2] = [".mandala", ".mandalaya"];
const FILE_URL_PREFIX: &str = "file://";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let format = export_format(&args);
    let Some(path) = startup_file(&args) else {
        println!("mandala_core ping={}", mandala_core::ping());
        println!("mandala_core version={}", mandala_core::core_version());
        return ExitCode::SUCCESS;
    };

    let chart = match FileChartStore::new().load_chart(&path) {
        Ok(chart) => chart,
        Err(err) => {
            eprintln!("mandala: {err}");
            return ExitCode::FAILURE;
        }
    };
    let dir_name = images_dir_name(&path);
    match render(&chart, format, Some(&dir_name)) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("mandala: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Picks the export format from `--md|--opml|--json`; Markdown by default.
fn export_format(args: &[String]) -> ExportFormat {
    args.iter()
        .filter_map(|arg| arg.strip_prefix("--"))
        .find_map(ExportFormat::parse)
        .unwrap_or(ExportFormat::Markdown)
}

/// Returns the first argument naming a chart file.
///
/// The existence of the file is not checked; loading reports that.
fn startup_file(args: &[String]) -> Option<PathBuf> {
    args.iter().find_map(|arg| {
        let lower = arg.to_lowercase();
        if !CHART_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return None;
        }
        if lower.starts_with(FILE_URL_PREFIX) {
            return Some(path_from_file_url(&arg[FILE_URL_PREFIX.len()..]));
        }
        Some(PathBuf::from(arg))
    })
}

// `/C:/dir/a.mandala` is a drive path; anything else is already absolute.
fn path_from_file_url(rest: &str) -> PathBuf {
    let bytes = rest.as_bytes();
    let is_drive = bytes.len() >= 3
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b':';
    if is_drive {
        PathBuf::from(rest[1..].replace('/', "\\"))
    } else {
        PathBuf::from(rest)
    }
}
