//! Outline-heading (Markdown) export.
//!
//! Layout:
//! - `# topic` for the root center.
//! - `## item` for each non-blank surrounding root cell.
//! - `### sub-item` for each non-blank surrounding cell of that item's
//!   child unit.
//!
//! Images are emitted as `![caption](dir/file)` only when the asset
//! directory name is known.

use crate::model::chart::{Cell, Chart};

/// Caption used for images on cells without text.
pub const IMAGE_PLACEHOLDER_CAPTION: &str = "image";

/// Renders `chart` as Markdown headings.
pub fn chart_to_markdown(chart: &Chart, images_dir_name: Option<&str>) -> String {
    let root = &chart.root_unit;
    let mut lines = Vec::new();

    let topic = chart.topic().trim();
    let topic = if topic.is_empty() {
        chart.title.as_str()
    } else {
        topic
    };
    lines.push(format!("# {topic}"));
    if let Some(center) = root.center() {
        push_image(&mut lines, center, images_dir_name);
    }

    for cell in root.surrounding().filter(|cell| !cell.is_blank()) {
        push_heading(&mut lines, "##", cell, images_dir_name);
        let Some(child) = cell.children.as_deref() else {
            continue;
        };
        for sub in child.surrounding().filter(|sub| !sub.is_blank()) {
            push_heading(&mut lines, "###", sub, images_dir_name);
        }
    }

    let mut output = lines.join("\n\n");
    output.push('\n');
    output
}

fn push_heading(lines: &mut Vec<String>, marker: &str, cell: &Cell, images_dir_name: Option<&str>) {
    let text = cell.text.trim();
    if text.is_empty() {
        lines.push(format!("{marker} {IMAGE_PLACEHOLDER_CAPTION}"));
    } else {
        lines.push(format!("{marker} {text}"));
    }
    push_image(lines, cell, images_dir_name);
}

fn push_image(lines: &mut Vec<String>, cell: &Cell, images_dir_name: Option<&str>) {
    let (Some(image), Some(dir)) = (cell.image.as_deref(), images_dir_name) else {
        return;
    };
    let caption = match cell.text.trim() {
        "" => IMAGE_PLACEHOLDER_CAPTION,
        text => text,
    };
    if image.starts_with("data:") {
        lines.push(format!("![{caption}]({image})"));
    } else {
        lines.push(format!("![{caption}]({dir}/{image})"));
    }
}
