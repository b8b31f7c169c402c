use mandala_core::export::{chart_to_markdown, chart_to_opml};
use mandala_core::{
    ensure_child_unit, render, update_cell_text, Chart, ChartSession, ExportFormat,
    FileChartStore, CENTER,
};
use std::fs;

fn goal_chart() -> Chart {
    let mut chart = Chart::new();
    let center = chart.root_unit.cells[CENTER].id.clone();
    let first = chart.root_unit.cells[0].id.clone();
    chart.root_unit = update_cell_text(&chart.root_unit, &center, "目標");
    chart.root_unit = update_cell_text(&chart.root_unit, &first, "行動1");
    chart
}

#[test]
fn markdown_has_topic_and_non_blank_items_only() {
    let md = chart_to_markdown(&goal_chart(), None);
    let headings: Vec<&str> = md.lines().filter(|line| line.starts_with('#')).collect();
    assert_eq!(headings, vec!["# 目標", "## 行動1"]);
}

#[test]
fn markdown_nests_child_unit_items() {
    let mut chart = goal_chart();
    let first = chart.root_unit.cells[0].id.clone();
    chart.root_unit = ensure_child_unit(&chart.root_unit, &first);
    let child = chart.root_unit.cells[0].children.clone().unwrap();
    chart.root_unit = update_cell_text(&chart.root_unit, &child.cells[2].id, "毎朝走る");
    chart.root_unit = update_cell_text(&chart.root_unit, &child.cells[5].id, "   ");

    let md = chart_to_markdown(&chart, None);
    assert_eq!(md, "# 目標\n\n## 行動1\n\n### 毎朝走る\n");
}

#[test]
fn opml_nests_outlines_and_escapes_text() {
    let mut chart = goal_chart();
    let first = chart.root_unit.cells[0].id.clone();
    let third = chart.root_unit.cells[2].id.clone();
    chart.root_unit = update_cell_text(&chart.root_unit, &third, "R&D <fast>");
    chart.root_unit = ensure_child_unit(&chart.root_unit, &first);
    let child = chart.root_unit.cells[0].children.clone().unwrap();
    chart.root_unit = update_cell_text(&chart.root_unit, &child.cells[0].id, "say \"hi\"");

    let opml = chart_to_opml(&chart);
    assert!(opml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<opml version=\"2.0\">"));
    assert!(opml.contains("    <outline text=\"目標\">\n      <outline text=\"行動1\">\n        <outline text=\"say &quot;hi&quot;\"/>\n      </outline>\n"));
    assert!(opml.contains("      <outline text=\"R&amp;D &lt;fast&gt;\"/>\n"));
    assert_eq!(opml.matches("<outline ").count(), 4);
}

#[test]
fn renderers_are_deterministic() {
    let chart = goal_chart();
    for format in [ExportFormat::Markdown, ExportFormat::Opml, ExportFormat::Json] {
        assert_eq!(
            render(&chart, format, Some("goal_images")).unwrap(),
            render(&chart, format, Some("goal_images")).unwrap()
        );
    }
}

#[test]
fn format_labels_parse_back() {
    for format in [ExportFormat::Markdown, ExportFormat::Opml, ExportFormat::Json] {
        assert_eq!(ExportFormat::parse(format.label()), Some(format));
    }
    assert_eq!(ExportFormat::parse("MD"), Some(ExportFormat::Markdown));
    assert_eq!(ExportFormat::parse("pdf"), None);
}

#[test]
fn session_export_writes_to_any_destination() {
    let dir = tempfile::tempdir().unwrap();
    let chart_path = dir.path().join("goals.mandala");
    let mut session = ChartSession::new(FileChartStore::new());
    let center = session.root().cells[CENTER].id.clone();
    session.update_cell(&center, "目標");
    session.save_as(&chart_path).unwrap();
    let saved_text = fs::read_to_string(&chart_path).unwrap();

    let md_dest = dir.path().join("out").join("goals.md");
    fs::create_dir_all(md_dest.parent().unwrap()).unwrap();
    session.export(ExportFormat::Markdown, &md_dest).unwrap();
    assert_eq!(fs::read_to_string(&md_dest).unwrap(), "# 目標\n");

    let json_dest = dir.path().join("copy.json");
    session.export(ExportFormat::Json, &json_dest).unwrap();
    let copy: Chart = serde_json::from_str(&fs::read_to_string(&json_dest).unwrap()).unwrap();
    assert_eq!(copy.root_unit, session.chart().root_unit);

    assert_eq!(fs::read_to_string(&chart_path).unwrap(), saved_text);
    assert_eq!(session.save_path(), Some(chart_path.as_path()));
}

#[test]
fn export_to_missing_directory_fails_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let session = ChartSession::new(FileChartStore::new());
    let dest = dir.path().join("missing").join("out.opml");
    assert!(session.export(ExportFormat::Opml, &dest).is_err());
    assert!(!dest.exists());
}
