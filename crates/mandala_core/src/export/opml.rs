//! Nested-outline (OPML 2.0) export.

use crate::model::chart::Chart;

/// Renders `chart` as an OPML document.
///
/// The root topic is the single top-level outline; non-blank surrounding
/// cells become its children, and their child units' non-blank texts
/// become leaf grandchildren.
pub fn chart_to_opml(chart: &Chart) -> String {
    let root = &chart.root_unit;
    let topic = match chart.topic().trim() {
        "" => chart.title.as_str(),
        text => text,
    };

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<opml version=\"2.0\">\n");
    out.push_str("  <head>\n");
    out.push_str(&format!("    <title>{}</title>\n", escape_xml(&chart.title)));
    out.push_str(&format!(
        "    <dateCreated>{}</dateCreated>\n",
        chart.created_at.to_rfc2822()
    ));
    out.push_str(&format!(
        "    <dateModified>{}</dateModified>\n",
        chart.updated_at.to_rfc2822()
    ));
    out.push_str("  </head>\n");
    out.push_str("  <body>\n");
    out.push_str(&format!("    <outline text=\"{}\">\n", escape_xml(topic)));

    for cell in root.surrounding() {
        let text = cell.text.trim();
        if text.is_empty() {
            continue;
        }
        let leaves = cell
            .children
            .as_deref()
            .map(|child| {
                child
                    .surrounding()
                    .map(|sub| sub.text.trim())
                    .filter(|sub| !sub.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if leaves.is_empty() {
            out.push_str(&format!("      <outline text=\"{}\"/>\n", escape_xml(text)));
            continue;
        }
        out.push_str(&format!("      <outline text=\"{}\">\n", escape_xml(text)));
        for leaf in leaves {
            out.push_str(&format!("        <outline text=\"{}\"/>\n", escape_xml(leaf)));
        }
        out.push_str("      </outline>\n");
    }

    out.push_str("    </outline>\n");
    out.push_str("  </body>\n");
    out.push_str("</opml>\n");
    out
}

/// Escapes `&`, `<`, `>` and `"` for attribute and element text.
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_xml;

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape_xml(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
        assert_eq!(escape_xml("plain 'text'"), "plain 'text'");
    }
}
