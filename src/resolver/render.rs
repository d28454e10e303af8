//! HTML presentation of directory listings.

use std::fmt::Write as _;

use super::listing::DirectoryEntry;

const STYLE: &str = "\
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 2rem; background: #f5f5f5; }
.container { max-width: 1200px; margin: 0 auto; background: white; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); overflow: hidden; }
h1 { padding: 2rem; background: #2c3e50; color: white; font-size: 1.5rem; }
table { width: 100%; border-collapse: collapse; }
th { background: #34495e; color: white; padding: 1rem; text-align: left; font-weight: 600; }
td { padding: 1rem; border-bottom: 1px solid #ecf0f1; }
tr:hover { background: #f8f9fa; }
a { color: #3498db; text-decoration: none; }
a:hover { color: #2980b9; text-decoration: underline; }
.size, .modified { color: #7f8c8d; }";

/// Escape text for HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn parent_href(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Render the listing page for `path`.
pub fn render_listing(path: &str, entries: &[DirectoryEntry]) -> String {
    let title = escape_html(path);
    let mut rows = String::new();

    if path != "/" {
        let _ = write!(
            rows,
            "<tr><td><a href=\"{}\">..</a></td><td class=\"size\">-</td><td class=\"modified\">-</td></tr>\n",
            escape_html(parent_href(path))
        );
    }

    for entry in entries {
        let _ = write!(
            rows,
            "<tr><td><a href=\"{href}\">{icon} {name}{slash}</a></td><td class=\"size\">{size}</td><td class=\"modified\">{modified}</td></tr>\n",
            href = escape_html(&entry.href),
            icon = if entry.is_dir { "&#128193;" } else { "&#128196;" },
            name = escape_html(&entry.name),
            slash = if entry.is_dir { "/" } else { "" },
            size = escape_html(&entry.size_label),
            modified = escape_html(&entry.mod_time_label),
        );
    }

    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"UTF-8\">
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">
<title>Index of {title}</title>
<style>
{STYLE}
</style>
</head>
<body>
<div class=\"container\">
<h1>Index of {title}</h1>
<table>
<thead><tr><th>Name</th><th width=\"150\">Size</th><th width=\"200\">Modified</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
</div>
</body>
</html>
"
    )
}
