//! HTML rendering of a maintenance page.
//!
//! Title, description and logo URL are escaped. `content` and the custom CSS
//! are author-controlled markup and are emitted as-is.

use crate::edge::EdgeRecord;

const FONT_STYLESHEET: &str = "https://fonts.googleapis.com/css2?family=Inter:wght@400;600;700&family=Roboto:wght@400;500;700&family=Open+Sans:wght@400;600;700&display=swap";

pub fn render_page(record: &EdgeRecord) -> String {
    let design = &record.design;
    let mut html = String::with_capacity(2048 + record.content.len());

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&record.title)));
    html.push_str(&format!("<link href=\"{}\" rel=\"stylesheet\">\n", FONT_STYLESHEET));
    html.push_str("<style>\n");
    html.push_str(&format!(
        ":root {{ --bg-color: {}; --text-color: {}; --font-family: '{}'; --max-width: {}px; }}\n",
        design.background_color, design.text_color, design.font_family, design.max_width
    ));
    html.push_str("body { font-family: var(--font-family), -apple-system, 'Segoe UI', sans-serif; background-color: var(--bg-color); color: var(--text-color); margin: 0; min-height: 100vh; display: flex; flex-direction: column; align-items: center; }\n");
    html.push_str(&format!(
        ".container {{ width: 100%; max-width: var(--max-width); margin: 0 auto; padding: 2rem; box-sizing: border-box; text-align: {}; flex: 1; display: flex; flex-direction: column; justify-content: center; }}\n",
        design.layout.text_align()
    ));
    html.push_str("h1 { font-size: 2.5rem; margin-bottom: 1rem; font-weight: 700; }\n");
    html.push_str(".description { font-size: 1.25rem; margin-bottom: 2rem; opacity: 0.9; }\n");
    html.push_str(".content { font-size: 1.125rem; line-height: 1.6; margin-bottom: 2rem; }\n");
    html.push_str(".footer { width: 100%; padding: 1rem; text-align: center; font-size: 0.875rem; opacity: 0.7; }\n");
    if !design.custom_css.is_empty() {
        html.push_str(&design.custom_css);
        html.push('\n');
    }
    html.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n");

    if !design.logo.is_empty() {
        html.push_str(&format!(
            "<div class=\"logo-container\"><img src=\"{}\" alt=\"Logo\" class=\"logo\" style=\"width: {}px; height: {}px; object-fit: contain;\"></div>\n",
            escape_html(&design.logo),
            design.logo_size.width,
            design.logo_size.height
        ));
    }
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(&record.title)));
    if !record.description.is_empty() {
        html.push_str(&format!(
            "<div class=\"description\">{}</div>\n",
            escape_html(&record.description)
        ));
    }
    html.push_str(&format!("<div class=\"content\">{}</div>\n", record.content));
    html.push_str("</div>\n");

    if let Some(updated) = record.updated_at {
        html.push_str(&format!(
            "<footer class=\"footer\">Last updated: {}</footer>\n",
            updated.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    html.push_str("</body>\n</html>\n");
    html
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
