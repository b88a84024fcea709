use html_escape::encode_text;
use std::fmt::Write;

use super::document::{Block, Page, ReportDocument};

/// Turns a [`ReportDocument`] into a downloadable file.
pub trait ReportRenderer: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn extension(&self) -> &'static str;

    fn render(&self, document: &ReportDocument) -> String;
}

const STYLE: &str = "\
body{font-family:Helvetica,Arial,sans-serif;margin:0;color:#222}
.page{padding:2cm;page-break-after:always;position:relative;min-height:25cm}
.page:last-child{page-break-after:auto}
h1{text-align:center;font-size:18pt}
h2{font-size:14pt;border-bottom:1px solid #999;margin-top:1.5em}
h3{font-size:12pt}
table{border-collapse:collapse;width:100%;font-size:9pt}
th,td{border:1px solid #999;padding:4px;text-align:left;vertical-align:top}
th{background:#eee}
pre{font-family:Courier,monospace;font-size:8pt;white-space:pre}
.field{margin:2px 0}
footer{position:absolute;bottom:1cm;right:2cm;font-size:8pt;color:#666}
";

/// Self-contained HTML with one `.page` section per page.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    fn render_block(out: &mut String, block: &Block) {
        // Writing into a String cannot fail.
        let _ = match block {
            Block::Title(text) => writeln!(out, "<h1>{}</h1>", encode_text(text)),
            Block::Field { label, value } => writeln!(
                out,
                "<p class=\"field\"><strong>{}:</strong> {}</p>",
                encode_text(label),
                encode_text(value)
            ),
            Block::Heading(text) => writeln!(out, "<h2>{}</h2>", encode_text(text)),
            Block::Subheading(text) => writeln!(out, "<h3>{}</h3>", encode_text(text)),
            Block::Paragraph(text) => writeln!(out, "<p>{}</p>", encode_text(text)),
            Block::Bullets(items) => {
                out.push_str("<ul>\n");
                for item in items {
                    let _ = writeln!(out, "<li>{}</li>", encode_text(item));
                }
                writeln!(out, "</ul>")
            }
            Block::Table { headers, rows } => {
                out.push_str("<table>\n<thead><tr>");
                for header in headers {
                    let _ = write!(out, "<th>{}</th>", encode_text(header));
                }
                out.push_str("</tr></thead>\n<tbody>\n");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        let _ = write!(out, "<td>{}</td>", encode_text(cell));
                    }
                    out.push_str("</tr>\n");
                }
                writeln!(out, "</tbody>\n</table>")
            }
            Block::Preformatted(lines) => {
                writeln!(out, "<pre>{}</pre>", encode_text(&lines.join("\n")))
            }
        };
    }

    fn render_page(out: &mut String, page: &Page) {
        out.push_str("<section class=\"page\">\n");
        for block in &page.blocks {
            Self::render_block(out, block);
        }
        let _ = writeln!(out, "<footer>{}</footer>\n</section>", page.footer());
    }
}

impl ReportRenderer for HtmlRenderer {
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, document: &ReportDocument) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n",
            encode_text(&document.title)
        );
        for page in &document.pages {
            Self::render_page(&mut out, page);
        }
        out.push_str("</body>\n</html>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_and_paginates() {
        let mut doc = ReportDocument::new("Report <draft>", "r.html");
        doc.new_page()
            .push(Block::Title("Report <draft>".to_string()))
            .field("User", "a&b");
        doc.new_page().push(Block::Table {
            headers: vec!["Gene ID".to_string()],
            rows: vec![vec!["gene1".to_string()]],
        });

        let html = HtmlRenderer.render(&doc);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Report &lt;draft&gt;</h1>"));
        assert!(html.contains("a&amp;b"));
        assert!(html.contains("<td>gene1</td>"));
        assert_eq!(html.matches("<section class=\"page\">").count(), 2);
        assert!(html.contains("<footer>Page 2</footer>"));
    }
}
