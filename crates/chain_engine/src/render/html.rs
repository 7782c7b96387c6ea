use chain_base::ChainResult;
use pulldown_cmark_escape::{escape_href, escape_html};
use serde_json::Value;

use super::{Rendered, Renderer, TEXT_HTML};
use crate::document::ResourceDocument;
use crate::link::{Link, Relation};

/// Renders a browsable HTML page: attributes as a definition list, links as
/// anchors, embedded resources as nested articles.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn media_type(&self) -> &'static str {
        TEXT_HTML
    }

    fn render(&self, document: &ResourceDocument) -> ChainResult<Rendered> {
        let title = document.display_title();
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>");
        text(&mut out, &title);
        out.push_str("</title>\n</head>\n<body>\n<h1>");
        text(&mut out, &title);
        out.push_str("</h1>\n");
        write_document(&mut out, document);
        out.push_str("</body>\n</html>\n");
        Ok(Rendered {
            body: out.into_bytes(),
            content_type: TEXT_HTML.to_string(),
        })
    }
}

fn write_document(out: &mut String, document: &ResourceDocument) {
    if !document.attributes().is_empty() || document.collection().is_some() {
        out.push_str("<dl class=\"attributes\">\n");
        for (name, value) in document.attributes() {
            write_attribute(out, name, value);
        }
        if let Some(collection) = document.collection() {
            write_attribute(out, "totalCount", &Value::from(collection.total_count));
        }
        out.push_str("</dl>\n");
    }

    let page_links = document
        .collection()
        .and_then(|collection| collection.page.as_ref())
        .map(|page| {
            [("previous", &page.previous), ("next", &page.next)]
                .into_iter()
                .filter_map(|(rel, link)| link.as_ref().map(|link| (rel, link)))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if !document.links().is_empty() || !page_links.is_empty() {
        out.push_str("<ul class=\"links\">\n");
        for (rel, relation) in document.links().iter() {
            if rel == "curies" {
                continue;
            }
            match relation {
                Relation::Single(link) => write_link(out, rel, link),
                Relation::List(links) => {
                    for link in links {
                        write_link(out, rel, link);
                    }
                }
            }
        }
        for (rel, link) in page_links {
            write_link(out, rel, link);
        }
        out.push_str("</ul>\n");
    }

    for (rel, embedded) in document.embedded() {
        out.push_str("<section class=\"embedded\">\n<h2>");
        text(out, rel);
        out.push_str("</h2>\n");
        for inner in embedded.documents() {
            out.push_str("<article>\n<h3>");
            text(out, &inner.display_title());
            out.push_str("</h3>\n");
            write_document(out, inner);
            out.push_str("</article>\n");
        }
        out.push_str("</section>\n");
    }
}

fn write_attribute(out: &mut String, name: &str, value: &Value) {
    out.push_str("<dt>");
    text(out, name);
    out.push_str("</dt><dd>");
    match value {
        Value::String(content) => text(out, content),
        Value::Object(_) | Value::Array(_) => {
            out.push_str("<pre>");
            text(out, &serde_json::to_string_pretty(value).unwrap_or_default());
            out.push_str("</pre>");
        }
        other => text(out, &other.to_string()),
    }
    out.push_str("</dd>\n");
}

fn write_link(out: &mut String, rel: &str, link: &Link) {
    out.push_str("<li><span class=\"rel\">");
    text(out, rel);
    out.push_str("</span> <a href=\"");
    // writing into a String cannot fail
    let _ = escape_href(&mut *out, link.href());
    out.push_str("\">");
    text(out, link.title().unwrap_or(link.href()));
    out.push_str("</a></li>\n");
}

fn text(out: &mut String, content: &str) {
    // writing into a String cannot fail
    let _ = escape_html(&mut *out, content);
}
