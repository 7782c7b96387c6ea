/* 📖 # Why one Renderer trait per media type?

Content negotiation picks a media type, and everything after that is a pure
function from ResourceDocument to bytes. Putting each format behind the same
trait lets the negotiator work on an ordered table without knowing about
HAL, plain JSON or HTML.
*/

mod hal;
mod html;
mod json;

pub use hal::HalRenderer;
pub use html::HtmlRenderer;
pub use json::JsonRenderer;

use chain_base::{ChainResult, bail};

use crate::document::ResourceDocument;

pub const HAL_JSON: &str = "application/hal+json";
pub const PLAIN_JSON: &str = "application/json";
pub const TEXT_HTML: &str = "text/html";

/// Output of a renderer, ready to become a response body.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub body: Vec<u8>,
    pub content_type: String,
}

pub trait Renderer: std::fmt::Debug + Send + Sync {
    /// Media type this renderer produces, lowercase, without parameters.
    fn media_type(&self) -> &'static str;

    fn render(&self, document: &ResourceDocument) -> ChainResult<Rendered>;
}

/// Supported renderers in preference order. The first one is the default.
#[derive(Debug)]
pub struct RendererTable {
    renderers: Vec<Box<dyn Renderer>>,
}

impl RendererTable {
    pub fn new(renderers: Vec<Box<dyn Renderer>>) -> ChainResult<Self> {
        if renderers.is_empty() {
            bail!("At least one renderer is required");
        }
        Ok(Self { renderers })
    }

    /// HAL+JSON, plain JSON and HTML, in that order.
    pub fn standard() -> Self {
        Self {
            renderers: vec![
                Box::new(HalRenderer),
                Box::new(JsonRenderer),
                Box::new(HtmlRenderer),
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Renderer> {
        self.renderers.iter().map(|renderer| renderer.as_ref())
    }

    pub fn default_renderer(&self) -> &dyn Renderer {
        self.renderers[0].as_ref()
    }

    pub fn find(&self, media_type: &str) -> Option<&dyn Renderer> {
        self.iter()
            .find(|renderer| renderer.media_type().eq_ignore_ascii_case(media_type))
    }
}

/// Strip a curie prefix from a relation name (`ch:sites` -> `sites`).
/// URIs used as relation names are left alone.
pub(crate) fn bare_relation(rel: &str) -> &str {
    match rel.split_once(':') {
        Some((prefix, name)) if !prefix.is_empty() && !name.starts_with("//") => name,
        _ => rel,
    }
}
