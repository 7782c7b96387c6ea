/* 📖 # How is a representation chosen?

Each supported media type is scored against the Accept header by the most
specific range that matches it: an exact `type/sub` beats a subtype wildcard,
which beats the full wildcard. The quality of that range is the quality of
the type, so `text/html;q=0` rules out HTML even when the full wildcard is
present. Among the acceptable types, the one matched by the most specific
range wins, then the higher quality, then the earlier entry in the renderer
table. An absent or empty header accepts the first renderer. Ranges that
cannot be parsed are skipped.
*/

use chain_base::{ChainError, ChainResult};
use tracing::debug;

use crate::render::{HAL_JSON, Renderer, RendererTable};

/// One parsed entry of an Accept header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    main: String,
    sub: String,
    quality: f32,
}

impl MediaRange {
    /// Parse `type/subtype;param=value;q=0.5`. Parameters other than `q` are
    /// ignored. Returns `None` for malformed ranges or quality values.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();
        let (main, sub) = if essence == "*" {
            ("*".to_string(), "*".to_string())
        } else {
            let (main, sub) = essence.split_once('/')?;
            (main.trim().to_string(), sub.trim().to_string())
        };
        if main.is_empty() || sub.is_empty() || (main == "*" && sub != "*") {
            return None;
        }

        let mut quality = 1.0;
        for parameter in parts {
            let Some((name, value)) = parameter.split_once('=') else {
                continue;
            };
            if name.trim().eq_ignore_ascii_case("q") {
                quality = parse_quality(value.trim())?;
            }
        }
        Some(Self { main, sub, quality })
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// 2 for `type/sub`, 1 for `type/*`, 0 for `*/*`.
    pub fn specificity(&self) -> u8 {
        match (self.main.as_str(), self.sub.as_str()) {
            ("*", _) => 0,
            (_, "*") => 1,
            _ => 2,
        }
    }

    pub fn matches(&self, media_type: &str) -> bool {
        let Some((main, sub)) = media_type.split_once('/') else {
            return false;
        };
        (self.main == "*" || self.main.eq_ignore_ascii_case(main))
            && (self.sub == "*" || self.sub.eq_ignore_ascii_case(sub))
    }
}

fn parse_quality(value: &str) -> Option<f32> {
    let quality: f32 = value.parse().ok()?;
    (0.0..=1.0).contains(&quality).then_some(quality)
}

/// Parse every well-formed range of an Accept header.
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    header
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .filter_map(MediaRange::parse)
        .collect()
}

/// The renderer chosen for a request.
#[derive(Debug, Clone, Copy)]
pub struct Negotiated<'a> {
    pub renderer: &'a dyn Renderer,
}

impl Negotiated<'_> {
    pub fn media_type(&self) -> &'static str {
        self.renderer.media_type()
    }
}

#[derive(Debug)]
pub struct ContentNegotiator {
    renderers: RendererTable,
}

impl ContentNegotiator {
    pub fn new(renderers: RendererTable) -> Self {
        Self { renderers }
    }

    /// Pick the renderer for an Accept header value.
    pub fn negotiate(&self, accept: Option<&str>) -> ChainResult<Negotiated<'_>> {
        let header = accept.map(str::trim).unwrap_or_default();
        if header.is_empty() {
            return Ok(Negotiated {
                renderer: self.renderers.default_renderer(),
            });
        }

        let ranges = parse_accept(header);
        let mut best: Option<(u8, f32, &dyn Renderer)> = None;
        for renderer in self.renderers.iter() {
            let Some(range) = ranges
                .iter()
                .filter(|range| range.matches(renderer.media_type()))
                .max_by_key(|range| range.specificity())
            else {
                continue;
            };
            if range.quality() <= 0.0 {
                continue;
            }
            let candidate = (range.specificity(), range.quality(), renderer);
            let better = match &best {
                None => true,
                Some((specificity, quality, _)) => {
                    (candidate.0, candidate.1) > (*specificity, *quality)
                }
            };
            if better {
                best = Some(candidate);
            }
        }

        match best {
            Some((_, _, renderer)) => {
                debug!(accept = header, media_type = renderer.media_type(), "negotiated");
                Ok(Negotiated { renderer })
            }
            None => Err(Box::new(ChainError::not_acceptable(header))),
        }
    }

    /// Renderer used for responses when negotiation itself failed.
    pub fn fallback(&self) -> Negotiated<'_> {
        Negotiated {
            renderer: self
                .renderers
                .find(HAL_JSON)
                .unwrap_or_else(|| self.renderers.default_renderer()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{PLAIN_JSON, TEXT_HTML};
    use chain_base::ErrorKind;

    const BROWSER_TAIL: &str =
        "application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

    fn negotiate(accept: Option<&str>) -> ChainResult<&'static str> {
        let negotiator = ContentNegotiator::new(RendererTable::standard());
        negotiator.negotiate(accept).map(|n| n.media_type())
    }

    #[test]
    fn test_media_range_parse() {
        let range = MediaRange::parse(" Text/HTML ; level=1 ; q=0.5").unwrap();
        assert_eq!(range.specificity(), 2);
        assert_eq!(range.quality(), 0.5);
        assert!(range.matches("text/html"));
        assert_eq!(MediaRange::parse("*").unwrap().specificity(), 0);
        assert_eq!(MediaRange::parse("text/*").unwrap().specificity(), 1);
        assert!(MediaRange::parse("foobar").is_none());
        assert!(MediaRange::parse("*/html").is_none());
        assert!(MediaRange::parse("text/html;q=abc").is_none());
        assert!(MediaRange::parse("text/html;q=2").is_none());
    }

    #[test]
    fn test_missing_or_empty_header_uses_default() {
        assert_eq!(negotiate(None).unwrap(), HAL_JSON);
        assert_eq!(negotiate(Some("")).unwrap(), HAL_JSON);
        assert_eq!(negotiate(Some("   ")).unwrap(), HAL_JSON);
    }

    #[test]
    fn test_exact_types() {
        assert_eq!(negotiate(Some("application/hal+json")).unwrap(), HAL_JSON);
        assert_eq!(negotiate(Some("application/json")).unwrap(), PLAIN_JSON);
        assert_eq!(negotiate(Some("text/html")).unwrap(), TEXT_HTML);
        assert_eq!(negotiate(Some("TEXT/HTML")).unwrap(), TEXT_HTML);
    }

    #[test]
    fn test_browser_accept_headers() {
        assert_eq!(
            negotiate(Some(&format!("text/html,{}", BROWSER_TAIL))).unwrap(),
            TEXT_HTML
        );
        assert_eq!(
            negotiate(Some(&format!("application/json,{}", BROWSER_TAIL))).unwrap(),
            PLAIN_JSON
        );
        assert_eq!(
            negotiate(Some(&format!("application/hal+json,{}", BROWSER_TAIL))).unwrap(),
            HAL_JSON
        );
    }

    #[test]
    fn test_wildcards_fall_back_to_table_order() {
        assert_eq!(negotiate(Some("*/*")).unwrap(), HAL_JSON);
        assert_eq!(negotiate(Some("*")).unwrap(), HAL_JSON);
        assert_eq!(negotiate(Some("foobar, */*")).unwrap(), HAL_JSON);
        assert_eq!(negotiate(Some("text/*")).unwrap(), TEXT_HTML);
    }

    #[test]
    fn test_quality_orders_equally_specific_ranges() {
        assert_eq!(
            negotiate(Some("application/hal+json;q=0.4, text/html;q=0.9")).unwrap(),
            TEXT_HTML
        );
    }

    #[test]
    fn test_zero_quality_excludes() {
        assert_eq!(
            negotiate(Some("application/hal+json;q=0, */*")).unwrap(),
            PLAIN_JSON
        );
        assert!(negotiate(Some("*/*;q=0")).is_err());
    }

    #[test]
    fn test_unacceptable_header() {
        let err = negotiate(Some("foobar")).unwrap_err();
        match err.kind() {
            ErrorKind::NotAcceptable { accept } => assert_eq!(accept, "foobar"),
            other => panic!("Expected NotAcceptable, got {}", other),
        }
        assert!(negotiate(Some("image/png")).is_err());
    }

    #[test]
    fn test_fallback_is_hal() {
        let negotiator = ContentNegotiator::new(RendererTable::standard());
        assert_eq!(negotiator.fallback().media_type(), HAL_JSON);
    }
}
