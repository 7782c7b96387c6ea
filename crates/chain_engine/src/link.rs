/* 📖 # Why model relations as Single | List?

HAL allows a relation to hold either one link object or an array of them, and
clients depend on which one they get (`curies` and `items` are always arrays,
`self` never is). Encoding the choice in the Relation enum means the parser
decides once at the boundary and every renderer simply matches on it.
*/

use chain_base::{ChainError, ChainResult};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::entity::{EntityId, EntityKind, Filter};

/// A hypermedia link. The relation name is the key it is stored under in a
/// [`LinkSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    href: String,
    title: Option<String>,
    name: Option<String>,
    templated: bool,
}

impl Link {
    /// Create a link, rejecting an empty href.
    pub fn new(href: impl Into<String>) -> ChainResult<Self> {
        let href = href.into();
        if href.is_empty() {
            return Err(Box::new(ChainError::malformed_link(
                "link",
                "href must not be empty",
            )));
        }
        Ok(Self {
            href,
            title: None,
            name: None,
            templated: false,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark the href as a URI template.
    pub fn templated(mut self) -> Self {
        self.templated = true;
        self
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_templated(&self) -> bool {
        self.templated
    }
}

/// The value of one relation: a single link or an ordered list of links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    Single(Link),
    List(Vec<Link>),
}

impl Relation {
    /// The link of a single-link relation.
    pub fn single(&self) -> Option<&Link> {
        match self {
            Relation::Single(link) => Some(link),
            Relation::List(_) => None,
        }
    }

    /// All links of the relation in order; a single link is a one-element slice.
    pub fn links(&self) -> &[Link] {
        match self {
            Relation::Single(link) => std::slice::from_ref(link),
            Relation::List(links) => links,
        }
    }

    /// Shortcut for the href of a single-link relation.
    pub fn href(&self) -> Option<&str> {
        self.single().map(Link::href)
    }
}

impl std::ops::Index<usize> for Relation {
    type Output = Link;

    fn index(&self, index: usize) -> &Link {
        &self.links()[index]
    }
}

/// Relation name to links mapping, in insertion order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    relations: Vec<(String, Relation)>,
}

impl LinkSet {
    pub fn builder() -> LinkSetBuilder {
        LinkSetBuilder::default()
    }

    pub fn get(&self, rel: &str) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|(name, _)| name == rel)
            .map(|(_, relation)| relation)
    }

    pub fn contains(&self, rel: &str) -> bool {
        self.get(rel).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Relation)> {
        self.relations
            .iter()
            .map(|(name, relation)| (name.as_str(), relation))
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// The href of the `self` relation, if present.
    pub fn self_href(&self) -> Option<&str> {
        self.get("self").and_then(Relation::href)
    }
}

impl std::ops::Index<&str> for LinkSet {
    type Output = Relation;

    fn index(&self, rel: &str) -> &Relation {
        match self.get(rel) {
            Some(relation) => relation,
            None => panic!("no relation named '{}'", rel),
        }
    }
}

/// Builder for [`LinkSet`].
#[derive(Debug, Default)]
pub struct LinkSetBuilder {
    relations: Vec<(String, Relation)>,
}

impl LinkSetBuilder {
    /// Set a single-link relation, replacing any previous value.
    pub fn single(mut self, rel: impl Into<String>, link: Link) -> Self {
        self.set(rel.into(), Relation::Single(link));
        self
    }

    /// Set a list relation, replacing any previous value.
    pub fn list(mut self, rel: impl Into<String>, links: Vec<Link>) -> Self {
        self.set(rel.into(), Relation::List(links));
        self
    }

    /// Append a link to a list relation, creating it if needed.
    pub fn push(mut self, rel: impl Into<String>, link: Link) -> Self {
        let rel = rel.into();
        match self.relations.iter_mut().find(|(name, _)| *name == rel) {
            Some((_, relation)) => {
                let mut links = match std::mem::replace(relation, Relation::List(vec![])) {
                    Relation::Single(first) => vec![first],
                    Relation::List(links) => links,
                };
                links.push(link);
                *relation = Relation::List(links);
            }
            None => self.relations.push((rel, Relation::List(vec![link]))),
        }
        self
    }

    /// Set a relation value as is.
    pub fn relation(mut self, rel: impl Into<String>, relation: Relation) -> Self {
        self.set(rel.into(), relation);
        self
    }

    pub fn build(self) -> LinkSet {
        LinkSet {
            relations: self.relations,
        }
    }

    fn set(&mut self, rel: String, relation: Relation) {
        match self.relations.iter_mut().find(|(name, _)| *name == rel) {
            Some((_, existing)) => *existing = relation,
            None => self.relations.push((rel, relation)),
        }
    }
}

/// A compact URI prefix and the template its relations expand into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curie {
    pub name: String,
    pub template: String,
}

/* 📖 # Why keep curies as configuration data?
Relation compaction is a naming convention, not behaviour of any entity type.
The registry is a plain ordered list of (prefix, template) pairs; resolving
`ch:sites` is a prefix lookup followed by substituting `{rel}`.
*/

/// Ordered set of registered curies. The first one is used for compaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurieRegistry {
    curies: Vec<Curie>,
}

impl CurieRegistry {
    pub fn new(curie: Curie) -> Self {
        Self {
            curies: vec![curie],
        }
    }

    pub fn register(mut self, curie: Curie) -> Self {
        self.curies.push(curie);
        self
    }

    /// Expand a compact relation name (`ch:sites`) into its documentation URL.
    pub fn resolve(&self, rel: &str) -> Option<String> {
        let (prefix, name) = rel.split_once(':')?;
        self.curies
            .iter()
            .find(|curie| curie.name == prefix)
            .map(|curie| curie.template.replace("{rel}", name))
    }

    /// Prefix a relation name with the default curie.
    pub fn compact(&self, name: &str) -> String {
        format!("{}:{}", self.curies[0].name, name)
    }

    /// The `curies` relation links, in registration order.
    pub fn links(&self) -> ChainResult<Vec<Link>> {
        self.curies
            .iter()
            .map(|curie| {
                Ok(Link::new(curie.template.clone())?
                    .with_name(curie.name.clone())
                    .templated())
            })
            .collect()
    }
}

const API_ROOT: &str = "/api/";

/// Everything but RFC 3986 unreserved characters is escaped in query components.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Maps resource kinds and identities to canonical URLs.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base_url: String,
    curies: CurieRegistry,
}

impl LinkBuilder {
    pub fn new(base_url: impl Into<String>, curies: CurieRegistry) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, curies }
    }

    pub fn curies(&self) -> &CurieRegistry {
        &self.curies
    }

    pub fn root_href(&self) -> String {
        format!("{}{}", self.base_url, API_ROOT)
    }

    /// URL of a collection, carrying the filter and (when non-zero) the offset.
    pub fn collection_href(&self, kind: EntityKind, filter: &Filter, offset: usize) -> String {
        let mut href = format!("{}{}{}/", self.base_url, API_ROOT, kind.segment());
        let mut pairs: Vec<String> = filter
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(name, QUERY_COMPONENT),
                    utf8_percent_encode(value, QUERY_COMPONENT)
                )
            })
            .collect();
        if offset > 0 {
            pairs.push(format!("offset={}", offset));
        }
        if !pairs.is_empty() {
            href.push('?');
            href.push_str(&pairs.join("&"));
        }
        href
    }

    pub fn item_href(&self, kind: EntityKind, id: EntityId) -> String {
        format!("{}{}{}/{}/", self.base_url, API_ROOT, kind.segment(), id)
    }

    /// Recover kind and id from an item URL, absolute or path-only.
    pub fn parse_item_href(&self, href: &str) -> Option<(EntityKind, EntityId)> {
        let path = href.strip_prefix(&self.base_url).unwrap_or(href);
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let rest = path.strip_prefix(API_ROOT)?;
        let mut segments = rest.trim_end_matches('/').split('/');
        let kind = EntityKind::from_segment(segments.next()?)?;
        let id = EntityId::parse(segments.next()?)?;
        if segments.next().is_some() {
            return None;
        }
        Some((kind, id))
    }

    /// Prefix a relation name with the default curie (`sites` -> `ch:sites`).
    pub fn compact(&self, name: &str) -> String {
        self.curies.compact(name)
    }

    /// Expand a compact relation name against the registered curies.
    pub fn resolve(&self, rel: &str) -> Option<String> {
        self.curies.resolve(rel)
    }
}
