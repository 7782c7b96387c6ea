/* 📖 # Why validate links eagerly?

A HalDoc is handed to code that trusts every link to have an href: the
dispatcher resolves reference links to entity ids, tests walk `next` links.
Checking every link (including those inside `_embedded`) while parsing turns
a bad document into one MalformedLink error at the boundary instead of a
surprise somewhere downstream.
*/

use chain_base::{ChainError, ChainResult};
use serde_json::{Map, Value};

use crate::document::ResourceDocument;
use crate::link::{Link, LinkSet, LinkSetBuilder, Relation};

/// A parsed HAL+JSON document: attributes without the reserved keys, links
/// from `_links`, and embedded documents from `_embedded`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HalDoc {
    attributes: Map<String, Value>,
    links: LinkSet,
    embedded: Vec<(String, EmbeddedHal)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedHal {
    Single(Box<HalDoc>),
    List(Vec<HalDoc>),
}

impl EmbeddedHal {
    pub fn documents(&self) -> &[HalDoc] {
        match self {
            EmbeddedHal::Single(document) => std::slice::from_ref(document.as_ref()),
            EmbeddedHal::List(documents) => documents,
        }
    }
}

static NULL: Value = Value::Null;

impl HalDoc {
    /// Parse a HAL+JSON body.
    pub fn parse(bytes: &[u8]) -> ChainResult<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            Box::new(ChainError::malformed_document(format!("invalid JSON: {}", e)))
        })?;
        Self::from_value(value)
    }

    /// Build from an already decoded JSON value, which must be an object.
    pub fn from_value(value: Value) -> ChainResult<Self> {
        let Value::Object(mut object) = value else {
            return Err(Box::new(ChainError::malformed_document(
                "expected a JSON object",
            )));
        };

        let links = match object.shift_remove("_links") {
            None => LinkSet::default(),
            Some(Value::Object(links)) => parse_links(links)?,
            Some(_) => {
                return Err(Box::new(ChainError::malformed_document(
                    "_links must be an object",
                )));
            }
        };

        let mut embedded = vec![];
        match object.shift_remove("_embedded") {
            None => {}
            Some(Value::Object(resources)) => {
                for (rel, resource) in resources {
                    let parsed = match resource {
                        Value::Array(list) => EmbeddedHal::List(
                            list.into_iter()
                                .map(Self::from_value)
                                .collect::<ChainResult<_>>()?,
                        ),
                        single => EmbeddedHal::Single(Box::new(Self::from_value(single)?)),
                    };
                    embedded.push((rel, parsed));
                }
            }
            Some(_) => {
                return Err(Box::new(ChainError::malformed_document(
                    "_embedded must be an object",
                )));
            }
        }

        Ok(Self {
            attributes: object,
            links,
            embedded,
        })
    }

    /// Parse the plain JSON dialect: `_href` becomes `self`, objects carrying
    /// `_href` become links titled by `_disp`, and a `data` array of objects
    /// becomes embedded `items`. Any other `data` stays an attribute.
    pub fn from_plain_json(bytes: &[u8]) -> ChainResult<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            Box::new(ChainError::malformed_document(format!("invalid JSON: {}", e)))
        })?;
        Self::from_plain_value(value)
    }

    fn from_plain_value(value: Value) -> ChainResult<Self> {
        let Value::Object(object) = value else {
            return Err(Box::new(ChainError::malformed_document(
                "expected a JSON object",
            )));
        };

        let mut attributes = Map::new();
        let mut links = LinkSet::builder();
        let mut embedded = vec![];
        for (key, value) in object {
            if key == "_href" {
                links = links.single("self", plain_link("self", &value)?);
                continue;
            }
            if key == "data" {
                match value {
                    Value::Array(items) if items.iter().all(Value::is_object) => {
                        let documents = items
                            .into_iter()
                            .map(Self::from_plain_value)
                            .collect::<ChainResult<_>>()?;
                        embedded.push(("items".to_string(), EmbeddedHal::List(documents)));
                    }
                    value => {
                        attributes.insert(key, value);
                    }
                }
                continue;
            }
            if is_plain_link(&value) {
                links = links.single(key.clone(), plain_link(&key, &value)?);
                continue;
            }
            if let Value::Array(list) = &value {
                if !list.is_empty() && list.iter().all(is_plain_link) {
                    let parsed = list
                        .iter()
                        .map(|item| plain_link(&key, item))
                        .collect::<ChainResult<_>>()?;
                    links = links.list(key.clone(), parsed);
                    continue;
                }
            }
            attributes.insert(key, value);
        }

        Ok(Self {
            attributes,
            links: links.build(),
            embedded,
        })
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    pub fn embedded(&self, rel: &str) -> Option<&EmbeddedHal> {
        self.embedded
            .iter()
            .find(|(name, _)| name == rel)
            .map(|(_, embedded)| embedded)
    }
}

/// Attribute access in the style of `serde_json::Value`: missing keys yield `null`.
impl std::ops::Index<&str> for HalDoc {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        self.attributes.get(name).unwrap_or(&NULL)
    }
}

fn parse_links(links: Map<String, Value>) -> ChainResult<LinkSet> {
    let mut builder: LinkSetBuilder = LinkSet::builder();
    for (rel, value) in links {
        let relation = match value {
            Value::Array(list) => Relation::List(
                list.iter()
                    .map(|item| parse_link(&rel, item))
                    .collect::<ChainResult<_>>()?,
            ),
            single => Relation::Single(parse_link(&rel, &single)?),
        };
        builder = builder.relation(rel, relation);
    }
    Ok(builder.build())
}

fn parse_link(rel: &str, value: &Value) -> ChainResult<Link> {
    let Value::Object(object) = value else {
        return Err(Box::new(ChainError::malformed_link(
            rel,
            "link must be an object",
        )));
    };
    let href = match object.get("href") {
        Some(Value::String(href)) if !href.is_empty() => href,
        Some(Value::String(_)) => {
            return Err(Box::new(ChainError::malformed_link(rel, "empty href")));
        }
        Some(_) => {
            return Err(Box::new(ChainError::malformed_link(
                rel,
                "href must be a string",
            )));
        }
        None => return Err(Box::new(ChainError::malformed_link(rel, "missing href"))),
    };

    let mut link = Link::new(href.clone())?;
    if let Some(title) = object.get("title").and_then(Value::as_str) {
        link = link.with_title(title);
    }
    if let Some(name) = object.get("name").and_then(Value::as_str) {
        link = link.with_name(name);
    }
    if object.get("templated").and_then(Value::as_bool) == Some(true) {
        link = link.templated();
    }
    Ok(link)
}

fn is_plain_link(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|object| object.contains_key("_href"))
}

fn plain_link(rel: &str, value: &Value) -> ChainResult<Link> {
    let (href, title) = match value {
        Value::String(href) => (Some(href.as_str()), None),
        Value::Object(object) => (
            object.get("_href").and_then(Value::as_str),
            object.get("_disp").and_then(Value::as_str),
        ),
        _ => (None, None),
    };
    let href = match href {
        Some(href) if !href.is_empty() => href,
        _ => {
            return Err(Box::new(ChainError::malformed_link(
                rel,
                "missing or empty _href",
            )));
        }
    };
    let link = Link::new(href)?;
    Ok(match title {
        Some(title) => link.with_title(title),
        None => link,
    })
}

impl From<HalDoc> for ResourceDocument {
    fn from(document: HalDoc) -> Self {
        let mut builder = ResourceDocument::builder()
            .attributes(document.attributes)
            .links(document.links);
        for (rel, embedded) in document.embedded {
            builder = match embedded {
                EmbeddedHal::Single(inner) => builder.embed(rel, ResourceDocument::from(*inner)),
                EmbeddedHal::List(list) => {
                    builder.embed_list(rel, list.into_iter().map(ResourceDocument::from).collect())
                }
            };
        }
        builder.build()
    }
}
