use chain_base::{ChainError, ChainResult};
use serde_json::{Map, Value};

use super::{HAL_JSON, Rendered, Renderer};
use crate::document::{Embedded, ResourceDocument};
use crate::link::{Link, Relation};

/// Renders `application/hal+json`: attributes at the top level, links under
/// `_links`, embedded resources under `_embedded`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalRenderer;

impl HalRenderer {
    pub fn to_value(&self, document: &ResourceDocument) -> Value {
        let mut object = document.attributes().clone();

        let mut links = Map::new();
        for (rel, relation) in document.links().iter() {
            let value = match relation {
                Relation::Single(link) => link_value(link),
                Relation::List(list) => Value::Array(list.iter().map(link_value).collect()),
            };
            links.insert(rel.to_string(), value);
        }
        if let Some(collection) = document.collection() {
            object
                .entry("totalCount")
                .or_insert_with(|| Value::from(collection.total_count));
            if let Some(page) = &collection.page {
                if let Some(next) = &page.next {
                    links.insert("next".to_string(), link_value(next));
                }
                if let Some(previous) = &page.previous {
                    links.insert("previous".to_string(), link_value(previous));
                }
            }
        }
        if !links.is_empty() {
            object.insert("_links".to_string(), Value::Object(links));
        }

        let mut embedded = Map::new();
        for (rel, resource) in document.embedded() {
            let value = match resource {
                Embedded::Single(inner) => self.to_value(inner),
                Embedded::List(list) => {
                    Value::Array(list.iter().map(|inner| self.to_value(inner)).collect())
                }
            };
            embedded.insert(rel.to_string(), value);
        }
        if !embedded.is_empty() {
            object.insert("_embedded".to_string(), Value::Object(embedded));
        }

        Value::Object(object)
    }
}

pub(crate) fn link_value(link: &Link) -> Value {
    let mut object = Map::new();
    object.insert("href".to_string(), Value::from(link.href()));
    if let Some(name) = link.name() {
        object.insert("name".to_string(), Value::from(name));
    }
    if let Some(title) = link.title() {
        object.insert("title".to_string(), Value::from(title));
    }
    if link.is_templated() {
        object.insert("templated".to_string(), Value::Bool(true));
    }
    Value::Object(object)
}

impl Renderer for HalRenderer {
    fn media_type(&self) -> &'static str {
        HAL_JSON
    }

    fn render(&self, document: &ResourceDocument) -> ChainResult<Rendered> {
        let body = serde_json::to_vec(&self.to_value(document)).map_err(|e| {
            Box::new(ChainError::message(format!("Failed to serialize HAL document: {}", e)))
        })?;
        Ok(Rendered {
            body,
            content_type: HAL_JSON.to_string(),
        })
    }
}
