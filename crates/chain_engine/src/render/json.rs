use chain_base::{ChainError, ChainResult};
use serde_json::{Map, Value};

use super::{PLAIN_JSON, Rendered, Renderer, bare_relation};
use crate::document::{Embedded, ResourceDocument};
use crate::link::{Link, Relation};

/* 📖 # Why a second JSON dialect?

Simple clients do not want to learn HAL. The plain rendering puts the self
href into `_href`, turns every other relation into `{"_href", "_disp"}` keyed
by its bare name, and flattens collection members into a `data` array with
paging details under `meta`. Curies are dropped since no bare name needs them.
Attributes own their field names: a relation whose bare name collides with an
attribute is left out of the plain rendering.
*/

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl JsonRenderer {
    pub fn to_value(&self, document: &ResourceDocument) -> Value {
        let mut object = Map::new();
        if let Some(href) = document.self_href() {
            object.insert("_href".to_string(), Value::from(href));
        }
        for (name, value) in document.attributes() {
            object.insert(name.clone(), value.clone());
        }

        for (rel, relation) in document.links().iter() {
            if matches!(rel, "self" | "curies" | "items") {
                continue;
            }
            let value = match relation {
                Relation::Single(link) => link_value(link),
                Relation::List(list) => Value::Array(list.iter().map(link_value).collect()),
            };
            object.entry(bare_relation(rel)).or_insert(value);
        }

        for (rel, resource) in document.embedded() {
            if rel == "items" && document.collection().is_some() {
                continue;
            }
            let value = match resource {
                Embedded::Single(inner) => self.to_value(inner),
                Embedded::List(list) => {
                    Value::Array(list.iter().map(|inner| self.to_value(inner)).collect())
                }
            };
            object.entry(bare_relation(rel)).or_insert(value);
        }

        if let Some(collection) = document.collection() {
            let data: Vec<Value> = document
                .embedded_rel("items")
                .map(|items| {
                    items
                        .documents()
                        .iter()
                        .map(|inner| self.to_value(inner))
                        .collect()
                })
                .unwrap_or_default();
            object.insert("totalCount".to_string(), Value::from(collection.total_count));
            object.insert("data".to_string(), Value::Array(data));

            let mut meta = Map::new();
            meta.insert("totalCount".to_string(), Value::from(collection.total_count));
            if let Some(page) = &collection.page {
                meta.insert("pageSize".to_string(), Value::from(page.page_size));
                meta.insert("offset".to_string(), Value::from(page.offset));
                if let Some(next) = &page.next {
                    meta.insert("next".to_string(), link_value(next));
                }
                if let Some(previous) = &page.previous {
                    meta.insert("previous".to_string(), link_value(previous));
                }
            }
            object.insert("meta".to_string(), Value::Object(meta));
        }

        Value::Object(object)
    }
}

fn link_value(link: &Link) -> Value {
    let mut object = Map::new();
    object.insert("_href".to_string(), Value::from(link.href()));
    if let Some(title) = link.title() {
        object.insert("_disp".to_string(), Value::from(title));
    }
    Value::Object(object)
}

impl Renderer for JsonRenderer {
    fn media_type(&self) -> &'static str {
        PLAIN_JSON
    }

    fn render(&self, document: &ResourceDocument) -> ChainResult<Rendered> {
        let body = serde_json::to_vec(&self.to_value(document)).map_err(|e| {
            Box::new(ChainError::message(format!("Failed to serialize JSON document: {}", e)))
        })?;
        Ok(Rendered {
            body,
            content_type: PLAIN_JSON.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CollectionMeta, PageMeta};
    use crate::link::LinkSet;
    use expect_test::expect;

    fn device(id: u32) -> ResourceDocument {
        ResourceDocument::builder()
            .attribute("name", format!("Device {}", id))
            .links(
                LinkSet::builder()
                    .single("self", Link::new(format!("/api/devices/{}/", id)).unwrap())
                    .single(
                        "ch:sensors",
                        Link::new(format!("/api/sensors/?device={}", id))
                            .unwrap()
                            .with_title("Sensors"),
                    )
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_item_uses_href_and_bare_relations() {
        let rendered = JsonRenderer.render(&device(2)).unwrap();
        assert_eq!(rendered.content_type, "application/json");
        expect![[r#"{"_href":"/api/devices/2/","name":"Device 2","sensors":{"_href":"/api/sensors/?device=2","_disp":"Sensors"}}"#]]
            .assert_eq(&String::from_utf8(rendered.body).unwrap());
    }

    #[test]
    fn test_collection_flattens_items_into_data() {
        let document = ResourceDocument::builder()
            .links(
                LinkSet::builder()
                    .single("self", Link::new("/api/devices/?site=1&offset=1").unwrap())
                    .push("curies", Link::new("/rels/{rel}").unwrap().templated())
                    .push("items", Link::new("/api/devices/2/").unwrap())
                    .single(
                        "createForm",
                        Link::new("/api/devices/?site=1")
                            .unwrap()
                            .with_title("Create Device"),
                    )
                    .build(),
            )
            .embed_list("items", vec![device(2)])
            .collection(CollectionMeta {
                total_count: 3,
                page: Some(PageMeta {
                    page_size: 1,
                    offset: 1,
                    next: Some(Link::new("/api/devices/?site=1&offset=2").unwrap()),
                    previous: Some(Link::new("/api/devices/?site=1").unwrap()),
                }),
            })
            .build();

        let value = JsonRenderer.to_value(&document);
        assert_eq!(value["_href"], "/api/devices/?site=1&offset=1");
        assert!(value.get("curies").is_none());
        assert!(value.get("items").is_none());
        assert_eq!(value["createForm"]["_disp"], "Create Device");
        assert_eq!(value["totalCount"], 3);
        assert_eq!(value["data"][0]["_href"], "/api/devices/2/");
        assert_eq!(value["data"][0]["sensors"]["_href"], "/api/sensors/?device=2");
        assert_eq!(value["meta"]["next"]["_href"], "/api/devices/?site=1&offset=2");
        assert_eq!(value["meta"]["previous"]["_href"], "/api/devices/?site=1");
        assert_eq!(value["meta"]["pageSize"], 1);
    }

    #[test]
    fn test_empty_collection_has_empty_data() {
        let document = ResourceDocument::builder()
            .collection(CollectionMeta {
                total_count: 0,
                page: None,
            })
            .build();
        let value = JsonRenderer.to_value(&document);
        assert_eq!(value["data"], Value::Array(vec![]));
        assert!(value["meta"].get("next").is_none());
    }

    #[test]
    fn test_attribute_wins_over_relation_with_same_name() {
        let document = ResourceDocument::builder()
            .attribute("site", "Lab roof")
            .links(
                LinkSet::builder()
                    .single("self", Link::new("/api/devices/4/").unwrap())
                    .single("ch:site", Link::new("/api/sites/1/").unwrap())
                    .single("ch:sensors", Link::new("/api/sensors/?device=4").unwrap())
                    .build(),
            )
            .build();
        let value = JsonRenderer.to_value(&document);
        assert_eq!(value["site"], "Lab roof");
        assert_eq!(value["sensors"]["_href"], "/api/sensors/?device=4");
    }
}
