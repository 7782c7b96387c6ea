use serde_json::{Map, Value};

use crate::link::{Link, LinkSet};

/// Representation-independent description of one resource: its attributes,
/// outgoing links, embedded sub-resources and, for collections, paging data.
///
/// Documents are assembled once per request and only read afterwards, so
/// every renderer sees the same immutable value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDocument {
    attributes: Map<String, Value>,
    links: LinkSet,
    embedded: Vec<(String, Embedded)>,
    collection: Option<CollectionMeta>,
}

/// An embedded resource or list of resources.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedded {
    Single(Box<ResourceDocument>),
    List(Vec<ResourceDocument>),
}

impl Embedded {
    pub fn documents(&self) -> &[ResourceDocument] {
        match self {
            Embedded::Single(document) => std::slice::from_ref(document.as_ref()),
            Embedded::List(documents) => documents,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionMeta {
    /// Number of members across all pages.
    pub total_count: usize,
    pub page: Option<PageMeta>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageMeta {
    pub page_size: usize,
    pub offset: usize,
    pub next: Option<Link>,
    pub previous: Option<Link>,
}

impl ResourceDocument {
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    pub fn embedded(&self) -> impl Iterator<Item = (&str, &Embedded)> {
        self.embedded
            .iter()
            .map(|(rel, embedded)| (rel.as_str(), embedded))
    }

    pub fn embedded_rel(&self, rel: &str) -> Option<&Embedded> {
        self.embedded
            .iter()
            .find(|(name, _)| name == rel)
            .map(|(_, embedded)| embedded)
    }

    pub fn collection(&self) -> Option<&CollectionMeta> {
        self.collection.as_ref()
    }

    pub fn self_href(&self) -> Option<&str> {
        self.links.self_href()
    }

    /// Title for human-facing renderings: `name`, then `title`, then the self link.
    pub fn display_title(&self) -> String {
        ["name", "title"]
            .iter()
            .find_map(|key| match self.attributes.get(*key) {
                Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
                _ => None,
            })
            .or_else(|| self.self_href().map(str::to_string))
            .unwrap_or_else(|| "Resource".to_string())
    }
}

#[derive(Debug, Default)]
pub struct DocumentBuilder {
    attributes: Map<String, Value>,
    links: LinkSet,
    embedded: Vec<(String, Embedded)>,
    collection: Option<CollectionMeta>,
}

impl DocumentBuilder {
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn links(mut self, links: LinkSet) -> Self {
        self.links = links;
        self
    }

    pub fn embed(mut self, rel: impl Into<String>, document: ResourceDocument) -> Self {
        self.embedded
            .push((rel.into(), Embedded::Single(Box::new(document))));
        self
    }

    pub fn embed_list(mut self, rel: impl Into<String>, documents: Vec<ResourceDocument>) -> Self {
        self.embedded.push((rel.into(), Embedded::List(documents)));
        self
    }

    pub fn collection(mut self, meta: CollectionMeta) -> Self {
        self.collection = Some(meta);
        self
    }

    pub fn build(self) -> ResourceDocument {
        ResourceDocument {
            attributes: self.attributes,
            links: self.links,
            embedded: self.embedded,
            collection: self.collection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_prefers_name() {
        let links = LinkSet::builder()
            .single("self", Link::new("/api/sites/1/").unwrap())
            .build();
        let named = ResourceDocument::builder()
            .attribute("title", "Chain API")
            .attribute("name", "MIT Media Lab")
            .links(links.clone())
            .build();
        assert_eq!(named.display_title(), "MIT Media Lab");

        let titled = ResourceDocument::builder()
            .attribute("title", "Chain API")
            .build();
        assert_eq!(titled.display_title(), "Chain API");

        let bare = ResourceDocument::builder().links(links).build();
        assert_eq!(bare.display_title(), "/api/sites/1/");
    }

    #[test]
    fn test_embedded_lookup() {
        let child = ResourceDocument::builder().attribute("name", "child").build();
        let document = ResourceDocument::builder()
            .embed("ch:site", child.clone())
            .embed_list("items", vec![child.clone(), child.clone()])
            .build();

        assert_eq!(document.embedded_rel("ch:site").unwrap().documents(), &[child]);
        assert_eq!(document.embedded_rel("items").unwrap().documents().len(), 2);
        assert!(document.embedded_rel("missing").is_none());
        let rels: Vec<&str> = document.embedded().map(|(rel, _)| rel).collect();
        assert_eq!(rels, vec!["ch:site", "items"]);
    }
}
