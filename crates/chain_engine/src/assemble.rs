/* 📖 # How are documents assembled?

Every kind goes through the same three functions. The per-kind differences
(title attribute, parent and child relations, external links, create form)
come from the ResourceProfile table, so adding a kind never touches this
file. Relation names are compacted with the default curie here; renderers
never invent relation names of their own.
*/

use chain_base::ChainResult;
use serde_json::Value;

use crate::document::{CollectionMeta, ResourceDocument};
use crate::entity::{Entity, Filter};
use crate::link::{Link, LinkBuilder, LinkSet, LinkSetBuilder};
use crate::paginate::{Page, PageContext};
use crate::resources::{PROFILES, profile};

#[derive(Debug, Clone)]
pub struct ResourceAssembler<'a> {
    links: &'a LinkBuilder,
}

impl<'a> ResourceAssembler<'a> {
    pub fn new(links: &'a LinkBuilder) -> Self {
        Self { links }
    }

    /// Entry point of the API: a link to every top-level collection.
    pub fn assemble_root(&self, title: &str) -> ChainResult<ResourceDocument> {
        let mut links = self
            .with_curies(LinkSet::builder().single("self", Link::new(self.links.root_href())?))?;
        for profile in &PROFILES {
            links = links.single(
                self.links.compact(profile.relation),
                Link::new(self.links.collection_href(profile.kind, &Filter::new(), 0))?
                    .with_title(profile.collection_title),
            );
        }
        Ok(ResourceDocument::builder()
            .attribute("title", title)
            .links(links.build())
            .build())
    }

    /// A single entity with links to its parents, child collections and
    /// external resources.
    pub fn assemble_item(&self, entity: &Entity) -> ChainResult<ResourceDocument> {
        let links = self.with_curies(self.item_links(entity)?)?;
        Ok(ResourceDocument::builder()
            .attributes(entity.attributes.clone())
            .links(links.build())
            .build())
    }

    /// One page of a collection: `items` links to the members, the members
    /// themselves embedded under `items`, and a `createForm` for writable kinds.
    pub fn assemble_collection(
        &self,
        page: Page<Entity>,
        context: &PageContext,
    ) -> ChainResult<ResourceDocument> {
        let profile = profile(context.kind);
        let self_href = self
            .links
            .collection_href(context.kind, &context.filter, context.offset);
        let mut links = self.with_curies(LinkSet::builder().single("self", Link::new(self_href)?))?;

        let mut members = Vec::with_capacity(page.items.len());
        let mut item_links = Vec::with_capacity(page.items.len());
        for entity in &page.items {
            item_links.push(
                Link::new(self.links.item_href(entity.kind, entity.id))?
                    .with_title(entity.title(profile.title_attribute)),
            );
            members.push(
                ResourceDocument::builder()
                    .attributes(entity.attributes.clone())
                    .links(self.item_links(entity)?.build())
                    .build(),
            );
        }
        links = links.list("items", item_links);
        if let Some(title) = profile.create_form {
            links = links.single(
                "createForm",
                Link::new(self.links.collection_href(context.kind, &context.filter, 0))?
                    .with_title(title),
            );
        }

        Ok(ResourceDocument::builder()
            .links(links.build())
            .embed_list("items", members)
            .collection(CollectionMeta {
                total_count: page.total_count,
                page: Some(page.meta),
            })
            .build())
    }

    /// Body of an error response.
    pub fn assemble_error(&self, status: u16, message: &str) -> ResourceDocument {
        ResourceDocument::builder()
            .attribute("status", Value::from(status))
            .attribute("message", message)
            .build()
    }

    fn item_links(&self, entity: &Entity) -> ChainResult<LinkSetBuilder> {
        let profile = profile(entity.kind);
        let mut links = LinkSet::builder().single(
            "self",
            Link::new(self.links.item_href(entity.kind, entity.id))?
                .with_title(entity.title(profile.title_attribute)),
        );
        for parent in profile.parents {
            if let Some(id) = entity.reference(parent.reference) {
                links = links.single(
                    self.links.compact(parent.relation),
                    Link::new(self.links.item_href(parent.kind, id))?,
                );
            }
        }
        for child in profile.children {
            let filter = Filter::new().with(child.filter, entity.id.to_string());
            links = links.single(
                self.links.compact(child.relation),
                Link::new(self.links.collection_href(child.kind, &filter, 0))?
                    .with_title(child.title),
            );
        }
        for rel in profile.external_links {
            if let Some(href) = entity.external_links.get(*rel) {
                links = links.single(*rel, Link::new(href.clone())?);
            }
        }
        Ok(links)
    }

    fn with_curies(&self, links: LinkSetBuilder) -> ChainResult<LinkSetBuilder> {
        Ok(links.list("curies", self.links.curies().links()?))
    }
}
