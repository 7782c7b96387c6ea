/* 📖 # How does a request become a hypermedia document?

The dispatcher negotiates a media type, asks the store for entities, lets the
paginator cut a page, has the assembler turn entities into a
ResourceDocument full of links, and finally hands that document to the
renderer chosen by negotiation. Inbound HAL goes the other way through
HalDoc before it reaches the store.
*/

pub mod api;
pub mod assemble;
pub mod config;
pub mod document;
pub mod entity;
pub mod haldoc;
pub mod link;
pub mod negotiate;
pub mod paginate;
pub mod render;
pub mod resources;
pub mod store;

pub use api::{DispatchState, Dispatched, RequestDispatcher};
pub use assemble::ResourceAssembler;
pub use config::{ApiConfig, load_config};
pub use document::{CollectionMeta, Embedded, PageMeta, ResourceDocument};
pub use entity::{Entity, EntityId, EntityKind, Filter, NewEntity};
pub use haldoc::{EmbeddedHal, HalDoc};
pub use link::{Curie, CurieRegistry, Link, LinkBuilder, LinkSet, Relation};
pub use negotiate::{ContentNegotiator, Negotiated};
pub use paginate::{Page, PageContext, Paginator};
pub use render::{Renderer, RendererTable};
pub use store::{EntityStore, InMemoryStore, Listing, StoreHandle};
