/* 📖 # Why an explicit dispatch state machine?

A request passes through the same steps every time: negotiate a
representation, fetch (or parse, validate and persist), assemble, paginate,
render. Naming those steps as DispatchState values gives every log line a
place in that sequence and lets tests assert which steps ran, e.g. that an
unacceptable Accept header is rejected before the store is ever touched.
Every failure ends in exactly one terminal state that decides the status code.
*/

use chain_base::http::{HttpRequest, HttpResponse, HttpService, HttpStatusCode};
use chain_base::{ChainError, ChainResult, ErrorKind};
use percent_encoding::percent_decode_str;
use tracing::{debug, error, instrument, warn};

use crate::assemble::ResourceAssembler;
use crate::config::ApiConfig;
use crate::document::ResourceDocument;
use crate::entity::{EntityId, EntityKind, Filter, NewEntity};
use crate::haldoc::HalDoc;
use crate::link::LinkBuilder;
use crate::negotiate::{ContentNegotiator, Negotiated};
use crate::paginate::{PageContext, Paginator};
use crate::render::{PLAIN_JSON, RendererTable};
use crate::resources::profile;
use crate::store::StoreHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Negotiating,
    Fetching,
    Paginating,
    Assembling,
    ParsingInput,
    Validating,
    Persisting,
    Rendering,
    Done,
    Rejected,
    NotFound,
    Failed,
}

/// The response for a request together with the states it went through.
#[derive(Debug)]
pub struct Dispatched {
    /// Terminal state: `Done`, `Rejected`, `NotFound` or `Failed`.
    pub state: DispatchState,
    pub trail: Vec<DispatchState>,
    pub response: HttpResponse,
}

#[derive(Debug)]
enum Route {
    Root,
    Collection(EntityKind),
    Item(EntityKind, EntityId),
}

/// Why a request could not be served, and how to say so.
#[derive(Debug)]
struct Failure {
    status: HttpStatusCode,
    state: DispatchState,
    message: String,
}

impl Failure {
    fn new(status: HttpStatusCode, state: DispatchState, message: impl Into<String>) -> Self {
        Self {
            status,
            state,
            message: message.into(),
        }
    }

    fn not_found(resource: &str) -> Self {
        Self::from(Box::new(ChainError::not_found(resource)))
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::from(Box::new(ChainError::validation(message)))
    }
}

impl From<Box<ChainError>> for Failure {
    fn from(error: Box<ChainError>) -> Self {
        let (status, state) = match error.kind() {
            ErrorKind::MalformedLink { .. }
            | ErrorKind::MalformedDocument { .. }
            | ErrorKind::Validation { .. } => (HttpStatusCode::BadRequest, DispatchState::Rejected),
            ErrorKind::NotAcceptable { .. } => {
                (HttpStatusCode::NotAcceptable, DispatchState::Rejected)
            }
            ErrorKind::NotFound { .. } => (HttpStatusCode::NotFound, DispatchState::NotFound),
            ErrorKind::FileError { .. } | ErrorKind::Message { .. } => {
                error!(error = ?error, "request failed");
                (HttpStatusCode::InternalServerError, DispatchState::Failed)
            }
        };
        Self::new(status, state, error.to_string())
    }
}

#[derive(Debug, Default)]
struct Trail {
    states: Vec<DispatchState>,
}

impl Trail {
    fn enter(&mut self, state: DispatchState) {
        debug!(?state, "dispatch state");
        self.states.push(state);
    }
}

/// Serves the hypermedia API: routes `/api/...` requests, drives the store,
/// assembler and paginator, and renders the negotiated representation.
#[derive(Debug)]
pub struct RequestDispatcher {
    store: StoreHandle,
    links: LinkBuilder,
    negotiator: ContentNegotiator,
    page_size: usize,
    title: String,
}

impl RequestDispatcher {
    pub fn new(store: StoreHandle, config: &ApiConfig) -> Self {
        Self {
            store,
            links: config.link_builder(),
            negotiator: ContentNegotiator::new(RendererTable::standard()),
            page_size: config.page_size,
            title: config.title.clone(),
        }
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    #[instrument(skip_all, fields(method = %request.method(), target = request.target()))]
    pub fn dispatch(&self, request: &HttpRequest) -> Dispatched {
        let mut trail = Trail::default();
        trail.enter(DispatchState::Negotiating);
        let accept = request.headers().get("accept").map(String::as_str);
        let negotiated = match self.negotiator.negotiate(accept) {
            Ok(negotiated) => negotiated,
            Err(error) => {
                return self.fail(trail, self.negotiator.fallback(), Failure::from(error));
            }
        };

        match self.respond(request, negotiated, &mut trail) {
            Ok(response) => {
                trail.enter(DispatchState::Done);
                Dispatched {
                    state: DispatchState::Done,
                    trail: trail.states,
                    response,
                }
            }
            Err(failure) => self.fail(trail, negotiated, failure),
        }
    }

    fn respond(
        &self,
        request: &HttpRequest,
        negotiated: Negotiated<'_>,
        trail: &mut Trail,
    ) -> Result<HttpResponse, Failure> {
        use chain_base::http::HttpMethod::{Get, Post};

        let route = route(request.path()).ok_or_else(|| Failure::not_found(request.path()))?;
        let (status, document) = match (request.method(), route) {
            (Get, Route::Root) => {
                trail.enter(DispatchState::Assembling);
                let assembler = ResourceAssembler::new(&self.links);
                (HttpStatusCode::Ok, assembler.assemble_root(&self.title)?)
            }
            (Get, Route::Collection(kind)) => {
                let context = collection_context(kind, request.query())?;
                (HttpStatusCode::Ok, self.collection(&context, trail)?)
            }
            (Get, Route::Item(kind, id)) => {
                trail.enter(DispatchState::Fetching);
                let entity = self
                    .store
                    .get(kind, id)?
                    .ok_or_else(|| Failure::not_found(request.path()))?;
                trail.enter(DispatchState::Assembling);
                let assembler = ResourceAssembler::new(&self.links);
                (HttpStatusCode::Ok, assembler.assemble_item(&entity)?)
            }
            (Post, Route::Collection(kind)) => {
                let context = collection_context(kind, request.query())?;
                (HttpStatusCode::Created, self.create(request, &context, trail)?)
            }
            (method, _) => {
                return Err(Failure::new(
                    HttpStatusCode::MethodNotAllowed,
                    DispatchState::Rejected,
                    format!("Method {} is not allowed on {}", method, request.path()),
                ));
            }
        };

        trail.enter(DispatchState::Rendering);
        let rendered = negotiated.renderer.render(&document)?;
        let mut response = HttpResponse::new(status)
            .with_content_type(rendered.content_type)
            .with_body(rendered.body);
        if status == HttpStatusCode::Created {
            if let Some(location) = document.self_href() {
                response = response.with_header("Location", location);
            }
        }
        Ok(response)
    }

    fn collection(
        &self,
        context: &PageContext,
        trail: &mut Trail,
    ) -> Result<ResourceDocument, Failure> {
        trail.enter(DispatchState::Fetching);
        let listing = self.store.list(context.kind, &context.filter)?;
        trail.enter(DispatchState::Paginating);
        let page = Paginator::new(&self.links, self.page_size).paginate(
            listing.items,
            listing.total_count,
            context,
        )?;
        trail.enter(DispatchState::Assembling);
        Ok(ResourceAssembler::new(&self.links).assemble_collection(page, context)?)
    }

    fn create(
        &self,
        request: &HttpRequest,
        context: &PageContext,
        trail: &mut Trail,
    ) -> Result<ResourceDocument, Failure> {
        trail.enter(DispatchState::ParsingInput);
        let body = request.body().as_bytes();
        let document = if is_plain_json(request) {
            HalDoc::from_plain_json(body)?
        } else {
            HalDoc::parse(body)?
        };

        trail.enter(DispatchState::Validating);
        let entity = self.new_entity(context, document)?;

        trail.enter(DispatchState::Persisting);
        let created = self.store.create(context.kind, entity)?;
        debug!(kind = %created.kind, id = %created.id, "persisted");

        trail.enter(DispatchState::Assembling);
        Ok(ResourceAssembler::new(&self.links).assemble_item(&created)?)
    }

    /// Turn an inbound document into entity data. References come from the
    /// collection filter (`POST /api/devices/?site=1`) and from links named
    /// after a parent relation; external links are copied as they are.
    fn new_entity(&self, context: &PageContext, document: HalDoc) -> Result<NewEntity, Failure> {
        let profile = profile(context.kind);
        let mut entity = NewEntity {
            attributes: document.attributes().clone(),
            ..NewEntity::default()
        };

        for (name, value) in context.filter.iter() {
            if let Some(parent) = profile.parents.iter().find(|p| p.reference == name) {
                let id = EntityId::parse(value).ok_or_else(|| {
                    Failure::invalid(format!("'{}' must be an entity id, got '{}'", name, value))
                })?;
                entity.references.insert(parent.reference.to_string(), id);
            }
        }

        for (rel, relation) in document.links().iter() {
            if let Some(parent) = profile.parent(rel) {
                let href = relation.href().ok_or_else(|| {
                    Failure::invalid(format!("'{}' must be a single link", rel))
                })?;
                let (kind, id) = self.links.parse_item_href(href).ok_or_else(|| {
                    Failure::invalid(format!("'{}' does not point at an API resource: {}", rel, href))
                })?;
                if kind != parent.kind {
                    return Err(Failure::invalid(format!(
                        "'{}' must point at a {}, not a {}",
                        rel,
                        parent.kind.label(),
                        kind.label()
                    )));
                }
                entity.references.insert(parent.reference.to_string(), id);
            } else if profile.external_links.iter().any(|known| *known == rel) {
                let href = relation.href().ok_or_else(|| {
                    Failure::invalid(format!("'{}' must be a single link", rel))
                })?;
                entity.external_links.insert(rel.to_string(), href.to_string());
            }
        }
        Ok(entity)
    }

    fn fail(&self, mut trail: Trail, negotiated: Negotiated<'_>, failure: Failure) -> Dispatched {
        trail.enter(failure.state);
        if failure.state != DispatchState::Failed {
            warn!(status = failure.status.as_u16(), message = %failure.message, "request rejected");
        }
        let document =
            ResourceAssembler::new(&self.links).assemble_error(failure.status.as_u16(), &failure.message);
        let response = match negotiated.renderer.render(&document) {
            Ok(rendered) => HttpResponse::new(failure.status)
                .with_content_type(rendered.content_type)
                .with_body(rendered.body),
            Err(error) => {
                error!(error = ?error, "failed to render error document");
                HttpResponse::new(failure.status)
                    .with_content_type("text/plain")
                    .with_body(failure.message)
            }
        };
        Dispatched {
            state: failure.state,
            trail: trail.states,
            response,
        }
    }
}

impl HttpService for RequestDispatcher {
    fn handle_request(&self, request: HttpRequest) -> ChainResult<HttpResponse> {
        Ok(self.dispatch(&request).response)
    }
}

/// Map a request path onto a route. A trailing slash is optional.
fn route(path: &str) -> Option<Route> {
    let rest = path.strip_prefix("/api")?;
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Some(Route::Root);
    }
    let mut segments = rest.strip_prefix('/')?.split('/');
    let kind = EntityKind::from_segment(segments.next()?)?;
    let route = match segments.next() {
        None => Route::Collection(kind),
        Some(id) => Route::Item(kind, EntityId::parse(id)?),
    };
    match segments.next() {
        None => Some(route),
        Some(_) => None,
    }
}

/// Read the offset and the filters the kind accepts from a query string.
/// Unknown parameters are ignored.
fn collection_context(kind: EntityKind, query: Option<&str>) -> ChainResult<PageContext> {
    let profile = profile(kind);
    let mut filter = Filter::new();
    let mut offset = 0;
    for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode(raw_name)?;
        let value = decode(raw_value)?;
        if name == "offset" {
            offset = value.parse().map_err(|_| {
                Box::new(ChainError::validation(format!(
                    "offset must be a non-negative integer, got '{}'",
                    value
                )))
            })?;
        } else if profile.accepts_filter(&name) {
            filter = filter.with(name, value);
        }
    }
    Ok(PageContext {
        kind,
        filter,
        offset,
    })
}

fn decode(component: &str) -> ChainResult<String> {
    percent_decode_str(&component.replace('+', " "))
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Box::new(ChainError::validation(format!("invalid query string: {}", e))))
}

fn is_plain_json(request: &HttpRequest) -> bool {
    request
        .headers()
        .get("content-type")
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PLAIN_JSON))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chain_base::http::HttpMethod;

    fn dispatcher() -> RequestDispatcher {
        let store = StoreHandle::new(InMemoryStore::with_demo_data().unwrap());
        RequestDispatcher::new(store, &ApiConfig::default())
    }

    fn get(target: &str, accept: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, target).with_header("Accept", accept)
    }

    #[test]
    fn test_route() {
        assert!(matches!(route("/api/"), Some(Route::Root)));
        assert!(matches!(route("/api"), Some(Route::Root)));
        assert!(matches!(route("/api/sites/"), Some(Route::Collection(EntityKind::Site))));
        assert!(matches!(route("/api/scalar_data"), Some(Route::Collection(EntityKind::ScalarData))));
        assert!(matches!(
            route("/api/devices/3/"),
            Some(Route::Item(EntityKind::Device, id)) if id == EntityId::new(3)
        ));
        assert!(route("/api/foobar/").is_none());
        assert!(route("/api/sites/abc/").is_none());
        assert!(route("/api/sites/1/extra/").is_none());
        assert!(route("/apis/").is_none());
        assert!(route("/").is_none());
    }

    #[test]
    fn test_collection_context() {
        let context =
            collection_context(EntityKind::Device, Some("site=1&offset=30&color=red")).unwrap();
        assert_eq!(context.filter, Filter::new().with("site", "1"));
        assert_eq!(context.offset, 30);

        let context = collection_context(EntityKind::Site, Some("site=1")).unwrap();
        assert!(context.filter.is_empty());

        assert!(collection_context(EntityKind::Site, Some("offset=-1")).is_err());
        assert!(collection_context(EntityKind::Site, Some("offset=abc")).is_err());
    }

    #[test]
    fn test_successful_get_walks_states_in_order() {
        let dispatched = dispatcher().dispatch(&get("/api/sites/", "application/hal+json"));
        assert_eq!(dispatched.state, DispatchState::Done);
        assert_eq!(
            dispatched.trail,
            vec![
                DispatchState::Negotiating,
                DispatchState::Fetching,
                DispatchState::Paginating,
                DispatchState::Assembling,
                DispatchState::Rendering,
                DispatchState::Done,
            ]
        );
        assert_eq!(dispatched.response.status(), HttpStatusCode::Ok);
    }

    #[test]
    fn test_not_acceptable_never_fetches() {
        let dispatched = dispatcher().dispatch(&get("/api/sites/", "foobar"));
        assert_eq!(dispatched.state, DispatchState::Rejected);
        assert_eq!(
            dispatched.trail,
            vec![DispatchState::Negotiating, DispatchState::Rejected]
        );
        assert_eq!(dispatched.response.status(), HttpStatusCode::NotAcceptable);
        assert_eq!(dispatched.response.content_type(), Some("application/hal+json"));
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let dispatched = dispatcher().dispatch(&get("/api/sites/99/", "application/json"));
        assert_eq!(dispatched.state, DispatchState::NotFound);
        assert_eq!(dispatched.response.status(), HttpStatusCode::NotFound);
        assert_eq!(dispatched.response.content_type(), Some("application/json"));
    }

    #[test]
    fn test_post_walks_write_states() {
        let request = HttpRequest::new(HttpMethod::Post, "/api/sites/")
            .with_body(r#"{"name": "MIT Media Lab"}"#);
        let dispatched = dispatcher().dispatch(&request);
        assert_eq!(
            dispatched.trail,
            vec![
                DispatchState::Negotiating,
                DispatchState::ParsingInput,
                DispatchState::Validating,
                DispatchState::Persisting,
                DispatchState::Assembling,
                DispatchState::Rendering,
                DispatchState::Done,
            ]
        );
        assert_eq!(dispatched.response.status(), HttpStatusCode::Created);
        assert_eq!(
            dispatched.response.headers().get("location").map(String::as_str),
            Some("http://localhost:8000/api/sites/3/")
        );
    }

    #[test]
    fn test_unsupported_method_is_rejected() {
        let request = HttpRequest::new(HttpMethod::Delete, "/api/sites/1/");
        let dispatched = dispatcher().dispatch(&request);
        assert_eq!(dispatched.state, DispatchState::Rejected);
        assert_eq!(dispatched.response.status(), HttpStatusCode::MethodNotAllowed);
    }

    #[test]
    fn test_reference_to_wrong_kind_is_rejected() {
        let request = HttpRequest::new(HttpMethod::Post, "/api/devices/").with_body(
            r#"{"name": "Misplaced", "_links": {"ch:site": {"href": "/api/sensors/1/"}}}"#,
        );
        let dispatched = dispatcher().dispatch(&request);
        assert_eq!(dispatched.state, DispatchState::Rejected);
        assert_eq!(dispatched.response.status(), HttpStatusCode::BadRequest);
        assert_eq!(
            dispatched.trail,
            vec![
                DispatchState::Negotiating,
                DispatchState::ParsingInput,
                DispatchState::Validating,
                DispatchState::Rejected,
            ]
        );
    }
}
