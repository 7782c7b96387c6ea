use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::{ChainError, ChainResult};

use super::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
};

/* 📖 # Why tiny_http with a polling accept loop?

The API is synchronous from end to end, so a blocking server with one accept
thread is all it needs. Polling with a short timeout lets the loop notice the
shutdown flag without any extra signalling machinery.
*/

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Start serving `service` on a background thread.
///
/// Returns once the socket is bound. The server stops when the returned handle
/// is shut down or dropped.
#[instrument(skip(service), fields(address = %config.address()))]
pub fn start_http_server(
    service: Arc<dyn HttpService>,
    config: HttpServerConfig,
) -> ChainResult<HttpServerHandle> {
    let server = tiny_http::Server::http(config.address()).map_err(|e| {
        Box::new(ChainError::message(format!(
            "Failed to bind HTTP server to {}: {}",
            config.address(),
            e
        )))
    })?;
    let port = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.port())
        .ok_or_else(|| crate::err!("HTTP server is not listening on an IP address"))?;

    let handle = HttpServerHandle::new(port);
    let shutdown = handle.shutdown_flag();
    std::thread::Builder::new()
        .name("chain-http".to_string())
        .spawn(move || serve(server, service, shutdown))
        .map_err(|e| {
            Box::new(ChainError::message(format!(
                "Failed to spawn server thread: {}",
                e
            )))
        })?;

    info!(port, "HTTP server listening");
    Ok(handle)
}

fn serve(server: tiny_http::Server, service: Arc<dyn HttpService>, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::SeqCst) {
        let request = match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "failed to receive request");
                continue;
            }
        };
        handle_connection(service.as_ref(), request);
    }
    info!("HTTP server stopped");
}

fn handle_connection(service: &dyn HttpService, mut raw: tiny_http::Request) {
    let response = match convert_request(&mut raw) {
        Some(request) => {
            debug!(method = %request.method(), target = request.target(), "handling request");
            match service.handle_request(request) {
                Ok(response) => response,
                Err(e) => {
                    error!(error = ?e, "service failed to handle request");
                    HttpResponse::internal_error()
                        .with_content_type("text/plain")
                        .with_body(e.to_string())
                }
            }
        }
        None => HttpResponse::new(super::HttpStatusCode::MethodNotAllowed)
            .with_content_type("text/plain")
            .with_body("Unsupported method"),
    };

    if let Err(e) = raw.respond(convert_response(response)) {
        warn!(error = %e, "failed to write response");
    }
}

fn convert_request(raw: &mut tiny_http::Request) -> Option<HttpRequest> {
    let method = HttpMethod::parse(&raw.method().to_string())?;
    let mut request = HttpRequest::new(method, raw.url());
    for header in raw.headers() {
        request = request.with_header(header.field.as_str().as_str(), header.value.as_str());
    }
    let mut body = Vec::new();
    if let Err(e) = raw.as_reader().read_to_end(&mut body) {
        warn!(error = %e, "failed to read request body");
    }
    Some(request.with_body(body))
}

fn convert_response(response: HttpResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let status = response.status().as_u16();
    let headers: Vec<tiny_http::Header> = response
        .headers()
        .iter()
        .filter_map(|(key, value)| {
            tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
        })
        .collect();
    let mut converted =
        tiny_http::Response::from_data(response.into_body().into_bytes()).with_status_code(status);
    for header in headers {
        converted.add_header(header);
    }
    converted
}
