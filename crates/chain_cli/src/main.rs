/* 📖 # Why is the CLI minimal?

The binary takes at most one argument, the path of a configuration file. Without
it, `chain.toml` in the current directory is used when present and the
defaults otherwise. The store is seeded with the demo sites so the API can be
browsed right away.

Exit codes:
- 0: never under normal operation, the server runs until killed
- 1: Error (config unreadable or invalid, port unavailable)
*/

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use chain_base::http::start_http_server;
use chain_base::tracing::init_tracing;
use chain_engine::{ApiConfig, InMemoryStore, RequestDispatcher, StoreHandle, load_config};
use tracing::info;

const DEFAULT_CONFIG: &str = "chain.toml";

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let config = match env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => load_config(&path),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG);
            if path.exists() {
                load_config(&path)
            } else {
                Ok(ApiConfig::default())
            }
        }
    };
    let config = config.unwrap_or_else(|e| {
        eprintln!("Error: Failed to load configuration: {}", e);
        process::exit(1);
    });

    let store = InMemoryStore::with_demo_data().unwrap_or_else(|e| {
        eprintln!("Error: Failed to seed demo data: {}", e);
        process::exit(1);
    });
    let dispatcher = RequestDispatcher::new(StoreHandle::new(store), &config);

    let server = start_http_server(Arc::new(dispatcher), config.server_config())
        .unwrap_or_else(|e| {
            eprintln!("Error: Failed to start server: {}", e);
            process::exit(1);
        });

    info!(
        title = %config.title,
        root = %config.link_builder().root_href(),
        port = server.port(),
        "serving"
    );

    loop {
        std::thread::park();
    }
}
