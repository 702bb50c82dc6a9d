// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use axum::http::HeaderName;
use axum::http::StatusCode;
use axum::http::header::CACHE_CONTROL;
use axum::http::header::CONTENT_TYPE;
use axum::response::Html;
use axum::routing::get;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::signal;
use tokio::time::sleep;

use crate::app::get::get_handler;
use crate::app::post::post_handler;
use crate::app::settings::settings_handler;
use crate::app::settings::settings_page;
use crate::app::state::MutableState;
use crate::app::state::ServerState;
use crate::deck::RetryPolicy;
use crate::error::Fallible;
use crate::session::Session;
use crate::store::ConfigStore;
use crate::store::effective_token;
use crate::tmdb::client::DEFAULT_BASE_URL;
use crate::tmdb::client::TmdbClient;

pub struct ServerConfig {
    pub port: u16,
    pub open_browser: bool,
    /// Seed for the coin flip and the random pick.
    pub seed: Option<u64>,
    pub tmdb_base_url: String,
    pub retry: RetryPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            open_browser: true,
            seed: None,
            tmdb_base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

pub async fn start_server(config: ServerConfig, store: Arc<dyn ConfigStore>) -> Fallible<()> {
    let settings = store.load()?;
    let token = effective_token(settings.token.clone());
    if token.is_none() {
        log::warn!("No TMDB token configured. Add one in the settings.");
    }
    let client = TmdbClient::new(&config.tmdb_base_url, token)?;

    let target = settings.prefs.target_count;
    let mut session = match config.seed {
        Some(seed) => Session::seeded(target, seed),
        None => Session::from_os_rng(target),
    };
    session.prefill_names(&settings.names.you, &settings.names.partner);

    let state = ServerState {
        store,
        retry: config.retry,
        mutable: Arc::new(Mutex::new(MutableState {
            session,
            settings,
            client,
            genres: None,
            lookups: HashMap::new(),
            error: None,
            notice: None,
        })),
    };
    let app = Router::new();
    let app = app.route("/", get(get_handler));
    let app = app.route("/", post(post_handler));
    let app = app.route("/settings", get(settings_page));
    let app = app.route("/settings", post(settings_handler));
    let app = app.route("/style.css", get(stylesheet));
    let app = app.fallback(not_found_handler);
    let app = app.with_state(state);
    let bind = format!("127.0.0.1:{}", config.port);

    if config.open_browser {
        // Start a separate task to open the browser.
        let bind = bind.clone();
        tokio::spawn(async move {
            loop {
                if let Ok(stream) = TcpStream::connect(&bind).await {
                    drop(stream);
                    break;
                }
                sleep(Duration::from_millis(1)).await;
            }
            let url = format!("http://{bind}/");
            if let Err(e) = open::that(&url) {
                log::warn!("Could not open {url}: {e}");
            }
        });
    }

    log::debug!("Starting server on {bind}");
    let listener = TcpListener::bind(&bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::debug!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        log::error!("Could not listen for ctrl-c: {e}");
    }
}

async fn stylesheet() -> (StatusCode, [(HeaderName, &'static str); 2], &'static [u8]) {
    let bytes = include_bytes!("style.css");
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/css"),
            (CACHE_CONTROL, "public, max-age=604800, immutable"),
        ],
        bytes,
    )
}

async fn not_found_handler() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html("Not Found".to_string()))
}
