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

//! Test support: a fake TMDB served from a local port.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::sleep;

use crate::error::Fallible;
use crate::store::ConfigStore;

pub const TEST_TOKEN: &str = "test-token";

/// A store that lives only as long as the test.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl ConfigStore for MemoryStore {
    fn read(&self, key: &str) -> Fallible<Option<String>> {
        let values = self.values.lock().unwrap();
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Fallible<()> {
        let mut values = self.values.lock().unwrap();
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Fallible<()> {
        let mut values = self.values.lock().unwrap();
        values.remove(key);
        Ok(())
    }
}

pub struct FakeConfig {
    pub movies: Vec<Value>,
    pub page_size: usize,
    /// The first this-many discover requests answer 429.
    pub rate_limited_requests: usize,
    /// The first this-many genre requests answer 500.
    pub failed_genre_requests: usize,
    /// Movies whose video list has no trailer.
    pub without_trailers: Vec<u64>,
    pub discover_delay: Duration,
    pub detail_delay: Duration,
}

impl FakeConfig {
    pub fn with_movies(movies: Vec<Value>) -> Self {
        Self {
            movies,
            page_size: 20,
            rate_limited_requests: 0,
            failed_genre_requests: 0,
            without_trailers: Vec::new(),
            discover_delay: Duration::ZERO,
            detail_delay: Duration::ZERO,
        }
    }
}

pub struct FakeTmdb {
    pub base_url: String,
    state: FakeState,
}

impl FakeTmdb {
    /// Query strings of the discover requests that were answered with 200.
    pub fn discover_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.queries.lock().unwrap().clone()
    }

    /// Ids of the detail requests received, in order.
    pub fn detail_requests(&self) -> Vec<u64> {
        self.state.details.lock().unwrap().clone()
    }

    /// How many genre requests were received, failed ones included.
    pub fn genre_requests(&self) -> usize {
        self.state.genre_requests.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct FakeState {
    movies: Arc<Vec<Value>>,
    page_size: usize,
    rate_limited: Arc<AtomicUsize>,
    failing_genres: Arc<AtomicUsize>,
    without_trailers: Arc<Vec<u64>>,
    discover_delay: Duration,
    detail_delay: Duration,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    details: Arc<Mutex<Vec<u64>>>,
    genre_requests: Arc<AtomicUsize>,
}

pub fn movie(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "overview": format!("{title} overview."),
        "release_date": "2001-05-04",
        "poster_path": format!("/{id}.jpg"),
        "genre_ids": [28],
    })
}

pub async fn spawn_fake_tmdb(config: FakeConfig) -> Fallible<FakeTmdb> {
    let state = FakeState {
        movies: Arc::new(config.movies),
        page_size: config.page_size.max(1),
        rate_limited: Arc::new(AtomicUsize::new(config.rate_limited_requests)),
        failing_genres: Arc::new(AtomicUsize::new(config.failed_genre_requests)),
        without_trailers: Arc::new(config.without_trailers),
        discover_delay: config.discover_delay,
        detail_delay: config.detail_delay,
        queries: Arc::new(Mutex::new(Vec::new())),
        details: Arc::new(Mutex::new(Vec::new())),
        genre_requests: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route("/discover/movie", get(discover))
        .route("/movie/{id}", get(detail))
        .route("/movie/{id}/videos", get(videos))
        .route("/genre/movie/list", get(genres))
        .with_state(state.clone());
    let port = portpicker::pick_unused_port().unwrap();
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(FakeTmdb {
        base_url: format!("http://127.0.0.1:{port}"),
        state,
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TEST_TOKEN}"))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"status_code": 7}))).into_response()
}

/// Counts down `counter`, returning whether it was still positive.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

async fn discover(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if take_one(&state.rate_limited) {
        return (StatusCode::TOO_MANY_REQUESTS, Json(json!({}))).into_response();
    }
    sleep(state.discover_delay).await;
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    state.queries.lock().unwrap().push(query);
    let total_pages = state.movies.len().div_ceil(state.page_size).max(1);
    let results: Vec<Value> = state
        .movies
        .iter()
        .skip((page - 1) * state.page_size)
        .take(state.page_size)
        .cloned()
        .collect();
    Json(json!({
        "page": page,
        "total_pages": total_pages,
        "results": results,
    }))
    .into_response()
}

fn find_movie(state: &FakeState, id: u64) -> Option<&Value> {
    state
        .movies
        .iter()
        .find(|m| m.get("id").and_then(Value::as_u64) == Some(id))
}

async fn detail(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.details.lock().unwrap().push(id);
    sleep(state.detail_delay).await;
    match find_movie(&state, id) {
        Some(m) => {
            let mut detail = m.clone();
            detail["tagline"] = json!(format!("Tagline {id}."));
            detail["runtime"] = json!(101);
            Json(detail).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
    }
}

async fn videos(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if find_movie(&state, id).is_none() {
        return (StatusCode::NOT_FOUND, Json(json!({}))).into_response();
    }
    let clip = json!({"key": format!("clip-{id}"), "site": "YouTube", "type": "Clip"});
    let mut results = vec![clip];
    if !state.without_trailers.contains(&id) {
        let trailer = json!({"key": format!("trailer-{id}"), "site": "YouTube", "type": "Trailer"});
        results.push(trailer);
    }
    Json(json!({"id": id, "results": results})).into_response()
}

async fn genres(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.genre_requests.fetch_add(1, Ordering::SeqCst);
    if take_one(&state.failing_genres) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response();
    }
    Json(json!({
        "genres": [
            {"id": 28, "name": "Action"},
            {"id": 35, "name": "Comedy"},
        ],
    }))
    .into_response()
}
