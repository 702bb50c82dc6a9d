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

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;

use crate::app::state::GenreList;
use crate::app::state::Lookup;
use crate::app::state::ServerState;
use crate::app::template::page_template;
use crate::app::view::render;
use crate::session::phase::Phase;
use crate::tmdb::CandidateSource;
use crate::tmdb::client::TmdbClient;
use crate::tmdb::find_trailer;
use crate::types::candidate::Candidate;
use crate::types::candidate::CandidateDetail;

pub async fn get_handler(State(state): State<ServerState>) -> (StatusCode, Html<String>) {
    ensure_genres(&state).await;
    ensure_lookups(&state).await;
    let mutable = state.lock();
    let html = page_template(render(&mutable));
    (StatusCode::OK, Html(html.into_string()))
}

/// Fetches the category list when a swiping screen needs it. A failed fetch
/// is not cached, so the next page load tries again.
async fn ensure_genres(state: &ServerState) {
    let (client, language) = {
        let mutable = state.lock();
        if !mutable.session.phase().is_swiping() || mutable.has_genres() {
            return;
        }
        let language = mutable.settings.prefs.language.clone();
        (mutable.client.clone(), language)
    };
    let genres = match client.genres(&language).await {
        Ok(genres) => genres,
        Err(e) => {
            log::warn!("Could not load genres: {e}");
            return;
        }
    };
    let mut mutable = state.lock();
    if mutable.settings.prefs.language != language {
        log::debug!("Dropping genres for stale language {language}.");
        return;
    }
    mutable.genres = Some(GenreList { language, genres });
}

/// Fetches detail and trailer of the titles on screen: the one under review,
/// the winner, or every confirmed title on the final screen.
async fn ensure_lookups(state: &ServerState) {
    let (client, language, ticket, pending) = {
        let mutable = state.lock();
        let session = &mutable.session;
        let (ticket, shown) = match session.phase() {
            Phase::Final => (session.deal_ticket(), session.confirmed_candidates()),
            phase if phase.is_review() || phase == Phase::Winner => {
                let Some(candidate) = session.focus().and_then(|id| session.candidate(id)) else {
                    return;
                };
                (session.lookup_ticket(candidate.id), vec![candidate])
            }
            _ => return,
        };
        let pending: Vec<Candidate> = shown
            .into_iter()
            .filter(|c| !mutable.lookups.contains_key(&c.id))
            .cloned()
            .collect();
        if pending.is_empty() {
            return;
        }
        let language = mutable.settings.prefs.language.clone();
        (mutable.client.clone(), language, ticket, pending)
    };
    for candidate in pending {
        let lookup = fetch_lookup(&client, &candidate, &language).await;
        let mut mutable = state.lock();
        if !mutable.session.is_live(ticket) {
            log::debug!("Dropping stale lookup for {}.", candidate.id);
            return;
        }
        mutable.lookups.insert(candidate.id, lookup);
    }
}

async fn fetch_lookup(client: &TmdbClient, candidate: &Candidate, language: &str) -> Lookup {
    let id = candidate.id;
    let (detail, trailer) = tokio::join!(
        client.detail(id, language),
        find_trailer(client, id, language)
    );
    let detail = match detail {
        Ok(detail) => detail,
        Err(e) => {
            log::warn!("Could not load details for {id}: {e}");
            CandidateDetail::from_candidate(candidate)
        }
    };
    Lookup { detail, trailer }
}
