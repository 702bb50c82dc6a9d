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

use std::path::Path;

use crate::db::Database;
use crate::deck::ExclusionSet;
use crate::deck::RetryPolicy;
use crate::deck::build_deck;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::prefs::clamp_target;
use crate::store::ConfigStore;
use crate::store::effective_token;
use crate::tmdb::CandidateSource;
use crate::tmdb::DiscoverFilter;
use crate::tmdb::client::DEFAULT_BASE_URL;
use crate::tmdb::client::TmdbClient;
use crate::types::candidate::Candidate;
use crate::types::candidate::Genre;

pub fn open_database(path: &Path) -> Fallible<Database> {
    Database::new(
        path.to_str()
            .ok_or_else(|| ErrorReport::new("invalid path"))?,
    )
}

fn client_for(store: &dyn ConfigStore, base_url: &str) -> Fallible<TmdbClient> {
    let settings = store.load()?;
    TmdbClient::new(base_url, effective_token(settings.token))
}

/// Prints a freshly built deck as JSON.
pub async fn print_deck(db_path: &Path, size: Option<usize>) -> Fallible<()> {
    let db = open_database(db_path)?;
    let deck = deal_deck(&db, DEFAULT_BASE_URL, size).await?;
    let json: String = serde_json::to_string_pretty(&deck)?;
    println!("{json}");
    Ok(())
}

async fn deal_deck(
    store: &dyn ConfigStore,
    base_url: &str,
    size: Option<usize>,
) -> Fallible<Vec<Candidate>> {
    let prefs = store.load()?.prefs;
    let client = client_for(store, base_url)?;
    let target = clamp_target(size.unwrap_or(prefs.target_count));
    let filter = DiscoverFilter::from(&prefs);
    let deck = build_deck(
        &client,
        target,
        &ExclusionSet::new(),
        &filter,
        &RetryPolicy::default(),
    )
    .await?;
    if deck.len() < target {
        log::warn!("Only {} of {target} titles were available.", deck.len());
    }
    Ok(deck)
}

/// Prints the category list as JSON.
pub async fn print_genres(db_path: &Path) -> Fallible<()> {
    let db = open_database(db_path)?;
    let genres = load_genres(&db, DEFAULT_BASE_URL).await?;
    let json: String = serde_json::to_string_pretty(&genres)?;
    println!("{json}");
    Ok(())
}

async fn load_genres(store: &dyn ConfigStore, base_url: &str) -> Fallible<Vec<Genre>> {
    let language = store.load()?.prefs.language;
    let client = client_for(store, base_url)?;
    Ok(client.genres(&language).await?)
}
