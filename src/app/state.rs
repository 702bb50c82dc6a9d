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
use std::sync::MutexGuard;

use crate::deck::RetryPolicy;
use crate::session::Session;
use crate::store::ConfigStore;
use crate::store::Settings;
use crate::tmdb::FetchError;
use crate::tmdb::client::TmdbClient;
use crate::types::candidate::CandidateDetail;
use crate::types::candidate::CandidateId;
use crate::types::candidate::Genre;
use crate::types::candidate::Trailer;

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn ConfigStore>,
    pub retry: RetryPolicy,
    pub mutable: Arc<Mutex<MutableState>>,
}

impl ServerState {
    pub fn lock(&self) -> MutexGuard<'_, MutableState> {
        self.mutable.lock().unwrap()
    }
}

pub struct MutableState {
    pub session: Session,
    pub settings: Settings,
    pub client: TmdbClient,
    pub genres: Option<GenreList>,
    /// Detail and trailer of the titles shown on review and winner screens.
    pub lookups: HashMap<CandidateId, Lookup>,
    pub error: Option<FailedFetch>,
    pub notice: Option<String>,
}

impl MutableState {
    /// Whether the category list for the configured language is loaded.
    pub fn has_genres(&self) -> bool {
        self.genres
            .as_ref()
            .is_some_and(|g| g.language == self.settings.prefs.language)
    }

    pub fn genres(&self) -> &[Genre] {
        match &self.genres {
            Some(list) if list.language == self.settings.prefs.language => &list.genres,
            _ => &[],
        }
    }
}

pub struct GenreList {
    pub language: String,
    pub genres: Vec<Genre>,
}

#[derive(Clone)]
pub struct Lookup {
    pub detail: CandidateDetail,
    pub trailer: Option<Trailer>,
}

/// A failed deck build, shown as a banner.
pub struct FailedFetch {
    pub message: String,
    pub retryable: bool,
}

impl From<&FetchError> for FailedFetch {
    fn from(error: &FetchError) -> Self {
        Self {
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}
