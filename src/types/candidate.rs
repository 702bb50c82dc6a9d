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

use std::fmt::Display;
use std::fmt::Formatter;

use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use serde::Deserialize;
use serde::Serialize;

/// Base URL for poster images.
pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w780";

/// Characters escaped in a URL query component.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A TMDB movie identifier. Unique within a deck.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize)]
#[serde(transparent)]
pub struct CandidateId(u64);

impl CandidateId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[cfg(test)]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A movie offered to both users. Immutable once fetched.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub title: String,
    pub synopsis: Option<String>,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub genre_ids: Vec<u32>,
}

impl Candidate {
    pub fn tmdb_url(&self) -> String {
        tmdb_url(self.id)
    }
}

/// The full record of a movie, fetched on demand for the review and winner
/// screens.
#[derive(Clone, PartialEq, Debug)]
pub struct CandidateDetail {
    pub id: CandidateId,
    pub title: String,
    pub tagline: Option<String>,
    pub synopsis: Option<String>,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<Genre>,
}

impl CandidateDetail {
    /// Builds a detail record out of the deck entry, for when the detail
    /// endpoint is unavailable.
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id,
            title: candidate.title.clone(),
            tagline: None,
            synopsis: candidate.synopsis.clone(),
            year: candidate.year,
            poster_url: candidate.poster_url.clone(),
            runtime_minutes: None,
            genres: Vec::new(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// A video attached to a movie.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Video {
    pub key: String,
    pub site: String,
    pub kind: String,
}

/// A YouTube trailer or teaser.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Trailer {
    pub key: String,
}

impl Trailer {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.key)
    }
}

pub fn tmdb_url(id: CandidateId) -> String {
    format!("https://www.themoviedb.org/movie/{id}")
}

/// Where to send the user when TMDB lists no trailer for a title.
pub fn trailer_search_url(title: &str) -> String {
    let query = format!("{title} trailer");
    let query = utf8_percent_encode(&query, QUERY_COMPONENT);
    format!("https://www.youtube.com/results?search_query={query}")
}

/// The trailer link for a title: the trailer itself, or a search for one.
pub fn trailer_url(title: &str, trailer: Option<&Trailer>) -> String {
    match trailer {
        Some(trailer) => trailer.watch_url(),
        None => trailer_search_url(title),
    }
}

/// Resolves genre ids against the category list, skipping unknown ids.
pub fn genre_names(ids: &[u32], genres: &[Genre]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| genres.iter().find(|g| g.id == *id))
        .map(|g| g.name.clone())
        .collect()
}
