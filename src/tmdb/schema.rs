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

//! Raw TMDB payloads. Every field is optional on the wire and may arrive in
//! the wrong shape; normalization happens here so nothing past this module
//! deals with missing or mistyped fields.

use serde::Deserialize;
use serde::Deserializer;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::tmdb::DiscoverPage;
use crate::tmdb::FetchError;
use crate::types::candidate::Candidate;
use crate::types::candidate::CandidateDetail;
use crate::types::candidate::CandidateId;
use crate::types::candidate::Genre;
use crate::types::candidate::IMAGE_BASE;
use crate::types::candidate::Video;

const UNKNOWN_TITLE: &str = "Unknown title";

#[derive(Deserialize)]
struct RawDiscoverPage {
    #[serde(default, deserialize_with = "lenient")]
    results: Option<Vec<RawMovie>>,
    #[serde(default, deserialize_with = "lenient")]
    total_pages: Option<u32>,
}

#[derive(Deserialize)]
struct RawMovie {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    overview: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    release_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    poster_path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    genre_ids: Option<Vec<u32>>,
}

#[derive(Deserialize)]
struct RawDetail {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    tagline: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    overview: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    release_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    poster_path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    runtime: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    genres: Option<Vec<RawGenre>>,
}

#[derive(Deserialize)]
struct RawGenre {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawGenreList {
    #[serde(default, deserialize_with = "lenient")]
    genres: Option<Vec<RawGenre>>,
}

#[derive(Deserialize)]
struct RawVideoList {
    #[serde(default, deserialize_with = "lenient")]
    results: Option<Vec<RawVideo>>,
}

#[derive(Deserialize)]
struct RawVideo {
    #[serde(default, deserialize_with = "lenient")]
    key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    site: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    kind: Option<String>,
}

/// A wire value that may arrive in the wrong shape. Values that cannot be
/// coerced read as absent.
trait Coerce: Sized {
    fn coerce(value: Value) -> Option<Self>;
}

impl Coerce for u64 {
    fn coerce(value: Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Coerce for u32 {
    fn coerce(value: Value) -> Option<Self> {
        u64::coerce(value).and_then(|n| u32::try_from(n).ok())
    }
}

impl Coerce for String {
    fn coerce(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Lists keep the elements that coerce and drop the rest.
impl<T: Coerce> Coerce for Vec<T> {
    fn coerce(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(items.into_iter().filter_map(T::coerce).collect()),
            _ => None,
        }
    }
}

impl Coerce for RawMovie {
    fn coerce(value: Value) -> Option<Self> {
        record(value)
    }
}

impl Coerce for RawGenre {
    fn coerce(value: Value) -> Option<Self> {
        record(value)
    }
}

impl Coerce for RawVideo {
    fn coerce(value: Value) -> Option<Self> {
        record(value)
    }
}

fn record<T: DeserializeOwned>(value: Value) -> Option<T> {
    match value {
        Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Coerce,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::coerce(value))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))
}

pub fn parse_discover(body: &str) -> Result<DiscoverPage, FetchError> {
    let raw: RawDiscoverPage = decode(body)?;
    let results = raw
        .results
        .unwrap_or_default()
        .into_iter()
        .filter_map(normalize_movie)
        .collect();
    Ok(DiscoverPage {
        results,
        total_pages: raw.total_pages.unwrap_or(1).max(1),
    })
}

pub fn parse_detail(body: &str, requested: CandidateId) -> Result<CandidateDetail, FetchError> {
    let raw: RawDetail = decode(body)?;
    let id = raw.id.map(CandidateId::new).unwrap_or(requested);
    Ok(CandidateDetail {
        id,
        title: title_or_unknown(raw.title),
        tagline: non_blank(raw.tagline),
        synopsis: non_blank(raw.overview),
        year: release_year(raw.release_date.as_deref()),
        poster_url: poster_url(raw.poster_path),
        runtime_minutes: raw.runtime.filter(|r| *r > 0),
        genres: normalize_genres(raw.genres),
    })
}

pub fn parse_videos(body: &str) -> Result<Vec<Video>, FetchError> {
    let raw: RawVideoList = decode(body)?;
    let videos = raw
        .results
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| {
            Some(Video {
                key: non_blank(v.key)?,
                site: v.site.unwrap_or_default(),
                kind: v.kind.unwrap_or_default(),
            })
        })
        .collect();
    Ok(videos)
}

pub fn parse_genres(body: &str) -> Result<Vec<Genre>, FetchError> {
    let raw: RawGenreList = decode(body)?;
    Ok(normalize_genres(raw.genres))
}

fn normalize_movie(raw: RawMovie) -> Option<Candidate> {
    let id = CandidateId::new(raw.id?);
    Some(Candidate {
        id,
        title: title_or_unknown(raw.title),
        synopsis: non_blank(raw.overview),
        year: release_year(raw.release_date.as_deref()),
        poster_url: poster_url(raw.poster_path),
        genre_ids: raw.genre_ids.unwrap_or_default(),
    })
}

fn normalize_genres(raw: Option<Vec<RawGenre>>) -> Vec<Genre> {
    raw.unwrap_or_default()
        .into_iter()
        .filter_map(|g| {
            Some(Genre {
                id: g.id?,
                name: non_blank(g.name)?,
            })
        })
        .collect()
}

fn title_or_unknown(title: Option<String>) -> String {
    non_blank(title).unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// The leading four digits of a `YYYY-MM-DD` date.
fn release_year(date: Option<&str>) -> Option<i32> {
    date?.get(..4)?.parse().ok()
}

fn poster_url(path: Option<String>) -> Option<String> {
    non_blank(path).map(|p| format!("{IMAGE_BASE}{}", p.trim()))
}
