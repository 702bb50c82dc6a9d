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

//! The TMDB HTTP API, seen through the `CandidateSource` trait.

pub mod client;
pub mod schema;

use std::fmt::Display;
use std::fmt::Formatter;
use std::future::Future;

use crate::prefs::Monetization;
use crate::prefs::Preferences;
use crate::prefs::SortOrder;
use crate::types::candidate::Candidate;
use crate::types::candidate::CandidateDetail;
use crate::types::candidate::CandidateId;
use crate::types::candidate::Genre;
use crate::types::candidate::Trailer;
use crate::types::candidate::Video;

/// Why a request to the candidate source failed.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FetchError {
    /// No API token is configured. Never retried.
    MissingCredential,
    /// The source answered 429 more often than the retry bound allows.
    RateLimited,
    /// Any other non-success status.
    Status(u16),
    /// The request did not complete (connection, timeout).
    Transport(String),
    /// The response body did not decode.
    Parse(String),
}

impl FetchError {
    /// Whether offering a manual retry makes sense.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::MissingCredential => false,
            FetchError::RateLimited => true,
            FetchError::Status(code) => *code >= 500,
            FetchError::Transport(_) => true,
            FetchError::Parse(_) => false,
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::MissingCredential => {
                write!(f, "No TMDB token configured. Add one in the settings.")
            }
            FetchError::RateLimited => write!(f, "TMDB is rate limiting. Try again shortly."),
            FetchError::Status(code) => write!(f, "TMDB fetch failed: {code}"),
            FetchError::Transport(msg) => write!(f, "Could not reach TMDB: {msg}"),
            FetchError::Parse(msg) => write!(f, "Unexpected TMDB response: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Discovery criteria for building a deck.
#[derive(Clone, PartialEq, Debug)]
pub struct DiscoverFilter {
    pub region: String,
    pub monetization: Monetization,
    pub provider_ids: Vec<u32>,
    pub sort_by: SortOrder,
    pub min_vote_count: u32,
}

impl From<&Preferences> for DiscoverFilter {
    fn from(prefs: &Preferences) -> Self {
        Self {
            region: prefs.region.clone(),
            monetization: prefs.monetization,
            provider_ids: prefs.provider_ids.clone(),
            sort_by: prefs.sort_by,
            min_vote_count: prefs.min_vote_count,
        }
    }
}

/// One page of discovery results.
#[derive(Clone, PartialEq, Debug)]
pub struct DiscoverPage {
    pub results: Vec<Candidate>,
    pub total_pages: u32,
}

pub trait CandidateSource: Send + Sync {
    fn discover(
        &self,
        filter: &DiscoverFilter,
        page: u32,
    ) -> impl Future<Output = Result<DiscoverPage, FetchError>> + Send;

    fn detail(
        &self,
        id: CandidateId,
        language: &str,
    ) -> impl Future<Output = Result<CandidateDetail, FetchError>> + Send;

    fn videos(
        &self,
        id: CandidateId,
        language: &str,
    ) -> impl Future<Output = Result<Vec<Video>, FetchError>> + Send;

    fn genres(&self, language: &str) -> impl Future<Output = Result<Vec<Genre>, FetchError>> + Send;
}

/// The first YouTube trailer or teaser.
pub fn select_trailer(videos: &[Video]) -> Option<Trailer> {
    videos
        .iter()
        .find(|v| v.site == "YouTube" && (v.kind == "Trailer" || v.kind == "Teaser"))
        .map(|v| Trailer { key: v.key.clone() })
}

/// Looks up a trailer. Any failure means there is no trailer.
pub async fn find_trailer<S: CandidateSource>(
    source: &S,
    id: CandidateId,
    language: &str,
) -> Option<Trailer> {
    match source.videos(id, language).await {
        Ok(videos) => select_trailer(&videos),
        Err(e) => {
            log::warn!("No trailer for {id}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(site: &str, kind: &str, key: &str) -> Video {
        Video {
            key: key.to_string(),
            site: site.to_string(),
            kind: kind.to_string(),
        }
    }

    #[test]
    fn test_select_trailer() {
        let videos = vec![
            video("Vimeo", "Trailer", "a"),
            video("YouTube", "Featurette", "b"),
            video("YouTube", "Teaser", "c"),
            video("YouTube", "Trailer", "d"),
        ];
        assert_eq!(select_trailer(&videos).unwrap().key, "c");
    }

    #[test]
    fn test_select_trailer_none() {
        assert_eq!(select_trailer(&[]), None);
        assert_eq!(select_trailer(&[video("YouTube", "Clip", "x")]), None);
    }

    #[test]
    fn test_retryable() {
        assert!(!FetchError::MissingCredential.is_retryable());
        assert!(FetchError::RateLimited.is_retryable());
        assert!(FetchError::Status(503).is_retryable());
        assert!(!FetchError::Status(401).is_retryable());
        assert!(!FetchError::Parse("x".to_string()).is_retryable());
    }

    #[test]
    fn test_filter_from_prefs() {
        let prefs = Preferences::default();
        let filter = DiscoverFilter::from(&prefs);
        assert_eq!(filter.region, "GB");
        assert_eq!(filter.provider_ids, vec![8, 9]);
        assert_eq!(filter.min_vote_count, 50);
    }
}
