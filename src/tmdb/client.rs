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

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::Fallible;
use crate::tmdb::CandidateSource;
use crate::tmdb::DiscoverFilter;
use crate::tmdb::DiscoverPage;
use crate::tmdb::FetchError;
use crate::tmdb::schema::parse_detail;
use crate::tmdb::schema::parse_discover;
use crate::tmdb::schema::parse_genres;
use crate::tmdb::schema::parse_videos;
use crate::types::candidate::CandidateDetail;
use crate::types::candidate::CandidateId;
use crate::types::candidate::Genre;
use crate::types::candidate::Video;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A TMDB v3 client authenticated with a v4 bearer token.
#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl TmdbClient {
    pub fn new(base_url: &str, token: Option<String>) -> Fallible<Self> {
        let builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.unwrap_or_default(),
        })
    }

    /// The same client with a different token.
    pub fn with_token(&self, token: Option<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: token.unwrap_or_default(),
        }
    }

    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        if !self.has_token() {
            return Err(FetchError::MissingCredential);
        }
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

impl CandidateSource for TmdbClient {
    async fn discover(
        &self,
        filter: &DiscoverFilter,
        page: u32,
    ) -> Result<DiscoverPage, FetchError> {
        let mut query = vec![
            ("watch_region", filter.region.clone()),
            ("include_adult", "false".to_string()),
            ("sort_by", filter.sort_by.as_str().to_string()),
            ("page", page.to_string()),
            (
                "with_watch_monetization_types",
                filter.monetization.as_str().to_string(),
            ),
            ("vote_count.gte", filter.min_vote_count.to_string()),
        ];
        if !filter.provider_ids.is_empty() {
            let providers: Vec<String> = filter
                .provider_ids
                .iter()
                .map(|id| id.to_string())
                .collect();
            query.push(("with_watch_providers", providers.join("|")));
        }
        let body = self.get("/discover/movie", &query).await?;
        parse_discover(&body)
    }

    async fn detail(&self, id: CandidateId, language: &str) -> Result<CandidateDetail, FetchError> {
        let path = format!("/movie/{id}");
        let body = self
            .get(&path, &[("language", language.to_string())])
            .await?;
        parse_detail(&body, id)
    }

    async fn videos(&self, id: CandidateId, language: &str) -> Result<Vec<Video>, FetchError> {
        let path = format!("/movie/{id}/videos");
        let body = self
            .get(&path, &[("language", language.to_string())])
            .await?;
        parse_videos(&body)
    }

    async fn genres(&self, language: &str) -> Result<Vec<Genre>, FetchError> {
        let body = self
            .get("/genre/movie/list", &[("language", language.to_string())])
            .await?;
        parse_genres(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::FakeConfig;
    use crate::helper::TEST_TOKEN;
    use crate::helper::movie;
    use crate::helper::spawn_fake_tmdb;
    use crate::prefs::Preferences;
    use crate::tmdb::find_trailer;

    #[tokio::test]
    async fn test_discover_sends_filter() -> Fallible<()> {
        let movies = vec![movie(1, "One"), movie(2, "Two")];
        let fake = spawn_fake_tmdb(FakeConfig::with_movies(movies)).await?;
        let client = TmdbClient::new(&fake.base_url, Some(TEST_TOKEN.to_string()))?;
        let filter = DiscoverFilter::from(&Preferences::default());
        let page = client.discover(&filter, 1).await?;
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].title, "One");
        let queries = fake.discover_queries();
        assert_eq!(queries.len(), 1);
        let q = &queries[0];
        assert_eq!(q.get("watch_region").map(String::as_str), Some("GB"));
        assert_eq!(
            q.get("with_watch_providers").map(String::as_str),
            Some("8|9")
        );
        assert_eq!(
            q.get("with_watch_monetization_types").map(String::as_str),
            Some("flatrate")
        );
        assert_eq!(q.get("vote_count.gte").map(String::as_str), Some("50"));
        assert_eq!(q.get("include_adult").map(String::as_str), Some("false"));
        assert_eq!(q.get("page").map(String::as_str), Some("1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() -> Fallible<()> {
        let fake = spawn_fake_tmdb(FakeConfig::with_movies(vec![movie(1, "One")])).await?;
        let client = TmdbClient::new(&fake.base_url, None)?;
        let filter = DiscoverFilter::from(&Preferences::default());
        let result = client.discover(&filter, 1).await;
        assert_eq!(result.unwrap_err(), FetchError::MissingCredential);
        assert!(fake.discover_queries().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_token_is_status_error() -> Fallible<()> {
        let fake = spawn_fake_tmdb(FakeConfig::with_movies(vec![movie(1, "One")])).await?;
        let client = TmdbClient::new(&fake.base_url, Some("wrong".to_string()))?;
        let result = client.genres("en-GB").await;
        assert_eq!(result.unwrap_err(), FetchError::Status(401));
        Ok(())
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported() -> Fallible<()> {
        let config = FakeConfig {
            rate_limited_requests: 1,
            ..FakeConfig::with_movies(vec![movie(1, "One")])
        };
        let fake = spawn_fake_tmdb(config).await?;
        let client = TmdbClient::new(&fake.base_url, Some(TEST_TOKEN.to_string()))?;
        let filter = DiscoverFilter::from(&Preferences::default());
        assert_eq!(
            client.discover(&filter, 1).await.unwrap_err(),
            FetchError::RateLimited
        );
        assert!(client.discover(&filter, 1).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_detail_trailer_and_genres() -> Fallible<()> {
        let fake = spawn_fake_tmdb(FakeConfig::with_movies(vec![movie(7, "Seven")])).await?;
        let client = TmdbClient::new(&fake.base_url, Some(TEST_TOKEN.to_string()))?;
        let detail = client.detail(CandidateId::new(7), "en-GB").await?;
        assert_eq!(detail.title, "Seven");
        let trailer = find_trailer(&client, CandidateId::new(7), "en-GB").await;
        assert_eq!(trailer.unwrap().key, "trailer-7");
        let missing = client.detail(CandidateId::new(8), "en-GB").await;
        assert_eq!(missing.unwrap_err(), FetchError::Status(404));
        let trailer = find_trailer(&client, CandidateId::new(8), "en-GB").await;
        assert_eq!(trailer, None);
        let genres = client.genres("en-GB").await?;
        assert!(genres.iter().any(|g| g.name == "Action"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() -> Fallible<()> {
        let port = portpicker::pick_unused_port().unwrap();
        let client = TmdbClient::new(
            &format!("http://127.0.0.1:{port}"),
            Some(TEST_TOKEN.to_string()),
        )?;
        let result = client.genres("en-GB").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
        Ok(())
    }
}
