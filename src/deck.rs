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

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::tmdb::CandidateSource;
use crate::tmdb::DiscoverFilter;
use crate::tmdb::DiscoverPage;
use crate::tmdb::FetchError;
use crate::types::candidate::Candidate;
use crate::types::candidate::CandidateId;

/// Ids that must never be dealt again in this process.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct ExclusionSet {
    ids: HashSet<CandidateId>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.ids.contains(&id)
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = CandidateId>) {
        self.ids.extend(ids);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// How rate-limited page requests are retried.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Retries per page before giving up.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound of the random delay added to `base_delay`.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(800),
            jitter: Duration::from_millis(600),
        }
    }
}

impl RetryPolicy {
    fn delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base_delay;
        }
        let extra = rand::rng().random_range(0..=jitter_ms);
        self.base_delay + Duration::from_millis(extra)
    }
}

/// Collects up to `target_size` unique, non-excluded candidates from
/// consecutive discovery pages. Returns fewer when the source runs out.
pub async fn build_deck<S: CandidateSource>(
    source: &S,
    target_size: usize,
    exclusions: &ExclusionSet,
    filter: &DiscoverFilter,
    retry: &RetryPolicy,
) -> Result<Vec<Candidate>, FetchError> {
    let mut collected: Vec<Candidate> = Vec::with_capacity(target_size);
    let mut seen: HashSet<CandidateId> = HashSet::new();
    let mut page: u32 = 1;
    while collected.len() < target_size {
        let DiscoverPage {
            results,
            total_pages,
        } = fetch_page(source, filter, page, retry).await?;
        let returned = results.len();
        for candidate in results {
            if exclusions.contains(candidate.id) {
                continue;
            }
            if seen.insert(candidate.id) {
                collected.push(candidate);
            }
            if collected.len() >= target_size {
                break;
            }
        }
        log::debug!(
            "Page {page}/{total_pages}: {returned} results, {} collected.",
            collected.len()
        );
        if collected.len() >= target_size || returned == 0 || page >= total_pages {
            break;
        }
        page += 1;
    }
    collected.truncate(target_size);
    Ok(collected)
}

async fn fetch_page<S: CandidateSource>(
    source: &S,
    filter: &DiscoverFilter,
    page: u32,
    retry: &RetryPolicy,
) -> Result<DiscoverPage, FetchError> {
    let mut retries = 0;
    loop {
        match source.discover(filter, page).await {
            Err(FetchError::RateLimited) if retries < retry.max_retries => {
                retries += 1;
                let delay = retry.delay();
                log::debug!(
                    "Rate limited on page {page}, retry {retries}/{} in {}ms.",
                    retry.max_retries,
                    delay.as_millis()
                );
                sleep(delay).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::prefs::Preferences;
    use crate::types::candidate::CandidateDetail;
    use crate::types::candidate::Genre;
    use crate::types::candidate::Video;

    /// Serves scripted pages; ids repeat across pages to exercise dedup.
    struct ScriptedSource {
        pages: Vec<Vec<u64>>,
        total_pages: u32,
        /// Discover responses to answer with 429 before serving.
        rate_limits: Mutex<u32>,
        requests: Mutex<Vec<u32>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Vec<u64>>) -> Self {
            let total_pages = pages.len() as u32;
            Self {
                pages,
                total_pages,
                rate_limits: Mutex::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requested_pages(&self) -> Vec<u32> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn candidate(id: u64) -> Candidate {
        Candidate {
            id: CandidateId::new(id),
            title: format!("Movie {id}"),
            synopsis: None,
            year: None,
            poster_url: None,
            genre_ids: Vec::new(),
        }
    }

    impl CandidateSource for ScriptedSource {
        async fn discover(
            &self,
            _filter: &DiscoverFilter,
            page: u32,
        ) -> Result<DiscoverPage, FetchError> {
            self.requests.lock().unwrap().push(page);
            {
                let mut limits = self.rate_limits.lock().unwrap();
                if *limits > 0 {
                    *limits -= 1;
                    return Err(FetchError::RateLimited);
                }
            }
            let ids = self
                .pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default();
            Ok(DiscoverPage {
                results: ids.into_iter().map(candidate).collect(),
                total_pages: self.total_pages,
            })
        }

        async fn detail(
            &self,
            id: CandidateId,
            _language: &str,
        ) -> Result<CandidateDetail, FetchError> {
            Ok(CandidateDetail::from_candidate(&candidate(id.get())))
        }

        async fn videos(
            &self,
            _id: CandidateId,
            _language: &str,
        ) -> Result<Vec<Video>, FetchError> {
            Ok(Vec::new())
        }

        async fn genres(&self, _language: &str) -> Result<Vec<Genre>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn no_wait() -> RetryPolicy {
        RetryPolicy {
            max_retries: 4,
            base_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    fn filter() -> DiscoverFilter {
        DiscoverFilter::from(&Preferences::default())
    }

    fn ids(deck: &[Candidate]) -> Vec<u64> {
        deck.iter().map(|c| c.id.get()).collect()
    }

    #[tokio::test]
    async fn test_stops_at_target() {
        let source = ScriptedSource::new(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
        let deck = build_deck(&source, 4, &ExclusionSet::new(), &filter(), &no_wait())
            .await
            .unwrap();
        assert_eq!(ids(&deck), vec![1, 2, 3, 4]);
        assert_eq!(source.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_skips_excluded_and_duplicates() {
        let source = ScriptedSource::new(vec![vec![1, 2, 3], vec![3, 2, 4, 5]]);
        let mut exclusions = ExclusionSet::new();
        exclusions.extend([CandidateId::new(2)]);
        let deck = build_deck(&source, 10, &exclusions, &filter(), &no_wait())
            .await
            .unwrap();
        assert_eq!(ids(&deck), vec![1, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_exhausted_source_returns_fewer() {
        let source = ScriptedSource::new(vec![vec![1, 2], vec![3]]);
        let deck = build_deck(&source, 10, &ExclusionSet::new(), &filter(), &no_wait())
            .await
            .unwrap();
        assert_eq!(ids(&deck), vec![1, 2, 3]);
        assert_eq!(source.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_stops_on_empty_page() {
        let mut source = ScriptedSource::new(vec![vec![1], vec![], vec![2]]);
        source.total_pages = 50;
        let deck = build_deck(&source, 10, &ExclusionSet::new(), &filter(), &no_wait())
            .await
            .unwrap();
        assert_eq!(ids(&deck), vec![1]);
        assert_eq!(source.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_retries_rate_limited_page() {
        let source = ScriptedSource::new(vec![vec![1, 2, 3]]);
        *source.rate_limits.lock().unwrap() = 3;
        let deck = build_deck(&source, 3, &ExclusionSet::new(), &filter(), &no_wait())
            .await
            .unwrap();
        assert_eq!(ids(&deck), vec![1, 2, 3]);
        assert_eq!(source.requested_pages(), vec![1, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_bound() {
        let source = ScriptedSource::new(vec![vec![1, 2, 3]]);
        *source.rate_limits.lock().unwrap() = 100;
        let result = build_deck(&source, 3, &ExclusionSet::new(), &filter(), &no_wait()).await;
        assert_eq!(result.unwrap_err(), FetchError::RateLimited);
        assert_eq!(source.requested_pages().len(), 5);
    }

    #[tokio::test]
    async fn test_never_excluded_never_duplicate_never_oversized() {
        let pages: Vec<Vec<u64>> = (0..6)
            .map(|p| (0..8).map(|i| ((p * 5 + i) % 23) as u64).collect())
            .collect();
        for target in [1, 5, 12, 40] {
            let source = ScriptedSource::new(pages.clone());
            let mut exclusions = ExclusionSet::new();
            exclusions.extend([0, 7, 14].map(CandidateId::new));
            let deck = build_deck(&source, target, &exclusions, &filter(), &no_wait())
                .await
                .unwrap();
            assert!(deck.len() <= target);
            let unique: HashSet<CandidateId> = deck.iter().map(|c| c.id).collect();
            assert_eq!(unique.len(), deck.len());
            assert!(deck.iter().all(|c| !exclusions.contains(c.id)));
        }
    }

    #[test]
    fn test_retry_delay_within_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.delay();
            assert!(delay >= Duration::from_millis(800));
            assert!(delay <= Duration::from_millis(1400));
        }
    }
}
