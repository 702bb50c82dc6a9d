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
use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Fallible;

pub const MIN_TARGET_COUNT: usize = 4;
pub const MAX_TARGET_COUNT: usize = 200;

/// Streaming providers offered in the settings form, by TMDB provider id.
pub const PROVIDERS: [(u32, &str); 4] = [
    (8, "Netflix"),
    (9, "Prime Video"),
    (337, "Disney+"),
    (350, "Apple TV+"),
];

/// Which ways of watching a title count as available.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Monetization {
    #[default]
    #[serde(rename = "flatrate")]
    Streaming,
    #[serde(rename = "flatrate|rent|buy")]
    StreamingRentBuy,
    #[serde(rename = "rent|buy")]
    RentBuy,
}

impl Monetization {
    pub const ALL: [Monetization; 3] = [
        Monetization::Streaming,
        Monetization::StreamingRentBuy,
        Monetization::RentBuy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Monetization::Streaming => "flatrate",
            Monetization::StreamingRentBuy => "flatrate|rent|buy",
            Monetization::RentBuy => "rent|buy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Monetization::Streaming => "Streaming only",
            Monetization::StreamingRentBuy => "Streaming + Rent/Buy",
            Monetization::RentBuy => "Rent/Buy only",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "popularity.desc")]
    Popularity,
    #[serde(rename = "vote_average.desc")]
    Rating,
    #[serde(rename = "primary_release_date.desc")]
    Newest,
}

impl SortOrder {
    pub const ALL: [SortOrder; 3] = [SortOrder::Popularity, SortOrder::Rating, SortOrder::Newest];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Popularity => "popularity.desc",
            SortOrder::Rating => "vote_average.desc",
            SortOrder::Newest => "primary_release_date.desc",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Popularity => "Popularity (desc)",
            SortOrder::Rating => "Rating (desc)",
            SortOrder::Newest => "Newest releases",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == s)
    }
}

/// Filter and deck settings. Fields missing from a stored blob or a TOML
/// file take their defaults.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// ISO 3166-1 region the providers are looked up in.
    pub region: String,
    pub monetization: Monetization,
    pub provider_ids: Vec<u32>,
    pub min_vote_count: u32,
    /// Language for titles, synopses and genre names.
    pub language: String,
    pub sort_by: SortOrder,
    /// Number of titles dealt into a fresh deck.
    pub target_count: usize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            region: "GB".to_string(),
            monetization: Monetization::default(),
            provider_ids: vec![8, 9],
            min_vote_count: 50,
            language: "en-GB".to_string(),
            sort_by: SortOrder::default(),
            target_count: 10,
        }
    }
}

impl Preferences {
    /// Upper-cases the region, clamps the deck size, and restores defaults
    /// for blank strings.
    pub fn normalized(mut self) -> Self {
        let defaults = Preferences::default();
        self.region = self.region.trim().to_uppercase();
        if self.region.is_empty() {
            self.region = defaults.region;
        }
        self.language = self.language.trim().to_string();
        if self.language.is_empty() {
            self.language = defaults.language;
        }
        self.target_count = clamp_target(self.target_count);
        let mut seen = HashSet::new();
        self.provider_ids.retain(|id| seen.insert(*id));
        self
    }

    pub fn from_toml(text: &str) -> Fallible<Self> {
        let prefs: Preferences = toml::from_str(text)?;
        Ok(prefs.normalized())
    }

    pub fn from_toml_file(path: &Path) -> Fallible<Self> {
        let text = read_to_string(path)?;
        Self::from_toml(&text)
    }
}

pub fn clamp_target(count: usize) -> usize {
    count.clamp(MIN_TARGET_COUNT, MAX_TARGET_COUNT)
}

/// Display names of the two users.
#[derive(Clone, Default, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Names {
    pub you: String,
    pub partner: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.region, "GB");
        assert_eq!(prefs.monetization.as_str(), "flatrate");
        assert_eq!(prefs.provider_ids, vec![8, 9]);
        assert_eq!(prefs.min_vote_count, 50);
        assert_eq!(prefs.language, "en-GB");
        assert_eq!(prefs.sort_by.as_str(), "popularity.desc");
        assert_eq!(prefs.target_count, 10);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let prefs: Preferences =
            serde_json::from_str(r#"{"region":"us","monetization":"rent|buy"}"#).unwrap();
        let prefs = prefs.normalized();
        assert_eq!(prefs.region, "US");
        assert_eq!(prefs.monetization, Monetization::RentBuy);
        assert_eq!(prefs.target_count, 10);
        assert_eq!(prefs.language, "en-GB");
    }

    #[test]
    fn test_normalized_clamps_target() {
        let small = Preferences {
            target_count: 1,
            ..Preferences::default()
        };
        assert_eq!(small.normalized().target_count, MIN_TARGET_COUNT);
        let large = Preferences {
            target_count: 5000,
            ..Preferences::default()
        };
        assert_eq!(large.normalized().target_count, MAX_TARGET_COUNT);
    }

    #[test]
    fn test_from_toml() {
        let text = r#"
region = "de"
provider_ids = [337]
sort_by = "vote_average.desc"
target_count = 30
"#;
        let prefs = Preferences::from_toml(text).unwrap();
        assert_eq!(prefs.region, "DE");
        assert_eq!(prefs.provider_ids, vec![337]);
        assert_eq!(prefs.sort_by, SortOrder::Rating);
        assert_eq!(prefs.target_count, 30);
        assert_eq!(prefs.min_vote_count, 50);
    }

    #[test]
    fn test_from_toml_rejects_unknown_sort() {
        let result = Preferences::from_toml(r#"sort_by = "random""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_round_trips() {
        for m in Monetization::ALL {
            assert_eq!(Monetization::parse(m.as_str()), Some(m));
        }
        for o in SortOrder::ALL {
            assert_eq!(SortOrder::parse(o.as_str()), Some(o));
        }
        assert_eq!(SortOrder::parse("title.asc"), None);
    }
}
