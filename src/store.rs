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

use std::env;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Fallible;
use crate::prefs::Names;
use crate::prefs::Preferences;

pub const NAMES_KEY: &str = "names";
pub const PREFS_KEY: &str = "prefs";
pub const TOKEN_KEY: &str = "token";

/// Environment variable that overrides the stored TMDB token.
pub const TOKEN_ENV: &str = "TMDB_TOKEN";

/// Everything persisted between runs.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct Settings {
    pub names: Names,
    pub prefs: Preferences,
    pub token: Option<String>,
}

/// A partial update. `None` fields are left untouched; `token: Some(None)`
/// clears the stored token.
#[derive(Default)]
pub struct SettingsPatch {
    pub names: Option<Names>,
    pub prefs: Option<Preferences>,
    pub token: Option<Option<String>>,
}

/// Key-value persistence for settings. Values are JSON blobs.
pub trait ConfigStore: Send + Sync {
    fn read(&self, key: &str) -> Fallible<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Fallible<()>;

    fn remove(&self, key: &str) -> Fallible<()>;

    /// Loads all settings. Missing or malformed keys fall back to their
    /// defaults.
    fn load(&self) -> Fallible<Settings> {
        let names: Names = decode_or_default(self, NAMES_KEY)?;
        let prefs: Preferences = decode_or_default(self, PREFS_KEY)?;
        let token: Option<String> = decode_or_default(self, TOKEN_KEY)?;
        let token = token.filter(|t| !t.trim().is_empty());
        Ok(Settings {
            names,
            prefs: prefs.normalized(),
            token,
        })
    }

    fn save(&self, patch: SettingsPatch) -> Fallible<()> {
        if let Some(names) = patch.names {
            encode(self, NAMES_KEY, &names)?;
        }
        if let Some(prefs) = patch.prefs {
            encode(self, PREFS_KEY, &prefs.normalized())?;
        }
        match patch.token {
            Some(Some(token)) => encode(self, TOKEN_KEY, &token)?,
            Some(None) => self.remove(TOKEN_KEY)?,
            None => {}
        }
        Ok(())
    }
}

fn decode_or_default<S, T>(store: &S, key: &str) -> Fallible<T>
where
    S: ConfigStore + ?Sized,
    T: DeserializeOwned + Default,
{
    let Some(raw) = store.read(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            log::warn!("Ignoring malformed setting '{key}': {e}");
            Ok(T::default())
        }
    }
}

fn encode<S, T>(store: &S, key: &str, value: &T) -> Fallible<()>
where
    S: ConfigStore + ?Sized,
    T: Serialize,
{
    let json = serde_json::to_string(value)?;
    store.write(key, &json)
}

/// The token in effect: the environment variable wins over the stored one.
pub fn effective_token(stored: Option<String>) -> Option<String> {
    match env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Some(token),
        _ => stored,
    }
}
