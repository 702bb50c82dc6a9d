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

use crate::cmd::deal::open_database;
use crate::error::Fallible;
use crate::error::fail;
use crate::prefs::Preferences;
use crate::store::ConfigStore;
use crate::store::PREFS_KEY;
use crate::store::SettingsPatch;
use crate::store::TOKEN_ENV;

pub fn set_token(db_path: &Path, token: Option<String>, clear: bool) -> Fallible<()> {
    let db = open_database(db_path)?;
    let message = update_token(&db, token, clear)?;
    println!("{message}");
    Ok(())
}

fn update_token(
    store: &dyn ConfigStore,
    token: Option<String>,
    clear: bool,
) -> Fallible<&'static str> {
    let patch = match (token, clear) {
        (_, true) => Some(None),
        (Some(token), false) if !token.trim().is_empty() => Some(Some(token.trim().to_string())),
        _ => return fail("provide a token, or --clear to forget the saved one."),
    };
    let cleared = patch == Some(None);
    store.save(SettingsPatch {
        token: patch,
        ..SettingsPatch::default()
    })?;
    if std::env::var(TOKEN_ENV).is_ok() {
        log::warn!("{TOKEN_ENV} is set and takes precedence over the saved token.");
    }
    Ok(if cleared {
        "Token cleared."
    } else {
        "Token saved."
    })
}

/// Optionally imports preferences from a TOML file, then prints the
/// preferences in effect as JSON.
pub fn print_prefs(db_path: &Path, file: Option<&Path>) -> Fallible<()> {
    let db = open_database(db_path)?;
    let prefs = import_prefs(&db, file)?;
    if let Some(saved_at) = db.last_saved(PREFS_KEY)? {
        log::debug!("Preferences last saved at {saved_at}.");
    }
    let json: String = serde_json::to_string_pretty(&prefs)?;
    println!("{json}");
    Ok(())
}

fn import_prefs(store: &dyn ConfigStore, file: Option<&Path>) -> Fallible<Preferences> {
    if let Some(file) = file {
        if !file.exists() {
            return fail("preferences file does not exist.");
        }
        let prefs = Preferences::from_toml_file(file)?;
        log::debug!("Importing preferences from {}", file.display());
        store.save(SettingsPatch {
            prefs: Some(prefs),
            ..SettingsPatch::default()
        })?;
    }
    Ok(store.load()?.prefs)
}
