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

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::Redirect;
use maud::Markup;
use maud::html;

use crate::app::post::deal;
use crate::app::state::ServerState;
use crate::app::template::page_template;
use crate::error::Fallible;
use crate::prefs::Monetization;
use crate::prefs::PROVIDERS;
use crate::prefs::Preferences;
use crate::prefs::SortOrder;
use crate::store::SettingsPatch;
use crate::store::TOKEN_ENV;
use crate::store::effective_token;

/// What a submitted settings form changes.
#[derive(PartialEq, Debug)]
struct SettingsForm {
    prefs: Preferences,
    /// `None` keeps the stored token, `Some(None)` clears it.
    token: Option<Option<String>>,
}

/// Reads the form fields over `current`. Fields that are missing or fail to
/// parse keep their current value, except the provider checkboxes, where
/// none checked means any provider.
fn parse_settings(fields: &[(String, String)], current: &Preferences) -> SettingsForm {
    let mut prefs = current.clone();
    prefs.provider_ids.clear();
    let mut token = None;
    let mut clear_token = false;
    for (key, value) in fields {
        let value = value.trim();
        match key.as_str() {
            "region" => prefs.region = value.to_string(),
            "language" => prefs.language = value.to_string(),
            "monetization" => {
                if let Some(m) = Monetization::parse(value) {
                    prefs.monetization = m;
                }
            }
            "sort_by" => {
                if let Some(order) = SortOrder::parse(value) {
                    prefs.sort_by = order;
                }
            }
            "min_vote_count" => {
                if let Ok(n) = value.parse() {
                    prefs.min_vote_count = n;
                }
            }
            "target_count" => {
                if let Ok(n) = value.parse() {
                    prefs.target_count = n;
                }
            }
            "provider" => {
                if let Ok(id) = value.parse() {
                    prefs.provider_ids.push(id);
                }
            }
            "token" => {
                if !value.is_empty() {
                    token = Some(Some(value.to_string()));
                }
            }
            "clear_token" => clear_token = true,
            _ => log::debug!("Ignoring settings field '{key}'."),
        }
    }
    if clear_token {
        token = Some(None);
    }
    SettingsForm {
        prefs: prefs.normalized(),
        token,
    }
}

pub async fn settings_page(State(state): State<ServerState>) -> (StatusCode, Html<String>) {
    let mutable = state.lock();
    let stored_token = mutable.settings.token.is_some();
    let body = settings_form(&mutable.settings.prefs, stored_token);
    let html = page_template(body);
    (StatusCode::OK, Html(html.into_string()))
}

fn settings_form(prefs: &Preferences, stored_token: bool) -> Markup {
    html! {
        div.root {
            h1 { "Settings" }
            form.settings action="/settings" method="post" {
                fieldset {
                    legend { "TMDB" }
                    label {
                        "API read access token"
                        input type="password" name="token" autocomplete="off";
                    }
                    @if stored_token {
                        p { "A token is saved. Leave the field blank to keep it." }
                        label {
                            input type="checkbox" name="clear_token";
                            "Forget the saved token"
                        }
                    }
                    p.hint { "The " code { (TOKEN_ENV) } " environment variable takes precedence." }
                }
                fieldset {
                    legend { "Where to watch" }
                    label {
                        "Region"
                        input type="text" name="region" value=(prefs.region);
                    }
                    label {
                        "Availability"
                        select name="monetization" {
                            @for m in Monetization::ALL {
                                @if m == prefs.monetization {
                                    option value=(m.as_str()) selected { (m.label()) }
                                } @else {
                                    option value=(m.as_str()) { (m.label()) }
                                }
                            }
                        }
                    }
                    @for (id, name) in PROVIDERS {
                        label {
                            @if prefs.provider_ids.contains(&id) {
                                input type="checkbox" name="provider" value=(id) checked;
                            } @else {
                                input type="checkbox" name="provider" value=(id);
                            }
                            (name)
                        }
                    }
                }
                fieldset {
                    legend { "Deck" }
                    label {
                        "Minimum votes"
                        input type="number" name="min_vote_count" min="0" value=(prefs.min_vote_count);
                    }
                    label {
                        "Language"
                        input type="text" name="language" value=(prefs.language);
                    }
                    label {
                        "Sort by"
                        select name="sort_by" {
                            @for order in SortOrder::ALL {
                                @if order == prefs.sort_by {
                                    option value=(order.as_str()) selected { (order.label()) }
                                } @else {
                                    option value=(order.as_str()) { (order.label()) }
                                }
                            }
                        }
                    }
                    label {
                        "Titles per deck"
                        input type="number" name="target_count" value=(prefs.target_count);
                    }
                }
                input type="submit" value="Save";
            }
        }
    }
}

pub async fn settings_handler(
    State(state): State<ServerState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Redirect {
    match save_settings(&state, &fields).await {
        Ok(_) => {}
        Err(e) => {
            log::error!("{e}");
        }
    }
    Redirect::to("/")
}

async fn save_settings(state: &ServerState, fields: &[(String, String)]) -> Fallible<()> {
    let redeal = {
        let mut mutable = state.lock();
        let form = parse_settings(fields, &mutable.settings.prefs);
        state.store.save(SettingsPatch {
            names: None,
            prefs: Some(form.prefs),
            token: form.token,
        })?;
        mutable.settings = state.store.load()?;
        let token = effective_token(mutable.settings.token.clone());
        mutable.client = mutable.client.with_token(token);
        let target = mutable.settings.prefs.target_count;
        mutable.session.retarget(target);
        mutable.genres = None;
        mutable.lookups.clear();
        mutable.error = None;
        mutable.session.phase().is_swiping()
    };
    if redeal {
        log::debug!("Settings changed mid-round, re-dealing.");
        deal(state).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_full_form() {
        let form = parse_settings(
            &fields(&[
                ("token", ""),
                ("region", " us "),
                ("monetization", "rent|buy"),
                ("provider", "8"),
                ("provider", "337"),
                ("min_vote_count", "200"),
                ("language", "en-US"),
                ("sort_by", "vote_average.desc"),
                ("target_count", "30"),
            ]),
            &Preferences::default(),
        );
        assert_eq!(form.token, None);
        assert_eq!(form.prefs.region, "US");
        assert_eq!(form.prefs.monetization, Monetization::RentBuy);
        assert_eq!(form.prefs.provider_ids, vec![8, 337]);
        assert_eq!(form.prefs.min_vote_count, 200);
        assert_eq!(form.prefs.language, "en-US");
        assert_eq!(form.prefs.sort_by, SortOrder::Rating);
        assert_eq!(form.prefs.target_count, 30);
    }

    #[test]
    fn test_bad_values_keep_current() {
        let current = Preferences {
            min_vote_count: 75,
            ..Preferences::default()
        };
        let form = parse_settings(
            &fields(&[
                ("min_vote_count", "lots"),
                ("sort_by", "random"),
                ("target_count", "1000"),
            ]),
            &current,
        );
        assert_eq!(form.prefs.min_vote_count, 75);
        assert_eq!(form.prefs.sort_by, SortOrder::Popularity);
        assert_eq!(form.prefs.target_count, 200);
        assert!(form.prefs.provider_ids.is_empty());
    }

    #[test]
    fn test_token_fields() {
        let prefs = Preferences::default();
        let form = parse_settings(&fields(&[("token", " abc ")]), &prefs);
        assert_eq!(form.token, Some(Some("abc".to_string())));
        let form = parse_settings(&fields(&[("token", "abc"), ("clear_token", "on")]), &prefs);
        assert_eq!(form.token, Some(None));
    }
}
