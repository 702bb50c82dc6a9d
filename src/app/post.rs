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
use axum::response::Redirect;
use serde::Deserialize;

use crate::app::state::FailedFetch;
use crate::app::state::ServerState;
use crate::deck::build_deck;
use crate::error::Fallible;
use crate::prefs::Names;
use crate::session::Intent;
use crate::session::Transition;
use crate::session::phase::Phase;
use crate::session::phase::Verdict;
use crate::store::SettingsPatch;
use crate::tmdb::DiscoverFilter;
use crate::types::user::User;

#[derive(Clone, Copy, Debug, Deserialize)]
enum Action {
    Begin,
    Start,
    Like,
    Pass,
    Undo,
    Handoff,
    StartReview,
    Widen,
    Redeal,
    StartOver,
    Pick,
    Back,
    Restart,
    Retry,
    ClearNames,
}

#[derive(Deserialize)]
pub struct FormData {
    action: Action,
    #[serde(default)]
    you: String,
    #[serde(default)]
    partner: String,
}

pub async fn post_handler(
    State(state): State<ServerState>,
    Form(form): Form<FormData>,
) -> Redirect {
    match action_handler(&state, form).await {
        Ok(_) => {}
        Err(e) => {
            log::error!("{e}");
        }
    }
    Redirect::to("/")
}

async fn action_handler(state: &ServerState, form: FormData) -> Fallible<()> {
    let action = form.action;
    let wants_deal = {
        let mut mutable = state.lock();
        let phase = mutable.session.phase();
        let intent = match action {
            Action::Begin => Some(Intent::Begin {
                you: form.you,
                partner: form.partner,
            }),
            Action::Like => Some(Intent::Act(Verdict::Like)),
            Action::Pass => Some(Intent::Act(Verdict::Pass)),
            Action::Undo => Some(Intent::Undo),
            Action::Handoff => Some(Intent::Handoff),
            Action::StartReview => Some(Intent::StartReview),
            Action::Widen => Some(Intent::Widen),
            Action::StartOver => Some(Intent::StartOver),
            Action::Pick => Some(Intent::Pick),
            Action::Back => Some(Intent::Back),
            Action::Restart => Some(Intent::Restart),
            Action::Start | Action::Redeal | Action::Retry | Action::ClearNames => None,
        };
        let applied = match intent {
            Some(intent) => mutable.session.apply(intent) == Transition::Applied,
            None => true,
        };
        if !applied {
            log::debug!("Ignoring {action:?} in phase {phase}.");
            return Ok(());
        }
        match action {
            Action::Begin => {
                let names = Names {
                    you: mutable.session.raw_name(User::You).to_string(),
                    partner: mutable.session.raw_name(User::Partner).to_string(),
                };
                state.store.save(SettingsPatch {
                    names: Some(names.clone()),
                    ..SettingsPatch::default()
                })?;
                mutable.settings.names = names;
                false
            }
            Action::ClearNames => {
                if phase == Phase::Welcome {
                    mutable.session.prefill_names("", "");
                    state.store.save(SettingsPatch {
                        names: Some(Names::default()),
                        ..SettingsPatch::default()
                    })?;
                    mutable.settings.names = Names::default();
                }
                false
            }
            Action::Restart => {
                mutable.lookups.clear();
                mutable.error = None;
                mutable.notice = None;
                let names = mutable.settings.names.clone();
                mutable.session.prefill_names(&names.you, &names.partner);
                false
            }
            Action::Start => matches!(phase, Phase::PreDeal | Phase::Idle),
            Action::Redeal => phase == Phase::NoAgreed,
            Action::Retry => mutable.error.is_some() && phase.accepts_deal(),
            Action::Widen | Action::StartOver => true,
            _ => false,
        }
    };
    if wants_deal {
        deal(state).await;
    }
    Ok(())
}

/// Builds a fresh cohort with the saved preferences and hands it to the
/// session. Failures end up in the error banner.
pub async fn deal(state: &ServerState) {
    let (ticket, client, target, exclusions, filter) = {
        let mut mutable = state.lock();
        mutable.error = None;
        mutable.notice = None;
        let session = &mutable.session;
        (
            session.deal_ticket(),
            mutable.client.clone(),
            session.target_size(),
            session.exclusions().clone(),
            DiscoverFilter::from(&mutable.settings.prefs),
        )
    };
    log::debug!("Dealing {target} titles, {} excluded.", exclusions.len());
    let result = build_deck(&client, target, &exclusions, &filter, &state.retry).await;
    let mut mutable = state.lock();
    if !mutable.session.is_live(ticket) {
        log::debug!("Dropping stale deck.");
        return;
    }
    match result {
        Ok(cohort) => {
            let found = cohort.len();
            if found == 0 {
                let notice = "No titles match these settings. Try widening them.";
                mutable.notice = Some(notice.to_string());
                return;
            }
            if found < target {
                mutable.notice = Some(format!(
                    "Only {found} of {target} titles were available. Widen the settings for more."
                ));
            }
            mutable.lookups.clear();
            if mutable.session.apply(Intent::Dealt(cohort)) == Transition::Ignored {
                log::debug!("Deck arrived in phase {}.", mutable.session.phase());
            }
        }
        Err(e) => {
            log::warn!("Deal failed: {e}");
            mutable.error = Some(FailedFetch::from(&e));
        }
    }
}
