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

use maud::Markup;
use maud::html;

use crate::app::state::MutableState;
use crate::session::Session;
use crate::session::phase::Phase;
use crate::types::candidate::Candidate;
use crate::types::candidate::CandidateDetail;
use crate::types::candidate::Trailer;
use crate::types::candidate::genre_names;
use crate::types::candidate::trailer_url;
use crate::types::user::User;

pub fn render(mutable: &MutableState) -> Markup {
    let session = &mutable.session;
    let body = match session.phase() {
        Phase::Welcome => welcome(mutable),
        Phase::PreDeal => html! {
            h1 { (session.name(session.active())) " goes first" }
            p { "A deck of " (session.target_size()) " titles will be dealt." }
            (controls(&[("Start", "Deal the deck")]))
        },
        Phase::Idle => html! {
            h1 { "Fresh deck" }
            p { "Titles from earlier decks will not come back." }
            (controls(&[("Start", "Deal the deck")]))
        },
        Phase::Round1 | Phase::Round2 => swipe_screen(mutable),
        Phase::Swap | Phase::ReviewSwap => html! {
            h1 { "Pass the device to " (session.name(session.active().other())) }
            (controls(&[("Handoff", "Ready")]))
        },
        Phase::NoAgreed => html! {
            h1 { "No matches this time" }
            p { "Titles you both passed on will not be offered again." }
            (controls(&[
                ("Widen", "Widen and re-deal"),
                ("Redeal", "Re-deal now"),
            ]))
        },
        Phase::ReviewIntro => html! {
            h1 { "You agreed on " (session.agreed().len()) }
            ul.titles {
                @for id in session.agreed() {
                    @if let Some(candidate) = session.candidate(*id) {
                        li { (title_line(candidate)) }
                    }
                }
            }
            p { "Now each of you watches the trailers and keeps the ones you still want." }
            (controls(&[("StartReview", "Start review")]))
        },
        Phase::Review1 | Phase::Review2 => review_screen(mutable),
        Phase::StartOver => html! {
            h1 { "Nothing survived the review" }
            p { "Start over with a wider deck of titles neither of you has seen." }
            (controls(&[("StartOver", "Start over")]))
        },
        Phase::Final => final_screen(mutable),
        Phase::Winner => winner_screen(mutable),
    };
    html! {
        div.root {
            (banners(mutable))
            div.screen data-phase=(session.phase().as_str()) {
                (body)
            }
            @if session.phase() != Phase::Welcome {
                div.footer {
                    (controls(&[("Restart", "Restart")]))
                }
            }
        }
    }
}

fn banners(mutable: &MutableState) -> Markup {
    let phase = mutable.session.phase();
    html! {
        @if let Some(error) = &mutable.error {
            div.error {
                p { (error.message) }
                @if error.retryable && phase.accepts_deal() {
                    (controls(&[("Retry", "Try again")]))
                }
            }
        }
        @if let Some(notice) = &mutable.notice {
            div.notice { p { (notice) } }
        }
    }
}

/// A form of submit buttons, each posting its action.
fn controls(buttons: &[(&str, &str)]) -> Markup {
    html! {
        form action="/" method="post" {
            @for (action, label) in buttons {
                button type="submit" name="action" value=(action) { (label) }
            }
        }
    }
}

fn decision_controls(session: &Session, like: &str, pass: &str) -> Markup {
    html! {
        form action="/" method="post" {
            @if session.can_undo() {
                button id="undo" type="submit" name="action" value="Undo" { "Undo" }
            } @else {
                button id="undo" type="submit" name="action" value="Undo" disabled { "Undo" }
            }
            div.spacer {}
            button id="pass" type="submit" name="action" value="Pass" { (pass) }
            button id="like" type="submit" name="action" value="Like" { (like) }
        }
    }
}

fn welcome(mutable: &MutableState) -> Markup {
    let session = &mutable.session;
    html! {
        h1 { "Who is watching?" }
        @if !mutable.client.has_token() {
            p.warning {
                "No TMDB token configured. Add one in the "
                a href="/settings" { "settings" }
                "."
            }
        }
        form action="/" method="post" {
            label {
                (User::You.placeholder())
                input type="text" name="you" value=(session.raw_name(User::You));
            }
            label {
                (User::Partner.placeholder())
                input type="text" name="partner" value=(session.raw_name(User::Partner));
            }
            button type="submit" name="action" value="Begin" { "Begin" }
            button type="submit" name="action" value="ClearNames" { "Clear names" }
        }
    }
}

fn title_line(candidate: &Candidate) -> Markup {
    html! {
        (candidate.title)
        @if let Some(year) = candidate.year {
            " (" (year) ")"
        }
    }
}

fn progress(session: &Session) -> Markup {
    let (position, total) = session.progress();
    html! {
        div.progress { (position + 1) " / " (total) }
    }
}

fn swipe_screen(mutable: &MutableState) -> Markup {
    let session = &mutable.session;
    let Some(candidate) = session.current() else {
        return html! { p { "Nothing left to decide." } };
    };
    let genres = genre_names(&candidate.genre_ids, mutable.genres());
    html! {
        div.card {
            div.header {
                h1 { (session.name(session.active())) }
                (progress(session))
            }
            @if let Some(poster) = &candidate.poster_url {
                img.poster src=(poster) alt=(candidate.title);
            }
            h2.title { (title_line(candidate)) }
            @if !genres.is_empty() {
                p.genres { (genres.join(", ")) }
            }
            @if let Some(synopsis) = &candidate.synopsis {
                p.synopsis { (synopsis) }
            }
            div.controls {
                (decision_controls(session, "Like", "Pass"))
            }
        }
    }
}

fn detail_card(detail: &CandidateDetail) -> Markup {
    let genres: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
    html! {
        @if let Some(poster) = &detail.poster_url {
            img.poster src=(poster) alt=(detail.title);
        }
        h2.title {
            (detail.title)
            @if let Some(year) = detail.year {
                " (" (year) ")"
            }
        }
        @if let Some(tagline) = &detail.tagline {
            p.tagline { (tagline) }
        }
        p.meta {
            @if let Some(minutes) = detail.runtime_minutes {
                (minutes) " min"
            }
            @if !genres.is_empty() {
                " " (genres.join(", "))
            }
        }
        @if let Some(synopsis) = &detail.synopsis {
            p.synopsis { (synopsis) }
        }
    }
}

fn review_screen(mutable: &MutableState) -> Markup {
    let session = &mutable.session;
    let Some(candidate) = session.current() else {
        return html! { p { "Nothing left to review." } };
    };
    let lookup = mutable.lookups.get(&candidate.id);
    html! {
        div.card {
            div.header {
                h1 { (session.name(session.active())) " reviews" }
                (progress(session))
            }
            @match lookup {
                Some(lookup) => {
                    (detail_card(&lookup.detail))
                    (links(candidate, lookup.trailer.as_ref()))
                }
                None => {
                    (detail_card(&CandidateDetail::from_candidate(candidate)))
                }
            }
            div.controls {
                (decision_controls(session, "Keep", "Drop"))
            }
        }
    }
}

/// Links to the trailer, or to a trailer search when TMDB lists none, and
/// to the TMDB page.
fn links(candidate: &Candidate, trailer: Option<&Trailer>) -> Markup {
    let label = match trailer {
        Some(_) => "Play trailer",
        None => "Search for a trailer",
    };
    html! {
        p.links {
            a.trailer href=(trailer_url(&candidate.title, trailer)) target="_blank" { (label) }
            a.tmdb href=(candidate.tmdb_url()) target="_blank" { "View on TMDB" }
        }
    }
}

/// A confirmed title with whatever detail has been fetched for it.
fn confirmed_card(mutable: &MutableState, candidate: &Candidate) -> Markup {
    let lookup = mutable.lookups.get(&candidate.id);
    let detail = match lookup {
        Some(lookup) => lookup.detail.clone(),
        None => CandidateDetail::from_candidate(candidate),
    };
    let trailer = lookup.and_then(|l| l.trailer.as_ref());
    html! {
        div.card {
            (detail_card(&detail))
            (links(candidate, trailer))
        }
    }
}

fn final_screen(mutable: &MutableState) -> Markup {
    let confirmed = mutable.session.confirmed_candidates();
    html! {
        h1 { "Both of you want to watch" }
        p { (confirmed.len()) " agreed picks" }
        @for candidate in confirmed {
            (confirmed_card(mutable, candidate))
        }
        (controls(&[("Pick", "Pick one at random")]))
    }
}

fn winner_screen(mutable: &MutableState) -> Markup {
    let Some(winner) = mutable.session.winner() else {
        return html! { p { "No winner yet." } };
    };
    html! {
        h1 { "Tonight you are watching" }
        (confirmed_card(mutable, winner))
        (controls(&[("Back", "Back to the list")]))
    }
}
