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

//! The two-person swipe and match state machine.
//!
//! A [`Session`] holds everything about the current deal: the cohort, each
//! user's progress and verdicts, the agreement set and the review outcome.
//! It never performs I/O. Every change goes through [`Session::apply`] (or
//! the by-value [`reduce`]), and asynchronous callers guard their results
//! with a [`Ticket`].

pub mod history;
pub mod phase;

use std::collections::HashSet;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::deck::ExclusionSet;
use crate::prefs::MAX_TARGET_COUNT;
use crate::prefs::clamp_target;
use crate::session::history::Decision;
use crate::session::history::History;
use crate::session::phase::Phase;
use crate::session::phase::Verdict;
use crate::types::candidate::Candidate;
use crate::types::candidate::CandidateId;
use crate::types::user::PerUser;
use crate::types::user::User;

/// How much a widened re-deal grows the target deck size.
pub const WIDEN_STEP: usize = 10;

#[derive(Clone, Debug)]
pub enum Intent {
    /// Both display names entered on the welcome screen.
    Begin { you: String, partner: String },
    /// A freshly built cohort.
    Dealt(Vec<Candidate>),
    Act(Verdict),
    Undo,
    Handoff,
    StartReview,
    Widen,
    StartOver,
    Pick,
    Back,
    Restart,
}

#[must_use]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Transition {
    Applied,
    Ignored,
}

/// Captured before an asynchronous request, checked after it completes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Ticket {
    generation: u64,
    candidate: Option<CandidateId>,
}

#[derive(Clone, Debug)]
pub struct Session {
    phase: Phase,
    names: PerUser<String>,
    active: User,
    cohort: Vec<Candidate>,
    cursor: PerUser<usize>,
    liked: PerUser<HashSet<CandidateId>>,
    passed: PerUser<HashSet<CandidateId>>,
    approved: PerUser<HashSet<CandidateId>>,
    agreed: Vec<CandidateId>,
    confirmed: Vec<CandidateId>,
    winner: Option<CandidateId>,
    history: History,
    exclusions: ExclusionSet,
    target_size: usize,
    default_target: usize,
    generation: u64,
    rng: StdRng,
}

impl Session {
    pub fn new(target_size: usize, rng: StdRng) -> Self {
        let target_size = clamp_target(target_size);
        Self {
            phase: Phase::Welcome,
            names: PerUser::default(),
            active: User::You,
            cohort: Vec::new(),
            cursor: PerUser::default(),
            liked: PerUser::default(),
            passed: PerUser::default(),
            approved: PerUser::default(),
            agreed: Vec::new(),
            confirmed: Vec::new(),
            winner: None,
            history: History::default(),
            exclusions: ExclusionSet::new(),
            target_size,
            default_target: target_size,
            generation: 0,
            rng,
        }
    }

    pub fn seeded(target_size: usize, seed: u64) -> Self {
        Self::new(target_size, StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng(target_size: usize) -> Self {
        Self::new(target_size, StdRng::from_os_rng())
    }

    pub fn apply(&mut self, intent: Intent) -> Transition {
        let before = self.phase;
        let transition = match intent {
            Intent::Begin { you, partner } => self.begin(you, partner),
            Intent::Dealt(cohort) => self.dealt(cohort),
            Intent::Act(verdict) => self.act(verdict),
            Intent::Undo => self.undo(),
            Intent::Handoff => self.handoff(),
            Intent::StartReview => self.start_review(),
            Intent::Widen => self.widen(),
            Intent::StartOver => self.start_over(),
            Intent::Pick => self.pick(),
            Intent::Back => self.back(),
            Intent::Restart => self.restart(),
        };
        if self.phase != before {
            let (after, active) = (self.phase, self.active);
            log::debug!("Phase {before} -> {after} (active: {active}).");
        }
        transition
    }

    fn begin(&mut self, you: String, partner: String) -> Transition {
        if self.phase != Phase::Welcome {
            return Transition::Ignored;
        }
        let you = you.trim();
        let partner = partner.trim();
        if you.is_empty() || partner.is_empty() {
            return Transition::Ignored;
        }
        self.names = PerUser::new(you.to_string(), partner.to_string());
        self.active = if self.rng.random_bool(0.5) {
            User::You
        } else {
            User::Partner
        };
        self.phase = Phase::PreDeal;
        Transition::Applied
    }

    fn dealt(&mut self, cohort: Vec<Candidate>) -> Transition {
        if !self.phase.accepts_deal() || cohort.is_empty() {
            return Transition::Ignored;
        }
        self.cohort = cohort;
        self.clear_deal();
        self.generation += 1;
        self.phase = Phase::Round1;
        Transition::Applied
    }

    /// Forgets all progress on the current cohort.
    fn clear_deal(&mut self) {
        self.cursor = PerUser::default();
        self.liked = PerUser::default();
        self.passed = PerUser::default();
        self.approved = PerUser::default();
        self.agreed.clear();
        self.confirmed.clear();
        self.winner = None;
        self.history.clear();
    }

    /// Ids of the list the active round walks through.
    fn round_ids(&self) -> Vec<CandidateId> {
        if self.phase.is_swiping() {
            self.cohort.iter().map(|c| c.id).collect()
        } else if self.phase.is_review() {
            self.agreed.clone()
        } else {
            Vec::new()
        }
    }

    fn current_id(&self) -> Option<CandidateId> {
        let cursor = self.cursor[self.active];
        if self.phase.is_swiping() {
            self.cohort.get(cursor).map(|c| c.id)
        } else if self.phase.is_review() {
            self.agreed.get(cursor).copied()
        } else {
            None
        }
    }

    fn act(&mut self, verdict: Verdict) -> Transition {
        let Some(id) = self.current_id() else {
            return Transition::Ignored;
        };
        let user = self.active;
        let phase = self.phase;
        let prior_index = self.cursor[user];
        log::debug!("{user} says {} to {id} in {phase}.", verdict.as_str());
        self.history.record(Decision {
            user,
            verdict,
            candidate: id,
            prior_index,
            phase,
        });
        if self.phase.is_swiping() {
            match verdict {
                Verdict::Like => {
                    self.liked[user].insert(id);
                }
                Verdict::Pass => {
                    self.passed[user].insert(id);
                }
            }
            if self.phase == Phase::Round2
                && verdict == Verdict::Like
                && self.liked[user.other()].contains(&id)
                && !self.agreed.contains(&id)
            {
                self.agreed.push(id);
            }
        } else if verdict == Verdict::Like {
            self.approved[user].insert(id);
        }
        self.cursor[user] = prior_index + 1;
        if self.cursor[user] >= self.round_ids().len() {
            self.finish_round();
        }
        Transition::Applied
    }

    fn finish_round(&mut self) {
        self.phase = match self.phase {
            Phase::Round1 => Phase::Swap,
            Phase::Round2 if self.agreed.is_empty() => {
                let rejected: Vec<CandidateId> = self
                    .cohort
                    .iter()
                    .map(|c| c.id)
                    .filter(|id| {
                        !self.liked[User::You].contains(id)
                            && !self.liked[User::Partner].contains(id)
                    })
                    .collect();
                log::debug!("No agreement; excluding {} titles.", rejected.len());
                self.exclusions.extend(rejected);
                Phase::NoAgreed
            }
            Phase::Round2 => Phase::ReviewIntro,
            Phase::Review1 => Phase::ReviewSwap,
            Phase::Review2 => {
                self.confirmed = self
                    .agreed
                    .iter()
                    .copied()
                    .filter(|id| {
                        self.approved[User::You].contains(id)
                            && self.approved[User::Partner].contains(id)
                    })
                    .collect();
                if self.confirmed.is_empty() {
                    Phase::StartOver
                } else {
                    Phase::Final
                }
            }
            other => other,
        };
    }

    fn undo(&mut self) -> Transition {
        if !self.phase.is_round() {
            return Transition::Ignored;
        }
        let user = self.active;
        let Some(decision) = self.history.take_latest(user, self.phase) else {
            return Transition::Ignored;
        };
        let id = decision.candidate;
        if self.phase.is_swiping() {
            match decision.verdict {
                Verdict::Like => {
                    self.liked[user].remove(&id);
                }
                Verdict::Pass => {
                    self.passed[user].remove(&id);
                }
            }
            if self.phase == Phase::Round2
                && decision.verdict == Verdict::Like
                && self.liked[user.other()].contains(&id)
            {
                self.agreed.retain(|agreed| *agreed != id);
            }
        } else if decision.verdict == Verdict::Like {
            self.approved[user].remove(&id);
        }
        self.cursor[user] = decision.prior_index;
        Transition::Applied
    }

    /// Passes the device to the other user.
    fn handoff(&mut self) -> Transition {
        let next = match self.phase {
            Phase::Swap => Phase::Round2,
            Phase::ReviewSwap => Phase::Review2,
            _ => return Transition::Ignored,
        };
        self.active = self.active.other();
        self.cursor[self.active] = 0;
        self.phase = next;
        Transition::Applied
    }

    fn start_review(&mut self) -> Transition {
        if self.phase != Phase::ReviewIntro {
            return Transition::Ignored;
        }
        self.approved = PerUser::default();
        self.cursor = PerUser::default();
        self.phase = Phase::Review1;
        Transition::Applied
    }

    fn widen(&mut self) -> Transition {
        if self.phase != Phase::NoAgreed {
            return Transition::Ignored;
        }
        self.widen_target();
        Transition::Applied
    }

    fn widen_target(&mut self) {
        self.target_size = (self.target_size + WIDEN_STEP).min(MAX_TARGET_COUNT);
    }

    fn start_over(&mut self) -> Transition {
        if self.phase != Phase::StartOver {
            return Transition::Ignored;
        }
        let mut seen: Vec<CandidateId> = self.cohort.iter().map(|c| c.id).collect();
        for user in [User::You, User::Partner] {
            seen.extend(self.liked[user].iter().copied());
            seen.extend(self.passed[user].iter().copied());
        }
        seen.extend(self.agreed.iter().copied());
        self.exclusions.extend(seen);
        self.widen_target();
        self.generation += 1;
        self.phase = Phase::Idle;
        Transition::Applied
    }

    fn pick(&mut self) -> Transition {
        if self.phase != Phase::Final || self.confirmed.is_empty() {
            return Transition::Ignored;
        }
        let index = self.rng.random_range(0..self.confirmed.len());
        self.winner = Some(self.confirmed[index]);
        self.phase = Phase::Winner;
        Transition::Applied
    }

    fn back(&mut self) -> Transition {
        if self.phase != Phase::Winner {
            return Transition::Ignored;
        }
        self.winner = None;
        self.phase = Phase::Final;
        Transition::Applied
    }

    /// Returns to the welcome screen, keeping only the display names.
    fn restart(&mut self) -> Transition {
        self.cohort.clear();
        self.clear_deal();
        self.exclusions.clear();
        self.target_size = self.default_target;
        self.active = User::You;
        self.generation += 1;
        self.phase = Phase::Welcome;
        Transition::Applied
    }

    /// Sets the saved target deck size, which restarts return to.
    pub fn retarget(&mut self, target_size: usize) {
        let target_size = clamp_target(target_size);
        self.target_size = target_size;
        self.default_target = target_size;
    }

    /// Prefills the welcome form with remembered names.
    pub fn prefill_names(&mut self, you: &str, partner: &str) {
        if self.phase == Phase::Welcome {
            self.names = PerUser::new(you.trim().to_string(), partner.trim().to_string());
        }
    }

    pub fn deal_ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
            candidate: None,
        }
    }

    pub fn lookup_ticket(&self, id: CandidateId) -> Ticket {
        Ticket {
            generation: self.generation,
            candidate: Some(id),
        }
    }

    /// The candidate currently on screen, if any.
    pub fn focus(&self) -> Option<CandidateId> {
        match self.phase {
            Phase::Winner => self.winner,
            _ => self.current_id(),
        }
    }

    pub fn is_live(&self, ticket: Ticket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        match ticket.candidate {
            None => true,
            Some(id) => self.focus() == Some(id),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active(&self) -> User {
        self.active
    }

    /// The raw display name, possibly blank.
    pub fn raw_name(&self, user: User) -> &str {
        &self.names[user]
    }

    pub fn name(&self, user: User) -> &str {
        let name = self.names[user].as_str();
        if name.is_empty() {
            user.placeholder()
        } else {
            name
        }
    }

    #[cfg(test)]
    pub fn cohort(&self) -> &[Candidate] {
        &self.cohort
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.cohort.iter().find(|c| c.id == id)
    }

    pub fn current(&self) -> Option<&Candidate> {
        self.current_id().and_then(|id| self.candidate(id))
    }

    /// `(position, total)` of the active user in the current round.
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor[self.active], self.round_ids().len())
    }

    #[cfg(test)]
    pub fn cursor(&self, user: User) -> usize {
        self.cursor[user]
    }

    #[cfg(test)]
    pub fn liked(&self, user: User) -> &HashSet<CandidateId> {
        &self.liked[user]
    }

    #[cfg(test)]
    pub fn passed(&self, user: User) -> &HashSet<CandidateId> {
        &self.passed[user]
    }

    #[cfg(test)]
    pub fn approved(&self, user: User) -> &HashSet<CandidateId> {
        &self.approved[user]
    }

    pub fn agreed(&self) -> &[CandidateId] {
        &self.agreed
    }

    #[cfg(test)]
    pub fn confirmed(&self) -> &[CandidateId] {
        &self.confirmed
    }

    pub fn confirmed_candidates(&self) -> Vec<&Candidate> {
        self.confirmed
            .iter()
            .filter_map(|id| self.candidate(*id))
            .collect()
    }

    pub fn winner(&self) -> Option<&Candidate> {
        self.winner.and_then(|id| self.candidate(id))
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    #[cfg(test)]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Whether the active user has a decision to take back in this phase.
    pub fn can_undo(&self) -> bool {
        self.phase.is_round() && self.history.has_latest(self.active, self.phase)
    }
}

/// Applies `intent` to `session` and returns the result.
#[cfg(test)]
pub fn reduce(mut session: Session, intent: Intent) -> Session {
    let _ = session.apply(intent);
    session
}
