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

use std::collections::VecDeque;

use crate::session::phase::Phase;
use crate::session::phase::Verdict;
use crate::types::candidate::CandidateId;
use crate::types::user::User;

/// Decisions older than this are forgotten and can no longer be undone.
pub const HISTORY_LIMIT: usize = 200;

#[derive(Clone, PartialEq, Debug)]
pub struct Decision {
    pub user: User,
    pub verdict: Verdict,
    pub candidate: CandidateId,
    /// The user's cursor before the decision was made.
    pub prior_index: usize,
    pub phase: Phase,
}

/// Bounded decision log, newest first.
#[derive(Clone, Default, Debug)]
pub struct History {
    entries: VecDeque<Decision>,
}

impl History {
    pub fn record(&mut self, decision: Decision) {
        self.entries.push_front(decision);
        self.entries.truncate(HISTORY_LIMIT);
    }

    fn latest_index(&self, user: User, phase: Phase) -> Option<usize> {
        self.entries
            .iter()
            .position(|d| d.user == user && d.phase == phase)
    }

    /// Removes and returns the newest decision `user` made in `phase`.
    pub fn take_latest(&mut self, user: User, phase: Phase) -> Option<Decision> {
        let index = self.latest_index(user, phase)?;
        self.entries.remove(index)
    }

    pub fn has_latest(&self, user: User, phase: Phase) -> bool {
        self.latest_index(user, phase).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Decision> {
        self.entries.iter()
    }
}
