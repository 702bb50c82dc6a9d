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

use std::fmt::Display;
use std::fmt::Formatter;

use serde::Serialize;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Welcome,
    PreDeal,
    Idle,
    Round1,
    Swap,
    Round2,
    NoAgreed,
    ReviewIntro,
    Review1,
    ReviewSwap,
    Review2,
    StartOver,
    Final,
    Winner,
}

impl Phase {
    /// Rounds where users decide on the cohort.
    pub fn is_swiping(self) -> bool {
        matches!(self, Phase::Round1 | Phase::Round2)
    }

    /// Rounds where users decide on the agreement set.
    pub fn is_review(self) -> bool {
        matches!(self, Phase::Review1 | Phase::Review2)
    }

    pub fn is_round(self) -> bool {
        self.is_swiping() || self.is_review()
    }

    /// Phases in which a freshly built cohort starts round one.
    pub fn accepts_deal(self) -> bool {
        matches!(
            self,
            Phase::PreDeal | Phase::Idle | Phase::NoAgreed | Phase::Round1 | Phase::Round2
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Welcome => "welcome",
            Phase::PreDeal => "preDeal",
            Phase::Idle => "idle",
            Phase::Round1 => "round1",
            Phase::Swap => "swap",
            Phase::Round2 => "round2",
            Phase::NoAgreed => "noAgreed",
            Phase::ReviewIntro => "reviewIntro",
            Phase::Review1 => "review1",
            Phase::ReviewSwap => "reviewSwap",
            Phase::Review2 => "review2",
            Phase::StartOver => "startOver",
            Phase::Final => "final",
            Phase::Winner => "winner",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Like,
    Pass,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Like => "like",
            Verdict::Pass => "pass",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_kinds() {
        assert!(Phase::Round1.is_swiping());
        assert!(!Phase::Round1.is_review());
        assert!(Phase::Review2.is_review());
        assert!(Phase::Review2.is_round());
        assert!(!Phase::Swap.is_round());
        assert!(!Phase::Winner.is_round());
    }

    #[test]
    fn test_accepts_deal() {
        assert!(Phase::PreDeal.accepts_deal());
        assert!(Phase::Idle.accepts_deal());
        assert!(Phase::NoAgreed.accepts_deal());
        assert!(!Phase::Welcome.accepts_deal());
        assert!(!Phase::Final.accepts_deal());
        assert!(!Phase::StartOver.accepts_deal());
    }

    #[test]
    fn test_display() {
        assert_eq!(Phase::ReviewIntro.to_string(), "reviewIntro");
        assert_eq!(
            serde_json::to_string(&Phase::NoAgreed).unwrap(),
            "\"noAgreed\""
        );
    }
}
