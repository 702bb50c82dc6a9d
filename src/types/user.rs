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
use std::ops::Index;
use std::ops::IndexMut;

/// One of the two seats in a session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum User {
    You,
    Partner,
}

impl User {
    pub fn other(self) -> User {
        match self {
            User::You => User::Partner,
            User::Partner => User::You,
        }
    }

    /// Fallback label when no display name was given.
    pub fn placeholder(self) -> &'static str {
        match self {
            User::You => "First person",
            User::Partner => "Second person",
        }
    }
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            User::You => write!(f, "You"),
            User::Partner => write!(f, "Partner"),
        }
    }
}

/// A value held once for each user.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct PerUser<T> {
    you: T,
    partner: T,
}

impl<T> PerUser<T> {
    pub fn new(you: T, partner: T) -> Self {
        Self { you, partner }
    }
}

impl<T> Index<User> for PerUser<T> {
    type Output = T;

    fn index(&self, user: User) -> &T {
        match user {
            User::You => &self.you,
            User::Partner => &self.partner,
        }
    }
}

impl<T> IndexMut<User> for PerUser<T> {
    fn index_mut(&mut self, user: User) -> &mut T {
        match user {
            User::You => &mut self.you,
            User::Partner => &mut self.partner,
        }
    }
}
