// Copyright 2025 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cmp::Ordering;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An inclusive user-key interval `[left, right]`.
///
/// The comparator over user keys belongs to the engine, so every operation
/// that needs an order takes it as a parameter rather than assuming raw byte
/// order.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct KeyRange {
    pub left: Bytes,
    pub right: Bytes,
}

impl KeyRange {
    pub fn new(left: Bytes, right: Bytes) -> Self {
        Self { left, right }
    }

    /// Closed-interval intersection test: `[a,b]` and `[c,d]` overlap iff
    /// NOT (`b < c` OR `d < a`).
    pub fn overlaps<C>(&self, other: &Self, cmp: &C) -> bool
    where
        C: Fn(&[u8], &[u8]) -> Ordering + ?Sized,
    {
        cmp(&self.right, &other.left) != Ordering::Less
            && cmp(&other.right, &self.left) != Ordering::Less
    }

    /// Widens `self` to cover `other`.
    pub fn extend<C>(&mut self, other: &Self, cmp: &C)
    where
        C: Fn(&[u8], &[u8]) -> Ordering + ?Sized,
    {
        if cmp(&other.left, &self.left) == Ordering::Less {
            self.left = other.left.clone();
        }
        if cmp(&other.right, &self.right) == Ordering::Greater {
            self.right = other.right.clone();
        }
    }
}
