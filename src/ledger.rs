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

use std::collections::{BTreeMap, BTreeSet};

/// Per-file occurrence bookkeeping across prediction rounds.
///
/// Not internally synchronized: the owning predictor is expected to be driven
/// from a single scheduler thread, or behind an external lock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PredictionLedger {
    counters: BTreeMap<u64, u32>,
}

impl PredictionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence for every id of this round's prediction.
    pub fn record<I: IntoIterator<Item = u64>>(&mut self, ids: I) {
        for id in ids {
            *self.counters.entry(id).or_insert(0) += 1;
        }
    }

    /// Unconditionally drops the given ids. Unknown ids are a no-op.
    pub fn retire<'a, I: IntoIterator<Item = &'a u64>>(&mut self, ids: I) {
        for id in ids {
            self.counters.remove(id);
        }
    }

    /// Evicts entries whose counter reached `ceiling`: files predicted over
    /// and over without the engine ever compacting them stop occupying
    /// memory, and a later re-prediction starts a fresh count.
    pub fn prune(&mut self, ceiling: u32) {
        self.counters.retain(|_, count| *count < ceiling);
    }

    /// Current ledger keys, for diagnostics and metrics export.
    pub fn snapshot(&self) -> BTreeSet<u64> {
        self.counters.keys().copied().collect()
    }

    pub fn occurrence_count(&self, id: u64) -> u32 {
        self.counters.get(&id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
