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

use crate::config::PredictorConfig;
use crate::provider::LevelMetricsProvider;

/// Why a level made it into the candidate list. When several rules fire for
/// the same level the strongest one wins, in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateReason {
    /// The level's own score is above the overload threshold.
    DirectOverload,
    /// An overloaded upper level pressures this one through intermediate
    /// levels that are all nearly full.
    CascadingOverload,
    /// L1 only: a backlogged L0 is about to spill into it.
    L0Backpressure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelCandidate {
    pub level: usize,
    pub reason: CandidateReason,
}

/// Triage over level scores: decides which levels are worth expanding this
/// round. Pure reads of the snapshot, no state.
pub struct ScoreEvaluator<'a, P: LevelMetricsProvider + ?Sized> {
    provider: &'a P,
    config: &'a PredictorConfig,
}

impl<'a, P: LevelMetricsProvider + ?Sized> ScoreEvaluator<'a, P> {
    pub fn new(provider: &'a P, config: &'a PredictorConfig) -> Self {
        Self { provider, config }
    }

    pub fn is_overloaded(&self, level: usize) -> bool {
        self.provider.score(level) > self.config.direct_overload_score
    }

    /// Candidate levels of this round, ascending. The bottommost level is
    /// never a candidate (it has nowhere to push files).
    pub fn candidate_levels(&self) -> Vec<LevelCandidate> {
        let num_levels = self.provider.num_levels();
        if num_levels == 0 {
            return vec![];
        }
        let mut candidates = vec![];
        for level in 0..num_levels - 1 {
            if self.is_overloaded(level) {
                candidates.push(LevelCandidate {
                    level,
                    reason: CandidateReason::DirectOverload,
                });
            } else if self.has_cascading_overload(level) {
                candidates.push(LevelCandidate {
                    level,
                    reason: CandidateReason::CascadingOverload,
                });
            } else if level == 1 && self.check_l0_backpressure_on_l1() {
                candidates.push(LevelCandidate {
                    level,
                    reason: CandidateReason::L0Backpressure,
                });
            }
        }
        candidates
    }

    /// True if some upper level `u < level` is overloaded and every level in
    /// `(u, level]` scores above the cascade threshold.
    fn has_cascading_overload(&self, level: usize) -> bool {
        for upper in 0..level {
            if !self.is_overloaded(upper) {
                continue;
            }
            let blocked = (upper + 1..=level)
                .any(|m| self.provider.score(m) <= self.config.cascade_score);
            if !blocked {
                return true;
            }
        }
        false
    }

    /// A backlogged L0 will soon push a flush into L1 even when L1's own
    /// score has not crossed the threshold yet: L1 is nearly full by score or
    /// file count, or it is badly oversized relative to L2.
    pub fn check_l0_backpressure_on_l1(&self) -> bool {
        if self.provider.num_levels() < 2 {
            return false;
        }
        if !self.is_overloaded(0) || self.provider.score(1) >= self.config.direct_overload_score {
            return false;
        }
        if self.provider.score(1) >= self.config.backpressure_score {
            return true;
        }
        if self.provider.file_count(1) >= self.config.backpressure_file_count {
            return true;
        }
        let l2_size = if self.provider.num_levels() > 2 {
            self.provider.byte_size(2)
        } else {
            0
        };
        l2_size > 0 && self.provider.byte_size(1) > l2_size.saturating_mul(2)
    }
}
