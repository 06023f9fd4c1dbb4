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

use std::collections::BTreeSet;

use crate::config::PredictorConfig;
use crate::expand::FileSetExpander;
use crate::observe::{EventSink, PredictionEvent};
use crate::provider::LevelMetricsProvider;

/// Models "the picker keeps pulling in files while the level is still over
/// budget" without re-querying the engine: the level score is scaled down
/// linearly by the bytes already picked, and further clean-cut expansions are
/// seeded from the largest remaining file.
pub struct ResidualScoreLoop<'a, P: LevelMetricsProvider + ?Sized> {
    provider: &'a P,
    config: &'a PredictorConfig,
    sink: &'a dyn EventSink,
}

impl<'a, P: LevelMetricsProvider + ?Sized> ResidualScoreLoop<'a, P> {
    pub fn new(provider: &'a P, config: &'a PredictorConfig, sink: &'a dyn EventSink) -> Self {
        Self {
            provider,
            config,
            sink,
        }
    }

    /// Linear scaling approximation of the level score after hypothetically
    /// removing `removed_ids`. The engine's real score formula is not
    /// observable from outside, so `score * (1 - removed/total)` stands in
    /// for it. Removing more bytes than the level holds clamps to `0.0`
    /// instead of underflowing.
    pub fn estimate_score_after_removal(&self, level: usize, removed_ids: &BTreeSet<u64>) -> f64 {
        let score = self.provider.score(level);
        if removed_ids.is_empty() {
            return score;
        }
        let total = self.provider.byte_size(level);
        if total == 0 {
            return score;
        }
        let removed: u64 = self
            .provider
            .files(level)
            .iter()
            .filter(|file| removed_ids.contains(&file.file_id))
            .map(|file| file.file_size)
            .sum();
        if removed > total {
            return 0.0;
        }
        score * (1.0 - removed as f64 / total as f64)
    }

    /// Seeds additional clean-cut expansions while the estimated residual
    /// score stays above the overload threshold, up to the configured round
    /// cap. Returns everything picked for the level, next-level targets
    /// included.
    pub fn refine(
        &self,
        level: usize,
        initial: BTreeSet<u64>,
        expander: &FileSetExpander<'_, P>,
    ) -> BTreeSet<u64> {
        let mut accumulated = initial;
        let mut residual = self.estimate_score_after_removal(level, &accumulated);
        for round in 0..self.config.max_refine_rounds {
            if residual <= self.config.direct_overload_score {
                break;
            }
            let additional = expander.next_seed_expansion(level, &accumulated);
            if additional.is_empty() {
                break;
            }
            accumulated.extend(additional.file_ids());
            residual = self.estimate_score_after_removal(level, &accumulated);
            self.sink.emit(PredictionEvent::RefineRound {
                level,
                round,
                estimated_score: residual,
            });
        }
        accumulated
    }
}
