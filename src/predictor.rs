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
use std::sync::Arc;

use itertools::Itertools;

use crate::config::PredictorConfig;
use crate::expand::FileSetExpander;
use crate::ledger::PredictionLedger;
use crate::observe::{EventSink, NoopEventSink, PredictionEvent};
use crate::provider::{CompactionMode, LevelMetricsProvider};
use crate::refine::ResidualScoreLoop;
use crate::score::{CandidateReason, ScoreEvaluator};

/// Phase of the running prediction. Returns to `Idle` before
/// [`Predictor::predict_compaction_files`] returns; exposed for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictorState {
    Idle,
    Scanning,
    Expanding(usize),
    Refining(usize),
    Recording,
}

/// Estimates which files the engine's compaction scheduler is likely to pick
/// next, from a read-only snapshot of level metrics. Advisory only: it never
/// mutates engine state and its output is not required to match the real
/// picker.
///
/// The ledger and denylist are the only state that survives across calls.
/// Neither is synchronized; callers serialize access externally.
pub struct Predictor {
    config: PredictorConfig,
    ledger: PredictionLedger,
    /// Files a consumer reported as mispredicted. Treated like
    /// `being_compacted` files from then on: never seeded, never expanded
    /// into.
    denylist: BTreeSet<u64>,
    sink: Arc<dyn EventSink>,
    state: PredictorState,
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl Predictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self::with_event_sink(config, Arc::new(NoopEventSink))
    }

    pub fn with_event_sink(config: PredictorConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            ledger: PredictionLedger::new(),
            denylist: BTreeSet::new(),
            sink,
            state: PredictorState::Idle,
        }
    }

    /// Predicts the file set of the next compaction round over `version`.
    ///
    /// The snapshot must stay unchanged for the duration of the call; two
    /// calls against the same snapshot return the same set. Files flagged
    /// `being_compacted` never appear in the result.
    pub fn predict_compaction_files<P: LevelMetricsProvider + ?Sized>(
        &mut self,
        version: &P,
    ) -> BTreeSet<u64> {
        let denylist = self.denylist.clone();
        let sink = self.sink.clone();
        let evaluator = ScoreEvaluator::new(version, &self.config);
        let expander = FileSetExpander::new(version, &denylist, sink.as_ref());
        let score_loop = ResidualScoreLoop::new(version, &self.config, sink.as_ref());

        self.state = PredictorState::Scanning;
        let candidates = evaluator.candidate_levels();
        sink.emit(PredictionEvent::CandidateLevels {
            levels: candidates.iter().map(|c| c.level).collect_vec(),
        });
        if candidates.is_empty() {
            self.state = PredictorState::Idle;
            return BTreeSet::new();
        }
        if candidates
            .iter()
            .any(|c| c.reason == CandidateReason::L0Backpressure)
        {
            sink.emit(PredictionEvent::L0Backpressure {
                l1_score: version.score(1),
                l1_file_count: version.file_count(1),
            });
        }

        let mut result = BTreeSet::new();

        // L0 is never clean-cut (its files may mutually overlap); an
        // overloaded L0 instead predicts the L1 files that would receive the
        // flush.
        if evaluator.is_overloaded(0) {
            self.state = PredictorState::Expanding(0);
            result.extend(expander.l0_target_files());
        }

        let mode = version.compaction_mode();
        let max_batch_bytes = match version.max_batch_bytes() {
            0 => self.config.max_batch_bytes,
            budget => budget,
        };
        for candidate in candidates.iter().filter(|c| c.level >= 1) {
            let level = candidate.level;
            // a level whose eligible files were all predicted through an
            // earlier rule has nothing left to contribute
            let fully_covered = version
                .files(level)
                .iter()
                .filter(|f| !f.being_compacted && !denylist.contains(&f.file_id))
                .all(|f| result.contains(&f.file_id));
            if fully_covered {
                continue;
            }
            self.state = PredictorState::Expanding(level);
            let expansion = match mode {
                CompactionMode::CleanCut => expander.select_seed_and_expand(level),
                CompactionMode::RoundRobin => expander.select_batch(level, max_batch_bytes),
            };
            if expansion.is_empty() {
                continue;
            }
            result.extend(expansion.file_ids());
            // refinement seeds unbudgeted clean-cut expansions into the same
            // level; in round-robin mode that would grow the batch past its
            // byte cap, so the accepted prefix stands as-is
            if mode == CompactionMode::CleanCut {
                self.state = PredictorState::Refining(level);
                result = score_loop.refine(level, result, &expander);
            }
        }

        self.state = PredictorState::Recording;
        self.ledger.record(result.iter().copied());
        sink.emit(PredictionEvent::Recorded {
            files: result.len(),
        });
        self.state = PredictorState::Idle;
        result
    }

    /// Engine feedback: these files were actually compacted. Their ledger
    /// entries (and any stale denylist marks) are dropped; unknown ids are
    /// ignored.
    pub fn remove_compacted_files(&mut self, compacted: &BTreeSet<u64>) {
        self.ledger.retire(compacted);
        for id in compacted {
            self.denylist.remove(id);
        }
    }

    /// Consumer feedback: these predictions were wrong. The files leave the
    /// ledger and are excluded from future predictions.
    pub fn remove_incorrect_predicted_files(&mut self, incorrect: &BTreeSet<u64>) {
        self.ledger.retire(incorrect);
        self.denylist.extend(incorrect.iter().copied());
    }

    /// Files currently tracked by the ledger.
    pub fn snapshot(&self) -> BTreeSet<u64> {
        self.ledger.snapshot()
    }

    /// Evicts ledger entries that reached the configured occurrence ceiling.
    /// Never invoked implicitly; integrators decide whether to run it after
    /// each round.
    pub fn prune(&mut self) {
        self.ledger.prune(self.config.prune_ceiling);
    }

    pub fn ledger(&self) -> &PredictionLedger {
        &self.ledger
    }

    pub fn state(&self) -> PredictorState {
        self.state
    }
}
