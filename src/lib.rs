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

//! Advisory compaction-set predictor for leveled LSM-tree engines.
//!
//! Given a read-only snapshot of per-level statistics and file metadata (a
//! [`LevelMetricsProvider`]), the [`Predictor`] estimates which files the
//! engine's real compaction scheduler is likely to pick in its next round:
//! level-score triage, clean-cut overlap expansion, the L0 flush special
//! case, cross-level cascading, an optional round-robin batch mode, and a
//! bounded feedback ledger over past predictions. It performs no merge, no
//! write, and no scheduling; consumers use the output for cache pre-warming,
//! admission control, or diagnostics.

mod config;
mod expand;
mod key_range;
mod ledger;
mod observe;
mod predictor;
mod provider;
mod refine;
mod score;
#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{PredictorConfig, PredictorConfigBuilder};
pub use expand::{Expansion, FileSetExpander};
pub use key_range::KeyRange;
pub use ledger::PredictionLedger;
pub use observe::{EventSink, NoopEventSink, PredictionEvent, TracingEventSink};
pub use predictor::{Predictor, PredictorState};
pub use provider::{
    CompactionMode, FileDescriptor, LevelMetricsProvider, LevelState, VersionSnapshot,
};
pub use refine::ResidualScoreLoop;
pub use score::{CandidateReason, LevelCandidate, ScoreEvaluator};
