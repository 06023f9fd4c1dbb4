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

use serde::{Deserialize, Serialize};

const DEFAULT_DIRECT_OVERLOAD_SCORE: f64 = 1.0;
const DEFAULT_CASCADE_SCORE: f64 = 0.8;
const DEFAULT_BACKPRESSURE_SCORE: f64 = 0.7;
const DEFAULT_BACKPRESSURE_FILE_COUNT: usize = 8;
const DEFAULT_MAX_REFINE_ROUNDS: usize = 3;
const DEFAULT_PRUNE_CEILING: u32 = 3;
const DEFAULT_MAX_BATCH_BYTES: u64 = 512 * 1024 * 1024; // 512MB

/// Tunables of the predictor. The defaults mirror the thresholds of the
/// engine's own leveled picker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// A level with score above this is itself overloaded.
    pub direct_overload_score: f64,
    /// Intermediate levels above this score let an upper overload cascade
    /// through them.
    pub cascade_score: f64,
    /// L1 score from which a backlogged L0 is expected to spill into L1.
    pub backpressure_score: f64,
    /// L1 file count from which a backlogged L0 is expected to spill into L1.
    pub backpressure_file_count: usize,
    /// Upper bound on extra seed expansions while a level stays over budget.
    pub max_refine_rounds: usize,
    /// Occurrence count at which `prune` evicts a ledger entry.
    pub prune_ceiling: u32,
    /// Round-robin batch budget used when the engine exposes none.
    pub max_batch_bytes: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfigBuilder::new().build()
    }
}

pub struct PredictorConfigBuilder {
    config: PredictorConfig,
}

impl PredictorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PredictorConfig {
                direct_overload_score: DEFAULT_DIRECT_OVERLOAD_SCORE,
                cascade_score: DEFAULT_CASCADE_SCORE,
                backpressure_score: DEFAULT_BACKPRESSURE_SCORE,
                backpressure_file_count: DEFAULT_BACKPRESSURE_FILE_COUNT,
                max_refine_rounds: DEFAULT_MAX_REFINE_ROUNDS,
                prune_ceiling: DEFAULT_PRUNE_CEILING,
                max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            },
        }
    }

    pub fn new_with(config: PredictorConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> PredictorConfig {
        self.config
    }
}

impl Default for PredictorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! builder_field {
    ($( $name:ident: $type:ty ),* ,) => {
        impl PredictorConfigBuilder {
            $(
                pub fn $name(mut self, v: $type) -> Self {
                    self.config.$name = v;
                    self
                }
            )*
        }
    }
}

builder_field! {
    direct_overload_score: f64,
    cascade_score: f64,
    backpressure_score: f64,
    backpressure_file_count: usize,
    max_refine_rounds: usize,
    prune_ceiling: u32,
    max_batch_bytes: u64,
}
