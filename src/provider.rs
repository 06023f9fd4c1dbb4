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

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::key_range::KeyRange;

/// Selection policy the engine is configured with, resolved once per
/// prediction call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, FromStr, Serialize, Deserialize)]
#[display(style = "snake_case")]
pub enum CompactionMode {
    /// Expand around a seed file to a fixed point so that the selected set is
    /// closed under key-range overlap.
    CleanCut,
    /// Walk files in index order from the compaction cursor under a byte
    /// budget, without transitive expansion.
    RoundRobin,
}

impl Default for CompactionMode {
    fn default() -> Self {
        CompactionMode::CleanCut
    }
}

/// Metadata of one data file as observed from the engine's version snapshot.
///
/// `file_id` is the engine's stable file number; identity comparisons go
/// through it, never through addresses or positions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub file_id: u64,
    pub key_range: KeyRange,
    pub file_size: u64,
    /// Owned and mutated only by the engine; the predictor reads it to skip
    /// files that are already inputs of a running compaction.
    pub being_compacted: bool,
}

impl FileDescriptor {
    pub fn new(file_id: u64, key_range: KeyRange, file_size: u64) -> Self {
        Self {
            file_id,
            key_range,
            file_size,
            being_compacted: false,
        }
    }
}

/// Read-only view over one immutable version of the LSM-tree.
///
/// Every method is a pure read of the snapshot; none may block or mutate.
/// The caller keeps the snapshot alive and unchanged for the duration of a
/// prediction call. Level 0 may contain mutually overlapping files; levels
/// >= 1 hold non-overlapping files sorted by key.
pub trait LevelMetricsProvider {
    fn num_levels(&self) -> usize;

    /// Externally computed pressure score of `level`. Values `> 1.0`
    /// conventionally mean the level needs compaction.
    fn score(&self, level: usize) -> f64;

    fn files(&self, level: usize) -> &[FileDescriptor];

    fn byte_size(&self, level: usize) -> u64;

    fn file_count(&self, level: usize) -> usize {
        self.files(level).len()
    }

    /// Round-robin / priority cursor: where the engine would start picking
    /// next. May be stale with respect to the current file list.
    fn next_compaction_index(&self, level: usize) -> usize;

    /// Positions into `files(level)` ranked by the engine's own compaction
    /// priority. Defaults to index order when the engine exposes none.
    fn priority_order(&self, level: usize) -> Vec<usize> {
        (0..self.files(level).len()).collect()
    }

    /// Total order over user keys. Defaults to bytewise order.
    fn compare_user_keys(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn compaction_mode(&self) -> CompactionMode {
        CompactionMode::CleanCut
    }

    /// Byte budget for one round-robin batch. `0` means the engine exposes no
    /// budget and the predictor falls back to its configured default.
    fn max_batch_bytes(&self) -> u64 {
        0
    }
}

/// Per-level slice of a [`VersionSnapshot`].
#[derive(Clone, Debug, Default)]
pub struct LevelState {
    pub files: Vec<FileDescriptor>,
    pub score: f64,
    pub total_file_size: u64,
    pub next_compaction_index: usize,
    /// Empty means "index order".
    pub priority_order: Vec<usize>,
}

impl LevelState {
    pub fn new(files: Vec<FileDescriptor>, score: f64) -> Self {
        let total_file_size = files
            .iter()
            .map(|f| f.file_size)
            .fold(0u64, u64::saturating_add);
        Self {
            files,
            score,
            total_file_size,
            next_compaction_index: 0,
            priority_order: vec![],
        }
    }

    pub fn with_cursor(mut self, next_compaction_index: usize) -> Self {
        self.next_compaction_index = next_compaction_index;
        self
    }

    pub fn with_priority_order(mut self, priority_order: Vec<usize>) -> Self {
        self.priority_order = priority_order;
        self
    }
}

/// A concrete, owned [`LevelMetricsProvider`] built from plain level states.
///
/// Embedders that already hold a materialized view of the version can hand it
/// to the predictor through this type instead of implementing the trait on
/// their own version structure. Also the fixture type for the crate's tests.
#[derive(Clone, Debug, Default)]
pub struct VersionSnapshot {
    levels: Vec<LevelState>,
    compaction_mode: CompactionMode,
    max_batch_bytes: u64,
}

impl VersionSnapshot {
    pub fn new(levels: Vec<LevelState>) -> Self {
        Self {
            levels,
            compaction_mode: CompactionMode::CleanCut,
            max_batch_bytes: 0,
        }
    }

    pub fn with_compaction_mode(mut self, mode: CompactionMode) -> Self {
        self.compaction_mode = mode;
        self
    }

    pub fn with_max_batch_bytes(mut self, max_batch_bytes: u64) -> Self {
        self.max_batch_bytes = max_batch_bytes;
        self
    }
}

impl LevelMetricsProvider for VersionSnapshot {
    fn num_levels(&self) -> usize {
        self.levels.len()
    }

    fn score(&self, level: usize) -> f64 {
        self.levels.get(level).map(|l| l.score).unwrap_or(0.0)
    }

    fn files(&self, level: usize) -> &[FileDescriptor] {
        self.levels.get(level).map(|l| l.files.as_slice()).unwrap_or(&[])
    }

    fn byte_size(&self, level: usize) -> u64 {
        self.levels
            .get(level)
            .map(|l| l.total_file_size)
            .unwrap_or(0)
    }

    fn next_compaction_index(&self, level: usize) -> usize {
        self.levels
            .get(level)
            .map(|l| l.next_compaction_index)
            .unwrap_or(0)
    }

    fn priority_order(&self, level: usize) -> Vec<usize> {
        match self.levels.get(level) {
            Some(l) if !l.priority_order.is_empty() => l.priority_order.clone(),
            Some(l) => (0..l.files.len()).collect(),
            None => vec![],
        }
    }

    fn compaction_mode(&self) -> CompactionMode {
        self.compaction_mode
    }

    fn max_batch_bytes(&self) -> u64 {
        self.max_batch_bytes
    }
}
