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

use crate::key_range::KeyRange;
use crate::observe::{EventSink, PredictionEvent};
use crate::provider::{FileDescriptor, LevelMetricsProvider};

/// Result of one seed expansion: the files picked in the seeded level and the
/// files they drag in from the level below.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Expansion {
    pub select_files: BTreeSet<u64>,
    pub target_files: BTreeSet<u64>,
    /// Scans it took the clean-cut loop to reach its fixed point.
    pub passes: usize,
}

impl Expansion {
    pub fn file_ids(&self) -> BTreeSet<u64> {
        self.select_files
            .union(&self.target_files)
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.select_files.is_empty() && self.target_files.is_empty()
    }
}

/// Computes which files a compaction starting in one level would pull in.
///
/// Files that are `being_compacted` or on the caller's denylist are invisible
/// to every operation here: they neither seed an expansion nor join one, so a
/// returned set is closed under overlap relative to the files the predictor
/// is still allowed to name.
pub struct FileSetExpander<'a, P: LevelMetricsProvider + ?Sized> {
    provider: &'a P,
    denylist: &'a BTreeSet<u64>,
    sink: &'a dyn EventSink,
}

impl<'a, P: LevelMetricsProvider + ?Sized> FileSetExpander<'a, P> {
    pub fn new(provider: &'a P, denylist: &'a BTreeSet<u64>, sink: &'a dyn EventSink) -> Self {
        Self {
            provider,
            denylist,
            sink,
        }
    }

    fn is_eligible(&self, file: &FileDescriptor) -> bool {
        !file.being_compacted && !self.denylist.contains(&file.file_id)
    }

    /// Seed position per the engine's priority order, starting at the
    /// round-robin cursor and wrapping once over the whole order. Stale
    /// cursors are normalized modulo the order length.
    fn seed_from_cursor(&self, level: usize) -> Option<usize> {
        let files = self.provider.files(level);
        let order = self.provider.priority_order(level);
        if order.is_empty() {
            return None;
        }
        let start = self.provider.next_compaction_index(level) % order.len();
        for i in 0..order.len() {
            let pos = order[(start + i) % order.len()];
            match files.get(pos) {
                Some(file) if self.is_eligible(file) => return Some(pos),
                _ => continue,
            }
        }
        None
    }

    /// Seed for refinement rounds: the largest eligible file not yet picked,
    /// ties broken by lower file id for determinism.
    fn seed_largest_remaining(&self, level: usize, excluded: &BTreeSet<u64>) -> Option<usize> {
        let files = self.provider.files(level);
        files
            .iter()
            .enumerate()
            .filter(|(_, file)| self.is_eligible(file) && !excluded.contains(&file.file_id))
            .max_by(|(_, a), (_, b)| {
                a.file_size
                    .cmp(&b.file_size)
                    .then(b.file_id.cmp(&a.file_id))
            })
            .map(|(pos, _)| pos)
    }

    /// Grows `{seed}` by repeated whole-level scans until one scan adds
    /// nothing: every eligible file intersecting the running `[min,max]`
    /// interval joins the set and widens the interval.
    fn expand_clean_cut(
        &self,
        level: usize,
        seed_pos: usize,
        excluded: &BTreeSet<u64>,
    ) -> (BTreeSet<u64>, KeyRange, usize) {
        let cmp = |a: &[u8], b: &[u8]| self.provider.compare_user_keys(a, b);
        let files = self.provider.files(level);
        let seed = &files[seed_pos];
        let mut range = seed.key_range.clone();
        let mut selected = BTreeSet::from([seed.file_id]);
        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            for file in files {
                if selected.contains(&file.file_id)
                    || excluded.contains(&file.file_id)
                    || !self.is_eligible(file)
                {
                    continue;
                }
                if file.key_range.overlaps(&range, &cmp) {
                    range.extend(&file.key_range, &cmp);
                    selected.insert(file.file_id);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        (selected, range, passes)
    }

    /// Eligible files of `level` intersecting `range`.
    fn files_overlapping_range(&self, level: usize, range: &KeyRange) -> BTreeSet<u64> {
        let cmp = |a: &[u8], b: &[u8]| self.provider.compare_user_keys(a, b);
        self.provider
            .files(level)
            .iter()
            .filter(|file| self.is_eligible(file) && file.key_range.overlaps(range, &cmp))
            .map(|file| file.file_id)
            .collect()
    }

    fn expand_from_seed(
        &self,
        level: usize,
        seed_pos: usize,
        excluded: &BTreeSet<u64>,
    ) -> Expansion {
        self.sink.emit(PredictionEvent::SeedSelected {
            level,
            file_id: self.provider.files(level)[seed_pos].file_id,
        });
        let (select_files, range, passes) = self.expand_clean_cut(level, seed_pos, excluded);
        let target_files = if level + 1 < self.provider.num_levels() {
            self.files_overlapping_range(level + 1, &range)
        } else {
            BTreeSet::new()
        };
        self.sink.emit(PredictionEvent::CleanCutExpanded {
            level,
            passes,
            selected: select_files.len(),
            target: target_files.len(),
        });
        Expansion {
            select_files,
            target_files,
            passes,
        }
    }

    /// Clean-cut selection for one level: seed from the priority cursor, then
    /// fixed-point expansion plus the next-level overlap.
    pub fn select_seed_and_expand(&self, level: usize) -> Expansion {
        if level >= self.provider.num_levels() {
            return Expansion::default();
        }
        match self.seed_from_cursor(level) {
            Some(seed_pos) => self.expand_from_seed(level, seed_pos, &BTreeSet::new()),
            None => Expansion::default(),
        }
    }

    /// Clean-cut selection seeded from the largest file outside `excluded`.
    /// Used by the refinement loop when a level stays over budget after its
    /// first pick.
    pub fn next_seed_expansion(&self, level: usize, excluded: &BTreeSet<u64>) -> Expansion {
        if level >= self.provider.num_levels() {
            return Expansion::default();
        }
        match self.seed_largest_remaining(level, excluded) {
            Some(seed_pos) => self.expand_from_seed(level, seed_pos, excluded),
            None => Expansion::default(),
        }
    }

    /// L1 files that would receive the pending L0 flush: the union key range
    /// over all eligible L0 files, intersected with L1. L0 files are never
    /// returned themselves and need not be mutually sorted, so the union is a
    /// plain linear scan.
    pub fn l0_target_files(&self) -> BTreeSet<u64> {
        if self.provider.num_levels() < 2 {
            return BTreeSet::new();
        }
        let cmp = |a: &[u8], b: &[u8]| self.provider.compare_user_keys(a, b);
        let mut union_range: Option<KeyRange> = None;
        for file in self.provider.files(0) {
            if !self.is_eligible(file) {
                continue;
            }
            match union_range.as_mut() {
                Some(range) => range.extend(&file.key_range, &cmp),
                None => union_range = Some(file.key_range.clone()),
            }
        }
        match union_range {
            Some(range) => self.files_overlapping_range(1, &range),
            None => BTreeSet::new(),
        }
    }

    /// Files of `target_level` overlapping the union range of `source_ids`
    /// (resolved against `source_level`). The general cross-level
    /// propagation building block.
    pub fn target_level_files(
        &self,
        source_level: usize,
        target_level: usize,
        source_ids: &BTreeSet<u64>,
    ) -> BTreeSet<u64> {
        if source_level >= self.provider.num_levels()
            || target_level >= self.provider.num_levels()
        {
            return BTreeSet::new();
        }
        let cmp = |a: &[u8], b: &[u8]| self.provider.compare_user_keys(a, b);
        let mut union_range: Option<KeyRange> = None;
        for file in self.provider.files(source_level) {
            if !source_ids.contains(&file.file_id) {
                continue;
            }
            match union_range.as_mut() {
                Some(range) => range.extend(&file.key_range, &cmp),
                None => union_range = Some(file.key_range.clone()),
            }
        }
        match union_range {
            Some(range) => self.files_overlapping_range(target_level, &range),
            None => BTreeSet::new(),
        }
    }

    /// Round-robin selection: accept files in index order from the cursor
    /// until one is ineligible, overlaps the previously accepted file, or
    /// would blow the byte budget. No transitive expansion; the batch is the
    /// accepted prefix only.
    pub fn select_batch(&self, level: usize, max_batch_bytes: u64) -> Expansion {
        if level >= self.provider.num_levels() {
            return Expansion::default();
        }
        let cmp = |a: &[u8], b: &[u8]| self.provider.compare_user_keys(a, b);
        let files = self.provider.files(level);
        if files.is_empty() {
            return Expansion::default();
        }
        let start = self.provider.next_compaction_index(level) % files.len();
        let mut select_files = BTreeSet::new();
        let mut batch_bytes = 0u64;
        let mut prev: Option<&FileDescriptor> = None;
        for file in &files[start..] {
            if !self.is_eligible(file) {
                break;
            }
            if let Some(prev) = prev {
                // adjacency check only, not the clean-cut fixed point
                if file.key_range.overlaps(&prev.key_range, &cmp) {
                    break;
                }
            }
            let next_bytes = batch_bytes.saturating_add(file.file_size);
            if next_bytes > max_batch_bytes {
                break;
            }
            batch_bytes = next_bytes;
            select_files.insert(file.file_id);
            prev = Some(file);
        }
        self.sink.emit(PredictionEvent::RoundRobinBatch {
            level,
            selected: select_files.len(),
            batch_bytes,
        });
        let target_files = if !select_files.is_empty() && level + 1 < self.provider.num_levels() {
            self.target_level_files(level, level + 1, &select_files)
        } else {
            BTreeSet::new()
        };
        Expansion {
            select_files,
            target_files,
            passes: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::NoopEventSink;
    use crate::provider::{LevelState, VersionSnapshot};
    use crate::test_utils::{generate_compacting_file, generate_file};

    fn expander<'a>(
        snapshot: &'a VersionSnapshot,
        denylist: &'a BTreeSet<u64>,
    ) -> FileSetExpander<'a, VersionSnapshot> {
        FileSetExpander::new(snapshot, denylist, &NoopEventSink)
    }

    #[test]
    fn test_clean_cut_fixed_point() {
        // Scenario C: g1=[b,d] seeds, g2=[c,e] and g3=[e,f] chain in,
        // g4=[z,zz] stays out.
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_file(1, "b", "d", 10),
                    generate_file(2, "c", "e", 10),
                    generate_file(3, "e", "f", 10),
                    generate_file(4, "z", "zz", 10),
                ],
                1.5,
            ),
        ]);
        let denylist = BTreeSet::new();
        let expansion = expander(&snapshot, &denylist).select_seed_and_expand(2);
        assert_eq!(expansion.select_files, BTreeSet::from([1, 2, 3]));
        assert!(expansion.target_files.is_empty());
        assert_eq!(expansion.passes, 2);
    }

    #[test]
    fn test_seed_respects_cursor_and_wraps() {
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_file(1, "a", "b", 10),
                    generate_file(2, "c", "d", 10),
                    generate_file(3, "e", "f", 10),
                ],
                1.5,
            )
            // stale cursor past the end is normalized modulo the file count
            .with_cursor(4),
        ]);
        let denylist = BTreeSet::new();
        let expansion = expander(&snapshot, &denylist).select_seed_and_expand(1);
        assert_eq!(expansion.select_files, BTreeSet::from([2]));
    }

    #[test]
    fn test_seed_skips_being_compacted() {
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_compacting_file(1, "a", "b", 10),
                    generate_file(2, "c", "d", 10),
                ],
                1.5,
            ),
        ]);
        let denylist = BTreeSet::new();
        let expansion = expander(&snapshot, &denylist).select_seed_and_expand(1);
        assert_eq!(expansion.select_files, BTreeSet::from([2]));
    }

    #[test]
    fn test_expansion_ignores_compacting_and_denied_files() {
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_file(1, "b", "d", 10),
                    generate_compacting_file(2, "c", "e", 10),
                    generate_file(3, "d", "f", 10),
                    generate_file(4, "f", "g", 10),
                ],
                1.5,
            ),
        ]);
        let denylist = BTreeSet::from([4]);
        let expansion = expander(&snapshot, &denylist).select_seed_and_expand(1);
        // 2 is being compacted, 4 is denied; 3 still joins through [b,d]
        assert_eq!(expansion.select_files, BTreeSet::from([1, 3]));
    }

    #[test]
    fn test_expansion_includes_next_level_overlap() {
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(vec![generate_file(1, "c", "h", 10)], 1.5),
            LevelState::new(
                vec![
                    generate_file(10, "a", "d", 10),
                    generate_file(11, "e", "f", 10),
                    generate_file(12, "m", "p", 10),
                ],
                0.3,
            ),
        ]);
        let denylist = BTreeSet::new();
        let expansion = expander(&snapshot, &denylist).select_seed_and_expand(1);
        assert_eq!(expansion.select_files, BTreeSet::from([1]));
        assert_eq!(expansion.target_files, BTreeSet::from([10, 11]));
    }

    #[test]
    fn test_l0_target_files() {
        // Scenario A: one L0 file [a,z]; f1, f2 overlap, f3 does not.
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![generate_file(1, "a", "z", 10)], 1.5),
            LevelState::new(
                vec![
                    generate_file(2, "a", "m", 10),
                    generate_file(3, "n", "z", 10),
                    generate_file(4, "zz", "zzz", 10),
                ],
                0.4,
            ),
        ]);
        let denylist = BTreeSet::new();
        let targets = expander(&snapshot, &denylist).l0_target_files();
        assert_eq!(targets, BTreeSet::from([2, 3]));
    }

    #[test]
    fn test_l0_union_range_over_unsorted_files() {
        // L0 files arrive in flush order, not key order
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(
                vec![
                    generate_file(1, "q", "t", 10),
                    generate_file(2, "b", "d", 10),
                ],
                1.2,
            ),
            LevelState::new(
                vec![
                    generate_file(3, "a", "c", 10),
                    generate_file(4, "f", "h", 10),
                    generate_file(5, "u", "z", 10),
                ],
                0.4,
            ),
        ]);
        let denylist = BTreeSet::new();
        let targets = expander(&snapshot, &denylist).l0_target_files();
        // union range is [b,t]: catches the middle file too
        assert_eq!(targets, BTreeSet::from([3, 4]));
    }

    #[test]
    fn test_l0_targets_skip_being_compacted() {
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![generate_compacting_file(1, "a", "z", 10)], 1.5),
            LevelState::new(vec![generate_file(2, "a", "m", 10)], 0.4),
        ]);
        let denylist = BTreeSet::new();
        assert!(expander(&snapshot, &denylist).l0_target_files().is_empty());
    }

    #[test]
    fn test_target_level_files() {
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_file(1, "b", "d", 10),
                    generate_file(2, "f", "h", 10),
                ],
                1.5,
            ),
            LevelState::new(
                vec![
                    generate_file(10, "a", "b", 10),
                    generate_file(11, "e", "g", 10),
                    generate_file(12, "x", "z", 10),
                ],
                0.2,
            ),
        ]);
        let denylist = BTreeSet::new();
        let targets = expander(&snapshot, &denylist).target_level_files(
            1,
            2,
            &BTreeSet::from([1, 2]),
        );
        assert_eq!(targets, BTreeSet::from([10, 11]));
        // unknown source ids resolve to nothing
        let empty = expander(&snapshot, &denylist).target_level_files(
            1,
            2,
            &BTreeSet::from([99]),
        );
        assert!(empty.is_empty());
    }

    #[test]
    fn test_round_robin_budget() {
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_file(1, "a", "b", 40),
                    generate_file(2, "c", "d", 40),
                    generate_file(3, "e", "f", 40),
                ],
                1.5,
            ),
        ]);
        let denylist = BTreeSet::new();
        let expansion = expander(&snapshot, &denylist).select_batch(1, 100);
        // third file would exceed the budget
        assert_eq!(expansion.select_files, BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_round_robin_budget_survives_huge_file_sizes() {
        // adding the second file's size would overflow u64; accumulation
        // must saturate and end the batch instead of panicking
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_file(1, "a", "b", 40),
                    generate_file(2, "c", "d", u64::MAX),
                ],
                1.5,
            ),
        ]);
        let denylist = BTreeSet::new();
        let expansion = expander(&snapshot, &denylist).select_batch(1, u64::MAX - 1);
        assert_eq!(expansion.select_files, BTreeSet::from([1]));
    }

    #[test]
    fn test_round_robin_stops_at_overlap_and_pending() {
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_file(1, "a", "c", 10),
                    generate_file(2, "c", "e", 10),
                    generate_file(3, "f", "g", 10),
                ],
                1.5,
            ),
        ]);
        let denylist = BTreeSet::new();
        let expansion = expander(&snapshot, &denylist).select_batch(1, 1000);
        // file 2 touches file 1 at "c": batch ends before it
        assert_eq!(expansion.select_files, BTreeSet::from([1]));

        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_file(1, "a", "b", 10),
                    generate_compacting_file(2, "c", "d", 10),
                    generate_file(3, "e", "f", 10),
                ],
                1.5,
            ),
        ]);
        let expansion = expander(&snapshot, &denylist).select_batch(1, 1000);
        assert_eq!(expansion.select_files, BTreeSet::from([1]));
    }

    #[test]
    fn test_round_robin_starts_at_cursor() {
        let snapshot = VersionSnapshot::new(vec![
            LevelState::new(vec![], 0.0),
            LevelState::new(
                vec![
                    generate_file(1, "a", "b", 10),
                    generate_file(2, "c", "d", 10),
                    generate_file(3, "e", "f", 10),
                ],
                1.5,
            )
            .with_cursor(1),
        ]);
        let denylist = BTreeSet::new();
        let expansion = expander(&snapshot, &denylist).select_batch(1, 1000);
        assert_eq!(expansion.select_files, BTreeSet::from([2, 3]));
    }

    #[test]
    fn test_out_of_range_level_is_empty() {
        let snapshot = VersionSnapshot::new(vec![LevelState::new(vec![], 0.0)]);
        let denylist = BTreeSet::new();
        let expander = expander(&snapshot, &denylist);
        assert!(expander.select_seed_and_expand(7).is_empty());
        assert!(expander.select_batch(7, 100).is_empty());
        assert!(expander
            .target_level_files(7, 8, &BTreeSet::from([1]))
            .is_empty());
    }
}
