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

use bytes::Bytes;

use crate::key_range::KeyRange;
use crate::provider::FileDescriptor;

pub(crate) fn key(k: &str) -> Bytes {
    Bytes::copy_from_slice(k.as_bytes())
}

pub(crate) fn generate_file(
    file_id: u64,
    left: &str,
    right: &str,
    file_size: u64,
) -> FileDescriptor {
    FileDescriptor::new(file_id, KeyRange::new(key(left), key(right)), file_size)
}

pub(crate) fn generate_compacting_file(
    file_id: u64,
    left: &str,
    right: &str,
    file_size: u64,
) -> FileDescriptor {
    let mut file = generate_file(file_id, left, right, file_size);
    file.being_compacted = true;
    file
}

/// `count` equally sized, non-overlapping files with ids starting at
/// `start_id`, keyed by zero-padded decimal so bytewise order matches
/// numeric order.
pub(crate) fn generate_files(start_id: u64, count: usize, file_size: u64) -> Vec<FileDescriptor> {
    (0..count as u64)
        .map(|i| {
            let id = start_id + i;
            generate_file(
                id,
                &format!("{:08}", id * 100),
                &format!("{:08}", id * 100 + 99),
                file_size,
            )
        })
        .collect()
}
