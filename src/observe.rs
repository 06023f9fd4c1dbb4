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

/// Structured trace of one decision point inside a prediction round.
///
/// Events are advisory: omitting them entirely changes no behavior, so the
/// sink is injected per predictor instance instead of going through a global
/// logger.
#[derive(Clone, Debug, PartialEq)]
pub enum PredictionEvent {
    CandidateLevels {
        levels: Vec<usize>,
    },
    L0Backpressure {
        l1_score: f64,
        l1_file_count: usize,
    },
    SeedSelected {
        level: usize,
        file_id: u64,
    },
    CleanCutExpanded {
        level: usize,
        passes: usize,
        selected: usize,
        target: usize,
    },
    RoundRobinBatch {
        level: usize,
        selected: usize,
        batch_bytes: u64,
    },
    RefineRound {
        level: usize,
        round: usize,
        estimated_score: f64,
    },
    Recorded {
        files: usize,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: PredictionEvent);
}

/// Drops every event. The default sink of a predictor.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: PredictionEvent) {}
}

/// Forwards events to `tracing` at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: PredictionEvent) {
        match &event {
            PredictionEvent::CandidateLevels { levels } => {
                tracing::debug!(?levels, "candidate levels selected");
            }
            PredictionEvent::L0Backpressure {
                l1_score,
                l1_file_count,
            } => {
                tracing::debug!(l1_score, l1_file_count, "l0 backpressure onto l1");
            }
            PredictionEvent::SeedSelected { level, file_id } => {
                tracing::trace!(level, file_id, "seed file selected");
            }
            PredictionEvent::CleanCutExpanded {
                level,
                passes,
                selected,
                target,
            } => {
                tracing::debug!(level, passes, selected, target, "clean-cut expansion done");
            }
            PredictionEvent::RoundRobinBatch {
                level,
                selected,
                batch_bytes,
            } => {
                tracing::debug!(level, selected, batch_bytes, "round-robin batch selected");
            }
            PredictionEvent::RefineRound {
                level,
                round,
                estimated_score,
            } => {
                tracing::trace!(level, round, estimated_score, "residual score refinement");
            }
            PredictionEvent::Recorded { files } => {
                tracing::debug!(files, "prediction recorded to ledger");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Captures events for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct CollectingSink {
        pub events: Mutex<Vec<PredictionEvent>>,
    }

    impl EventSink for CollectingSink {
        fn emit(&self, event: PredictionEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_collecting_sink_orders_events() {
        let sink = CollectingSink::default();
        sink.emit(PredictionEvent::CandidateLevels { levels: vec![1, 2] });
        sink.emit(PredictionEvent::Recorded { files: 4 });
        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            PredictionEvent::CandidateLevels { levels: vec![1, 2] }
        );
    }
}
