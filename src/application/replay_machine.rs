// Replay state machine - cursor, run state and defect edge flags
use crate::domain::alert::{AlertEvent, DefectEdgeDetector};
use crate::domain::sample::{BacktestBatch, Sample};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayPhase {
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

#[derive(Debug, PartialEq)]
pub enum TickOutcome {
    Advanced {
        cursor: usize,
        alerts: Vec<AlertEvent>,
    },
    Completed,
    /// Not running; the cursor did not move
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaySnapshot {
    pub model_name: String,
    pub phase: ReplayPhase,
    pub cursor: usize,
    pub len: usize,
    pub is_running: bool,
    pub is_paused: bool,
}

/// Pure replay state. Illegal transitions return `false` and change nothing;
/// the caller owns the timer and arms or disarms it from the return value.
#[derive(Debug)]
pub struct ReplayMachine {
    batch: Arc<BacktestBatch>,
    cursor: usize,
    phase: ReplayPhase,
    detector: DefectEdgeDetector,
    window_cap: usize,
}

impl ReplayMachine {
    pub fn new(batch: Arc<BacktestBatch>, window_cap: usize) -> Self {
        Self {
            batch,
            cursor: 0,
            phase: ReplayPhase::Idle,
            detector: DefectEdgeDetector::new(),
            window_cap: window_cap.max(1),
        }
    }

    pub fn phase(&self) -> ReplayPhase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn model_name(&self) -> &str {
        &self.batch.model_name
    }

    pub fn start(&mut self) -> bool {
        if !matches!(self.phase, ReplayPhase::Idle | ReplayPhase::Stopped) {
            return false;
        }
        self.cursor = 0;
        self.detector.clear();
        self.phase = ReplayPhase::Running;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.phase != ReplayPhase::Running {
            return false;
        }
        self.phase = ReplayPhase::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase != ReplayPhase::Paused {
            return false;
        }
        self.phase = ReplayPhase::Running;
        true
    }

    /// Halts the replay but keeps the cursor where it is
    pub fn stop(&mut self) -> bool {
        if !matches!(self.phase, ReplayPhase::Running | ReplayPhase::Paused) {
            return false;
        }
        self.phase = ReplayPhase::Stopped;
        true
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.detector.clear();
        self.phase = ReplayPhase::Idle;
    }

    /// Advance by one sample. Reaching the end completes the replay and
    /// leaves the cursor on the last sample.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != ReplayPhase::Running {
            return TickOutcome::Ignored;
        }

        let next = self.cursor + 1;
        if next >= self.batch.len() {
            self.phase = ReplayPhase::Completed;
            return TickOutcome::Completed;
        }

        self.cursor = next;
        let sample = &self.batch.phase_angle_data[next];
        let alerts = self.detector.observe(&self.batch.model_name, next, sample);
        TickOutcome::Advanced {
            cursor: next,
            alerts,
        }
    }

    /// The last `window_cap` samples up to and including the cursor
    pub fn visible_window(&self) -> &[Sample] {
        let samples = &self.batch.phase_angle_data;
        if samples.is_empty() {
            return samples;
        }
        let end = (self.cursor + 1).min(samples.len());
        let start = end.saturating_sub(self.window_cap);
        &samples[start..end]
    }

    pub fn current_sample(&self) -> Option<&Sample> {
        self.batch.phase_angle_data.get(self.cursor)
    }

    pub fn snapshot(&self) -> ReplaySnapshot {
        ReplaySnapshot {
            model_name: self.batch.model_name.clone(),
            phase: self.phase,
            cursor: self.cursor,
            len: self.batch.len(),
            is_running: matches!(self.phase, ReplayPhase::Running | ReplayPhase::Paused),
            is_paused: self.phase == ReplayPhase::Paused,
        }
    }
}
