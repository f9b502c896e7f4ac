//! Velocity-based ETA estimation.
//!
//! Every intermediate millisecond value is floored, and the final seconds are
//! rounded up, so identical inputs always produce the same estimate.

use std::collections::VecDeque;

/// Bounded window of the most recent percentage samples for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressHistory {
    samples: VecDeque<f64>,
    window: usize,
    recorded: u64,
}

impl ProgressHistory {
    /// Creates a history holding `initial` as its only sample.
    pub fn new(window: usize, initial: f64) -> Self {
        let window = window.max(1);
        let mut samples = VecDeque::with_capacity(window + 1);
        samples.push_back(initial);
        Self {
            samples,
            window,
            recorded: 1,
        }
    }

    /// Appends a sample, evicting the oldest once the window is full.
    pub fn push(&mut self, percentage: f64) {
        self.samples.push_back(percentage);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
        self.recorded += 1;
    }

    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples recorded since the job started, including evicted ones.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Average percentage change between consecutive samples.
    pub fn average_velocity(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let total: f64 = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(prev, next)| next - prev)
            .sum();
        Some(total / (self.samples.len() - 1) as f64)
    }
}

/// Estimates seconds remaining for a job at `current` percent.
///
/// Returns `None` at or outside the 0..100 bounds, and when the projected
/// total duration is under `min_total_ms`. With at least two history samples
/// and positive velocity the remaining sample intervals are projected at the
/// observed time per interval; otherwise the estimate is a linear projection
/// of elapsed time.
pub fn estimate_remaining_secs(
    current: f64,
    elapsed_ms: i64,
    history: &ProgressHistory,
    min_total_ms: i64,
) -> Option<u64> {
    // Also rejects NaN
    if !(current > 0.0 && current < 100.0) {
        return None;
    }

    let elapsed = elapsed_ms.max(0) as f64;
    let projected_total = (elapsed * 100.0 / current).floor();
    if projected_total < min_total_ms as f64 {
        return None;
    }

    let remaining_pct = 100.0 - current;
    let remaining_ms = match history.average_velocity() {
        Some(velocity) if velocity > 0.0 => {
            let ms_per_interval = (elapsed / history.recorded() as f64).floor();
            (remaining_pct / velocity * ms_per_interval).floor()
        }
        _ => (elapsed * remaining_pct / current).floor(),
    };

    Some((remaining_ms / 1000.0).ceil() as u64)
}
