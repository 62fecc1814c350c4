//! Real-time pacing of decoded samples.
//!
//! Samples arrive from the tailer in bursts that bear no relation to the
//! acquisition rate (the ingest service posts whole blocks). This queue
//! decouples arrival from playback: a virtual due-time clock advances by one
//! sample period per released sample, so the renderer sees samples at the
//! true acquisition rate no matter how lumpy the input is.
//!
//! Invariant: the cumulative number of released samples never exceeds
//! elapsed real time divided by the sample period. Samples are never
//! reordered and never fabricated.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::core::CalibratedSample;

/// FIFO buffer with a virtual release clock.
pub struct PacingQueue {
    queue: VecDeque<CalibratedSample>,
    period: Duration,
    t_next: Instant,
    capacity: usize,
    dropped: u64,
}

impl PacingQueue {
    /// `max_backlog_s` bounds the buffered backlog in seconds of samples at
    /// the nominal rate; beyond it the oldest samples are dropped.
    pub fn new(sample_rate_hz: f64, max_backlog_s: f64, now: Instant) -> Self {
        Self {
            queue: VecDeque::new(),
            period: Duration::from_secs_f64(1.0 / sample_rate_hz),
            t_next: now,
            capacity: (max_backlog_s * sample_rate_hz).ceil().max(1.0) as usize,
            dropped: 0,
        }
    }

    /// Enqueue one calibrated sample, dropping the oldest on overflow.
    pub fn push(&mut self, sample: CalibratedSample) {
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
            self.dropped += 1;
        }
        self.queue.push_back(sample);
    }

    /// Release the next sample if its due time has passed.
    ///
    /// Call in a loop each tick: every release advances the due-time clock by
    /// one period, so at most `elapsed / period` samples come out regardless
    /// of how many are queued. While the queue sits empty the clock is
    /// clamped to `now` — an input stall earns no release credit, so a
    /// producer that later catches up cannot fast-forward playback.
    pub fn pop_due(&mut self, now: Instant) -> Option<CalibratedSample> {
        if self.queue.is_empty() {
            if self.t_next < now {
                self.t_next = now;
            }
            return None;
        }
        if self.t_next > now {
            return None;
        }
        self.t_next += self.period;
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total samples discarded to the backlog bound since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
