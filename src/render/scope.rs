//! Scrolling-window plot rendering, the simpler presentation variant.

use std::collections::VecDeque;

use crate::core::{CalibratedSample, TraceRenderer};

/// Keeps the last `window_s` seconds of samples for an auto-scaled live
/// plot. Lead-off samples are additionally collected as markers.
pub struct ScopeRenderer {
    window_s: f64,
    points: VecDeque<[f64; 2]>,
    lead_off_marks: VecDeque<[f64; 2]>,
}

impl ScopeRenderer {
    pub fn new(window_s: f64) -> Self {
        Self {
            window_s,
            points: VecDeque::new(),
            lead_off_marks: VecDeque::new(),
        }
    }

    pub fn window_s(&self) -> f64 {
        self.window_s
    }

    pub fn points(&self) -> &VecDeque<[f64; 2]> {
        &self.points
    }

    pub fn lead_off_marks(&self) -> &VecDeque<[f64; 2]> {
        &self.lead_off_marks
    }

    /// Millivolt range of the visible window, if any samples are held.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.points.iter();
        let first = iter.next()?[1];
        let (min, max) = iter.fold((first, first), |(lo, hi), p| {
            (lo.min(p[1]), hi.max(p[1]))
        });
        Some((min, max))
    }
}

impl TraceRenderer for ScopeRenderer {
    fn draw_sample(&mut self, sample: &CalibratedSample) {
        // a timestamp jump backwards means the followed file changed;
        // the old window no longer belongs on the axis
        if let Some(last) = self.points.back() {
            if sample.t_rel_s < last[0] {
                self.points.clear();
                self.lead_off_marks.clear();
            }
        }

        self.points.push_back([sample.t_rel_s, sample.millivolts]);
        if sample.lead_off {
            self.lead_off_marks
                .push_back([sample.t_rel_s, sample.millivolts]);
        }

        let horizon = sample.t_rel_s - self.window_s;
        while self.points.front().is_some_and(|p| p[0] < horizon) {
            self.points.pop_front();
        }
        while self.lead_off_marks.front().is_some_and(|p| p[0] < horizon) {
            self.lead_off_marks.pop_front();
        }
    }

    fn present_frame(&mut self) {}
}
